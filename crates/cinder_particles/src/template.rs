//! # Particle System Templates
//!
//! A template is a named, shared effect definition. Templates are created
//! once while definitions load and live until the manager is dropped.

use std::cell::Cell;

use crate::info::ParticleSystemInfo;

/// Index of a template inside its manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub(crate) u32);

impl TemplateId {
    /// Position of the template in insertion order.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named effect definition.
#[derive(Debug)]
pub struct ParticleSystemTemplate {
    name: String,
    info: ParticleSystemInfo,
    /// Resolved slave template. Only hits are remembered.
    slave_template: Cell<Option<TemplateId>>,
}

impl ParticleSystemTemplate {
    /// Creates a template with default parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), info: ParticleSystemInfo::default(), slave_template: Cell::new(None) }
    }

    /// Unique name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effect parameters.
    #[inline]
    #[must_use]
    pub const fn info(&self) -> &ParticleSystemInfo {
        &self.info
    }

    /// Mutable effect parameters.
    ///
    /// Changing the slave name drops the cached slave lookup.
    pub fn info_mut(&mut self) -> &mut ParticleSystemInfo {
        self.slave_template.set(None);
        &mut self.info
    }

    /// Resolves the slave template named by this template.
    ///
    /// `find` looks a name up among the registered templates. A successful
    /// lookup is cached for the template's lifetime; a miss is retried on
    /// the next call, so a slave registered later is still picked up.
    pub fn slave_template(&self, find: impl FnOnce(&str) -> Option<TemplateId>) -> Option<TemplateId> {
        if let Some(cached) = self.slave_template.get() {
            return Some(cached);
        }
        if self.info.slave_system_name.is_empty() {
            return None;
        }
        let found = find(&self.info.slave_system_name);
        if found.is_some() {
            self.slave_template.set(found);
        }
        found
    }
}
