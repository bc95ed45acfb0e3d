//! # Effect Definitions
//!
//! Effects are declared in TOML as an array of `[[system]]` tables. Every
//! key except `name` is a [`ParticleSystemInfo`] field; missing keys keep
//! their defaults. Keyframe lists hold up to eight entries.
//!
//! ```toml
//! [[system]]
//! name = "Spark"
//! shader_type = "ADDITIVE"
//! priority = "WEAPON_EXPLOSION"
//! lifetime = { low = 10.0, high = 20.0 }
//! burst_count = { low = 4.0, high = 4.0, distribution = "CONSTANT" }
//! emission_velocity = { type = "SPHERICAL", speed = { low = 1.0, high = 2.0 } }
//! alpha_keys = [
//!     { value = { low = 1.0, high = 1.0 }, frame = 0 },
//!     { value = { low = 0.0, high = 0.0 }, frame = 20 },
//! ]
//! ```

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::{ParticleError, ParticleResult};
use crate::info::ParticleSystemInfo;

#[derive(Deserialize)]
struct DefinitionFile {
    #[serde(default, rename = "system")]
    systems: Vec<EffectDefinition>,
}

/// One named effect.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EffectDefinition {
    /// Template name.
    pub name: String,
    /// Parameters.
    #[serde(flatten)]
    pub info: ParticleSystemInfo,
}

/// Parses a definition document.
///
/// # Errors
///
/// Returns [`ParticleError::Definitions`] for malformed TOML or values and
/// [`ParticleError::DuplicateDefinition`] if a name appears twice.
pub fn parse_definitions(text: &str) -> ParticleResult<Vec<EffectDefinition>> {
    let file: DefinitionFile =
        toml::from_str(text).map_err(|e| ParticleError::Definitions(e.to_string()))?;

    let mut seen = HashSet::new();
    for def in &file.systems {
        if def.name.is_empty() {
            return Err(ParticleError::Definitions("effect without a name".into()));
        }
        if !seen.insert(def.name.as_str()) {
            return Err(ParticleError::DuplicateDefinition(def.name.clone()));
        }
    }
    Ok(file.systems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::{EmissionVelocity, EmissionVolume, ShaderType, WindMotion};
    use crate::priority::ParticlePriority;

    const SPARK: &str = r#"
        [[system]]
        name = "Spark"
        shader_type = "ADDITIVE"
        priority = "CRITICAL"
        system_lifetime = 90
        lifetime = { low = 10.0, high = 20.0 }
        emission_velocity = { type = "SPHERICAL", speed = { low = 1.0, high = 2.0 } }
        emission_volume = { type = "SPHERE", radius = 3.0 }
        wind_motion = "PING_PONG"
        wind_ping_pong_start_angle_max = 0.785398
        alpha_keys = [
            { value = { low = 1.0, high = 1.0 }, frame = 0 },
            { value = { low = 0.0, high = 0.0 }, frame = 20 },
        ]

        [[system]]
        name = "Smoke"
    "#;

    #[test]
    fn test_parse_two_systems() {
        let defs = parse_definitions(SPARK).unwrap();
        assert_eq!(defs.len(), 2);

        let spark = &defs[0].info;
        assert_eq!(defs[0].name, "Spark");
        assert_eq!(spark.shader_type, ShaderType::Additive);
        assert_eq!(spark.priority, ParticlePriority::Critical);
        assert_eq!(spark.system_lifetime, 90);
        assert_eq!(spark.wind_motion, WindMotion::PingPong);
        assert!(matches!(spark.emission_velocity, EmissionVelocity::Spherical { .. }));
        assert_eq!(spark.emission_volume, EmissionVolume::Sphere { radius: 3.0 });
        assert_eq!(spark.alpha_keys[1].frame, 20);
        // Padding is the zero-frame sentinel
        assert_eq!(spark.alpha_keys[2].frame, 0);

        assert_eq!(defs[1].info, ParticleSystemInfo::default());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = parse_definitions("[[system]]\nname = \"A\"\n[[system]]\nname = \"A\"\n")
            .unwrap_err();
        assert_eq!(err, ParticleError::DuplicateDefinition("A".into()));
    }

    #[test]
    fn test_too_many_keyframes_rejected() {
        let keys = (0..9).map(|i| format!("{{ frame = {i} }}")).collect::<Vec<_>>().join(", ");
        let text = format!("[[system]]\nname = \"A\"\ncolor_keys = [{keys}]\n");
        assert!(matches!(parse_definitions(&text), Err(ParticleError::Definitions(_))));
    }

    #[test]
    fn test_empty_document() {
        assert!(parse_definitions("").unwrap().is_empty());
    }
}
