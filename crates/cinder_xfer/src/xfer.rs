//! The [`Xfer`] trait and its field primitives.

use cinder_core::{Coord3D, Distribution, Matrix3D, RandomVariable, RgbColor};

use crate::error::{XferError, XferResult};

/// Per-object version tag.
pub type XferVersion = u8;

/// What an [`Xfer`] does with the fields it visits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XferMode {
    /// Fields are written out.
    Save,
    /// Fields are overwritten from the data.
    Load,
    /// Fields are checksummed as if saved.
    Crc,
}

/// A direction-agnostic field mover.
///
/// Implementors provide [`Xfer::xfer_bytes`]; every typed primitive is
/// built on it. In `Save` and `Crc` mode the primitives only read their
/// argument, in `Load` mode they overwrite it.
pub trait Xfer {
    /// The mode of this xfer.
    fn mode(&self) -> XferMode;

    /// Moves raw bytes. Saving reads `data`, loading fills it.
    fn xfer_bytes(&mut self, data: &mut [u8]) -> XferResult<()>;

    /// True when fields are being overwritten.
    fn is_loading(&self) -> bool {
        self.mode() == XferMode::Load
    }

    /// Moves an object's version tag.
    ///
    /// On save `version` is set to `current` and written. On load the tag is
    /// read into `version`; tags newer than `current` (or zero) are rejected.
    fn xfer_version(&mut self, version: &mut XferVersion, current: XferVersion) -> XferResult<()> {
        if !self.is_loading() {
            *version = current;
        }
        self.xfer_u8(version)?;
        if *version == 0 || *version > current {
            return Err(XferError::UnknownVersion { found: *version, current });
        }
        Ok(())
    }

    /// Moves a `u8`.
    fn xfer_u8(&mut self, value: &mut u8) -> XferResult<()> {
        let mut bytes = [*value];
        self.xfer_bytes(&mut bytes)?;
        *value = bytes[0];
        Ok(())
    }

    /// Moves a bool as one byte.
    fn xfer_bool(&mut self, value: &mut bool) -> XferResult<()> {
        let mut byte = u8::from(*value);
        self.xfer_u8(&mut byte)?;
        *value = byte != 0;
        Ok(())
    }

    /// Moves an `i32`.
    fn xfer_i32(&mut self, value: &mut i32) -> XferResult<()> {
        let mut bytes = value.to_le_bytes();
        self.xfer_bytes(&mut bytes)?;
        *value = i32::from_le_bytes(bytes);
        Ok(())
    }

    /// Moves a `u32`.
    fn xfer_u32(&mut self, value: &mut u32) -> XferResult<()> {
        let mut bytes = value.to_le_bytes();
        self.xfer_bytes(&mut bytes)?;
        *value = u32::from_le_bytes(bytes);
        Ok(())
    }

    /// Moves an `f32`.
    fn xfer_f32(&mut self, value: &mut f32) -> XferResult<()> {
        let mut bytes = value.to_le_bytes();
        self.xfer_bytes(&mut bytes)?;
        *value = f32::from_le_bytes(bytes);
        Ok(())
    }

    /// Keeps the slot of a removed `f32` field.
    ///
    /// Writes `0.0`; the loaded value is discarded.
    fn xfer_dummy_f32(&mut self) -> XferResult<()> {
        let mut placeholder = 0.0f32;
        self.xfer_f32(&mut placeholder)
    }

    /// Moves a string as a `u8` length followed by its bytes.
    fn xfer_string(&mut self, value: &mut String) -> XferResult<()> {
        let mut len = if self.is_loading() {
            0
        } else {
            u8::try_from(value.len()).map_err(|_| XferError::StringTooLong { len: value.len() })?
        };
        self.xfer_u8(&mut len)?;

        if self.is_loading() {
            let mut buf = vec![0u8; usize::from(len)];
            self.xfer_bytes(&mut buf)?;
            *value = String::from_utf8(buf).map_err(|_| XferError::InvalidString)?;
        } else {
            let mut buf = value.as_bytes().to_vec();
            self.xfer_bytes(&mut buf)?;
        }
        Ok(())
    }

    /// Moves a 3D coordinate as three `f32`.
    fn xfer_coord3d(&mut self, value: &mut Coord3D) -> XferResult<()> {
        let floats: &mut [f32; 3] = bytemuck::cast_mut(value);
        for f in floats.iter_mut() {
            self.xfer_f32(f)?;
        }
        Ok(())
    }

    /// Moves a color as three `f32`.
    fn xfer_rgb_color(&mut self, value: &mut RgbColor) -> XferResult<()> {
        let floats: &mut [f32; 3] = bytemuck::cast_mut(value);
        for f in floats.iter_mut() {
            self.xfer_f32(f)?;
        }
        Ok(())
    }

    /// Moves a transform as twelve `f32` in row order.
    fn xfer_matrix3d(&mut self, value: &mut Matrix3D) -> XferResult<()> {
        for f in value.as_floats_mut().iter_mut() {
            self.xfer_f32(f)?;
        }
        Ok(())
    }

    /// Moves a random variable as `low f32, high f32, distribution u32`.
    fn xfer_random_variable(&mut self, value: &mut RandomVariable) -> XferResult<()> {
        self.xfer_f32(&mut value.low)?;
        self.xfer_f32(&mut value.high)?;
        xfer_enum(self, &mut value.distribution)
    }
}

/// An enum stored on the wire as a `u32` tag.
pub trait XferEnum: Copy {
    /// Name used in error messages.
    const KIND: &'static str;

    /// Wire tag of this value.
    fn to_wire(self) -> u32;

    /// Value for a wire tag, if known.
    fn from_wire(tag: u32) -> Option<Self>;
}

/// Moves an enum as its `u32` tag. Unknown tags fail the load.
pub fn xfer_enum<E: XferEnum, X: Xfer + ?Sized>(xfer: &mut X, value: &mut E) -> XferResult<()> {
    let mut tag = value.to_wire();
    xfer.xfer_u32(&mut tag)?;
    if xfer.is_loading() {
        *value = E::from_wire(tag).ok_or(XferError::InvalidEnum { kind: E::KIND, value: tag })?;
    }
    Ok(())
}

impl XferEnum for Distribution {
    const KIND: &'static str = "distribution";

    fn to_wire(self) -> u32 {
        self as u32
    }

    fn from_wire(tag: u32) -> Option<Self> {
        Self::from_u32(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{XferLoad, XferSave};

    #[test]
    fn test_version_rejects_newer_data() {
        let mut save = XferSave::new();
        let mut version = 0;
        save.xfer_version(&mut version, 3).unwrap();
        assert_eq!(version, 3);

        let bytes = save.into_bytes();
        let mut load = XferLoad::new(&bytes);
        let mut loaded = 0;
        let err = load.xfer_version(&mut loaded, 2).unwrap_err();
        assert_eq!(err, XferError::UnknownVersion { found: 3, current: 2 });
    }

    #[test]
    fn test_dummy_keeps_wire_width() {
        let mut save = XferSave::new();
        let mut value = 1.25f32;
        save.xfer_dummy_f32().unwrap();
        save.xfer_f32(&mut value).unwrap();
        assert_eq!(save.len(), 8);

        let bytes = save.into_bytes();
        let mut load = XferLoad::new(&bytes);
        let mut loaded = 0.0;
        load.xfer_dummy_f32().unwrap();
        load.xfer_f32(&mut loaded).unwrap();
        assert_eq!(loaded, 1.25);
    }

    #[test]
    fn test_string_limit() {
        let mut save = XferSave::new();
        let mut long = "x".repeat(256);
        assert_eq!(save.xfer_string(&mut long), Err(XferError::StringTooLong { len: 256 }));

        let mut empty = String::new();
        save.xfer_string(&mut empty).unwrap();
        assert_eq!(save.as_slice(), &[0]);
    }

    #[test]
    fn test_unknown_enum_tag() {
        let bytes = 77u32.to_le_bytes();
        let mut load = XferLoad::new(&bytes);
        let mut distribution = Distribution::Uniform;
        let err = xfer_enum(&mut load, &mut distribution).unwrap_err();
        assert_eq!(err.code(), 5);
    }

    #[test]
    fn test_compound_fields() {
        let mut coord = Coord3D::new(1.0, -2.0, 3.5);
        let mut color = RgbColor::new(0.25, 0.5, 0.75);
        let mut matrix = Matrix3D::rotation_z(0.3);
        let mut var = RandomVariable::new(1.0, 2.0, Distribution::HighBias);

        let mut save = XferSave::new();
        save.xfer_coord3d(&mut coord).unwrap();
        save.xfer_rgb_color(&mut color).unwrap();
        save.xfer_matrix3d(&mut matrix).unwrap();
        save.xfer_random_variable(&mut var).unwrap();
        assert_eq!(save.len(), 12 + 12 + 48 + 12);

        let bytes = save.into_bytes();
        let mut load = XferLoad::new(&bytes);
        let mut coord2 = Coord3D::ZERO;
        let mut color2 = RgbColor::BLACK;
        let mut matrix2 = Matrix3D::IDENTITY;
        let mut var2 = RandomVariable::default();
        load.xfer_coord3d(&mut coord2).unwrap();
        load.xfer_rgb_color(&mut color2).unwrap();
        load.xfer_matrix3d(&mut matrix2).unwrap();
        load.xfer_random_variable(&mut var2).unwrap();

        assert_eq!(coord, coord2);
        assert_eq!(color, color2);
        assert_eq!(matrix, matrix2);
        assert_eq!(var, var2);
        assert_eq!(load.remaining(), 0);
    }
}
