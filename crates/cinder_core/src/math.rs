//! Mathematical types shared by the simulation crates.
//!
//! These are the canonical representations written into snapshots, so their
//! layout is `#[repr(C)]` and plain-old-data.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// 3D coordinate - position, velocity, offset
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[serde(default)]
pub struct Coord3D {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component (up)
    pub z: f32,
}

impl Coord3D {
    /// Creates a new coordinate
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Returns a unit-length copy, or zero when the vector is degenerate.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            Self::ZERO
        } else {
            self * (1.0 / len)
        }
    }

    /// Component-wise product
    #[must_use]
    pub fn scale(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }
}

impl std::ops::Add for Coord3D {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::AddAssign for Coord3D {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Coord3D {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Coord3D {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Linear RGB color, channels nominally in `[0, 1]`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[serde(default)]
pub struct RgbColor {
    /// Red channel
    pub red: f32,
    /// Green channel
    pub green: f32,
    /// Blue channel
    pub blue: f32,
}

impl RgbColor {
    /// Creates a new color
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    /// Black
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    /// Adds the same amount to every channel
    #[must_use]
    pub fn offset(self, amount: f32) -> Self {
        Self::new(self.red + amount, self.green + amount, self.blue + amount)
    }
}

impl std::ops::Add for RgbColor {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.red + rhs.red, self.green + rhs.green, self.blue + rhs.blue)
    }
}

impl std::ops::Sub for RgbColor {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.red - rhs.red, self.green - rhs.green, self.blue - rhs.blue)
    }
}

impl std::ops::Mul<f32> for RgbColor {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.red * rhs, self.green * rhs, self.blue * rhs)
    }
}

/// Affine 3x4 transform, row-major.
///
/// Each row is `[r0, r1, r2, t]`: the left 3x3 block is rotation/scale and
/// the last column is translation.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Matrix3D {
    /// The three rows of the matrix
    pub rows: [[f32; 4]; 3],
}

impl Matrix3D {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        rows: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ],
    };

    /// Pure translation
    #[must_use]
    pub const fn from_translation(t: Coord3D) -> Self {
        Self {
            rows: [
                [1.0, 0.0, 0.0, t.x],
                [0.0, 1.0, 0.0, t.y],
                [0.0, 0.0, 1.0, t.z],
            ],
        }
    }

    /// Rotation about the X axis
    #[must_use]
    pub fn rotation_x(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            rows: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, -s, 0.0],
                [0.0, s, c, 0.0],
            ],
        }
    }

    /// Rotation about the Y axis
    #[must_use]
    pub fn rotation_y(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            rows: [
                [c, 0.0, s, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [-s, 0.0, c, 0.0],
            ],
        }
    }

    /// Rotation about the Z axis
    #[must_use]
    pub fn rotation_z(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            rows: [
                [c, -s, 0.0, 0.0],
                [s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
        }
    }

    /// Returns `self * other` (apply `other` first, then `self`).
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        let a = &self.rows;
        let b = &other.rows;
        let mut out = [[0.0f32; 4]; 3];
        for (row, out_row) in out.iter_mut().enumerate() {
            for col in 0..3 {
                out_row[col] =
                    a[row][0] * b[0][col] + a[row][1] * b[1][col] + a[row][2] * b[2][col];
            }
            out_row[3] = a[row][0] * b[0][3] + a[row][1] * b[1][3] + a[row][2] * b[2][3] + a[row][3];
        }
        Self { rows: out }
    }

    /// Transforms a point (rotation + translation)
    #[must_use]
    pub fn transform_point(&self, p: Coord3D) -> Coord3D {
        let r = &self.rows;
        Coord3D::new(
            r[0][0] * p.x + r[0][1] * p.y + r[0][2] * p.z + r[0][3],
            r[1][0] * p.x + r[1][1] * p.y + r[1][2] * p.z + r[1][3],
            r[2][0] * p.x + r[2][1] * p.y + r[2][2] * p.z + r[2][3],
        )
    }

    /// Transforms a direction (rotation only)
    #[must_use]
    pub fn rotate_vector(&self, v: Coord3D) -> Coord3D {
        let r = &self.rows;
        Coord3D::new(
            r[0][0] * v.x + r[0][1] * v.y + r[0][2] * v.z,
            r[1][0] * v.x + r[1][1] * v.y + r[1][2] * v.z,
            r[2][0] * v.x + r[2][1] * v.y + r[2][2] * v.z,
        )
    }

    /// Translation column
    #[must_use]
    pub const fn translation(&self) -> Coord3D {
        Coord3D::new(self.rows[0][3], self.rows[1][3], self.rows[2][3])
    }

    /// Replaces the translation column
    pub fn set_translation(&mut self, t: Coord3D) {
        self.rows[0][3] = t.x;
        self.rows[1][3] = t.y;
        self.rows[2][3] = t.z;
    }

    /// Exact comparison against the identity
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// The twelve floats in row order, for byte-exact serialization.
    pub fn as_floats_mut(&mut self) -> &mut [f32; 12] {
        bytemuck::cast_mut(&mut self.rows)
    }
}

impl Default for Matrix3D {
    fn default() -> Self {
        Self::IDENTITY
    }
}
