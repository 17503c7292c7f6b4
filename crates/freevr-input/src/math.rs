//! 4x4 homogeneous transforms and the small vector types that go with them.
//!
//! Matrices wrap glam's column-major `DMat4`, so the translation sits in
//! column [`W`]. Angles are in degrees throughout.

use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};

pub const X: usize = 0;
pub const Y: usize = 1;
pub const Z: usize = 2;
pub const W: usize = 3;

/// Euler rotation slots.
pub const AZIM: usize = 0;
pub const ELEV: usize = 1;
pub const ROLL: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => X,
            Axis::Y => Y,
            Axis::Z => Z,
        }
    }
}

/// Canonical directions of a tracked object: -Z is forward, +Y is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Fore,
    Back,
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn unit(self) -> Vector3 {
        match self {
            Direction::Fore => DVec3::NEG_Z,
            Direction::Back => DVec3::Z,
            Direction::Up => DVec3::Y,
            Direction::Down => DVec3::NEG_Y,
            Direction::Left => DVec3::NEG_X,
            Direction::Right => DVec3::X,
        }
    }
}

/// A location; moved by the full transform.
pub type Point3 = DVec3;

/// A direction; moved by the rotational part only.
pub type Vector3 = DVec3;

/// Translation plus azimuth/elevation/roll in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Euler {
    pub t: [f64; 3],
    pub r: [f64; 3],
}

/// Rigid transform over a column-major [`DMat4`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Matrix(pub DMat4);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix(DMat4::IDENTITY);

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.0.col(col)[row]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.0.col_mut(col)[row] = value;
    }

    /// `l * r`.
    pub fn product(l: &Matrix, r: &Matrix) -> Matrix {
        Matrix(l.0 * r.0)
    }

    /// `self = r * self`
    pub fn pre_mult(&mut self, r: &Matrix) -> &mut Self {
        self.0 = r.0 * self.0;
        self
    }

    /// `self = self * r`
    pub fn post_mult(&mut self, r: &Matrix) -> &mut Self {
        self.0 *= r.0;
        self
    }

    pub fn translation(x: f64, y: f64, z: f64) -> Matrix {
        Matrix(DMat4::from_translation(DVec3::new(x, y, z)))
    }

    pub fn scale(factor: f64) -> Matrix {
        Matrix(DMat4::from_scale(DVec3::splat(factor)))
    }

    pub fn rotation(axis: Axis, degrees: f64) -> Matrix {
        let radians = degrees.to_radians();
        Matrix(match axis {
            Axis::X => DMat4::from_rotation_x(radians),
            Axis::Y => DMat4::from_rotation_y(radians),
            Axis::Z => DMat4::from_rotation_z(radians),
        })
    }

    pub fn pre_translate(&mut self, x: f64, y: f64, z: f64) -> &mut Self {
        self.pre_mult(&Matrix::translation(x, y, z))
    }

    pub fn post_translate(&mut self, x: f64, y: f64, z: f64) -> &mut Self {
        self.post_mult(&Matrix::translation(x, y, z))
    }

    pub fn pre_rotate(&mut self, axis: Axis, degrees: f64) -> &mut Self {
        self.pre_mult(&Matrix::rotation(axis, degrees))
    }

    pub fn post_rotate(&mut self, axis: Axis, degrees: f64) -> &mut Self {
        self.post_mult(&Matrix::rotation(axis, degrees))
    }

    pub fn translation_part(&self) -> [f64; 3] {
        self.0.w_axis.truncate().to_array()
    }

    pub fn set_translation_part(&mut self, t: [f64; 3]) -> &mut Self {
        self.0.w_axis = DVec3::from_array(t).extend(self.0.w_axis.w);
        self
    }

    /// Builds a pose from an euler, rotating about `azim_axis` first.
    ///
    /// With a Y-up world the rotation order is azimuth about Y, elevation
    /// about X, then roll about Z, each in the already-rotated frame.
    pub fn from_euler(euler: &Euler, azim_axis: Axis) -> Matrix {
        let mut m = Matrix::translation(euler.t[X], euler.t[Y], euler.t[Z]);
        let [a, e, r] = rotation_order(azim_axis);
        m.post_rotate(a, euler.r[AZIM]);
        m.post_rotate(e, euler.r[ELEV]);
        m.post_rotate(r, euler.r[ROLL]);
        m
    }

    /// Recovers translation and Y-up euler angles from a rigid transform.
    pub fn to_euler(&self) -> Euler {
        let azim = self.get(X, Z).atan2(self.get(Z, Z));
        let (azim_sin, azim_cos) = azim.sin_cos();
        let elev = self
            .get(Y, Z)
            .atan2(azim_sin * self.get(X, Z) + azim_cos * self.get(Z, Z));
        let roll = (azim_sin * self.get(Z, Y) - azim_cos * self.get(X, Y))
            .atan2(azim_cos * self.get(X, X) - azim_sin * self.get(Z, X));

        Euler {
            t: self.translation_part(),
            r: [azim.to_degrees(), -elev.to_degrees(), roll.to_degrees()],
        }
    }

    pub fn transform_point(&self, p: &Point3) -> Point3 {
        self.0.transform_point3(*p)
    }

    /// Rotational part only; translation does not apply to directions.
    pub fn transform_vector(&self, v: &Vector3) -> Vector3 {
        self.0.transform_vector3(*v)
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }

    pub fn abs_diff_eq(&self, other: &Matrix, max_abs_diff: f64) -> bool {
        self.0.abs_diff_eq(other.0, max_abs_diff)
    }
}

/// Axis order used for azimuth, elevation and roll given the world "up" axis.
pub fn rotation_order(azim_axis: Axis) -> [Axis; 3] {
    match azim_axis {
        Axis::X => [Axis::X, Axis::Z, Axis::Y],
        Axis::Y => [Axis::Y, Axis::X, Axis::Z],
        Axis::Z => [Axis::Z, Axis::Y, Axis::X],
    }
}
