// Copyright 2023 Mikael Lund
//
// Licensed under the Apache license, version 2.0 (the "license");
// you may not use this file except in compliance with the license.
// You may obtain a copy of the license at
//
//     http://www.apache.org/licenses/license-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the license is distributed on an "as is" basis,
// without warranties or conditions of any kind, either express or implied.
// See the license for the specific language governing permissions and
// limitations under the license.

//! # Simulation cells
//!
//! Boundary conditions and the minimum-image convention.

use crate::{Error, Vector3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Boundary conditions of a simulation cell
pub trait BoundaryConditions: Sync {
    /// Minimum-image separation vector, `point1 - point2`
    fn distance(&self, point1: &Vector3, point2: &Vector3) -> Vector3;

    /// Wrap a point into the primary cell
    fn boundary(&self, point: &mut Vector3);
}

/// Infinite, non-periodic space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Unbounded;

impl BoundaryConditions for Unbounded {
    #[inline(always)]
    fn distance(&self, point1: &Vector3, point2: &Vector3) -> Vector3 {
        point1 - point2
    }
    #[inline(always)]
    fn boundary(&self, _point: &mut Vector3) {}
}

/// Orthorhombic cell, periodic in all three directions and centered at the origin
///
/// # Examples
/// ~~~
/// use torsional::{cell::{BoundaryConditions, Cuboid}, Vector3};
/// let cell = Cuboid::cubic(10.0).unwrap();
/// let a = Vector3::new(4.5, 0.0, 0.0);
/// let b = Vector3::new(-4.5, 0.0, 0.0);
/// assert_eq!(cell.distance(&a, &b), Vector3::new(-1.0, 0.0, 0.0));
/// ~~~
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawCuboid"))]
pub struct Cuboid {
    /// Side lengths
    #[cfg_attr(feature = "serde", serde(rename = "L"))]
    length: Vector3,
}

impl Cuboid {
    /// Create cell from three side lengths
    pub fn new(lx: f64, ly: f64, lz: f64) -> Result<Self, Error> {
        let length = Vector3::new(lx, ly, lz);
        if length.iter().any(|l| !l.is_finite() || *l <= 0.0) {
            return Err(Error::invalid_parameter(
                "L",
                format!("side lengths must be positive and finite, got {lx}, {ly}, {lz}"),
            ));
        }
        Ok(Self { length })
    }

    /// Create cubic cell with side length `length`
    pub fn cubic(length: f64) -> Result<Self, Error> {
        Self::new(length, length, length)
    }

    /// Side lengths
    pub const fn length(&self) -> &Vector3 {
        &self.length
    }

    /// Cell volume
    pub fn volume(&self) -> f64 {
        self.length.product()
    }
}

impl BoundaryConditions for Cuboid {
    #[inline]
    fn distance(&self, point1: &Vector3, point2: &Vector3) -> Vector3 {
        let mut delta = point1 - point2;
        for i in 0..3 {
            delta[i] -= self.length[i] * (delta[i] / self.length[i]).round();
        }
        delta
    }

    #[inline]
    fn boundary(&self, point: &mut Vector3) {
        for i in 0..3 {
            point[i] -= self.length[i] * (point[i] / self.length[i]).round();
            // `round` keeps +L/2 in place; fold it onto -L/2
            if point[i] >= 0.5 * self.length[i] {
                point[i] -= self.length[i];
            }
        }
    }
}

/// Unvalidated form used when reading user input
#[cfg(feature = "serde")]
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCuboid {
    #[serde(rename = "L")]
    length: [f64; 3],
}

#[cfg(feature = "serde")]
impl TryFrom<RawCuboid> for Cuboid {
    type Error = Error;
    fn try_from(raw: RawCuboid) -> Result<Self, Self::Error> {
        let [lx, ly, lz] = raw.length;
        Self::new(lx, ly, lz)
    }
}
