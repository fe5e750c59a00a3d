// Copyright 2023-2024 Mikael Lund
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

//! Implementation of the harmonic dihedral.

use super::IsotropicFourbodyEnergy;
use crate::{Error, Info};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Harmonic (cosine) dihedral potential
///
/// $$ u(φ) = k \left [ 1 + d \cos(nφ) \right ] $$
///
/// where $k \ge 0$ is the energy scale, $d = \pm 1$ the sign and the multiplicity
/// $n \ge 1$ the number of minima per full rotation.
///
/// # Examples
/// ~~~
/// use torsional::fourbody::{HarmonicDihedral, IsotropicFourbodyEnergy};
/// let harmonic = HarmonicDihedral::new(1.0, 1, 4).unwrap();
/// assert_eq!(harmonic.isotropic_fourbody_energy(0.0), 2.0);
/// assert!(HarmonicDihedral::new(-1.0, 1, 4).is_err());
/// ~~~
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawHarmonicDihedral"))]
pub struct HarmonicDihedral {
    #[cfg_attr(feature = "serde", serde(rename = "k"))]
    spring_constant: f64,
    #[cfg_attr(feature = "serde", serde(rename = "d"))]
    sign: i32,
    #[cfg_attr(feature = "serde", serde(rename = "n"))]
    multiplicity: u32,
}

impl HarmonicDihedral {
    /// Create with validation of all parameters
    pub fn new(spring_constant: f64, sign: i32, multiplicity: i32) -> Result<Self, Error> {
        if !(spring_constant.is_finite() && spring_constant >= 0.0) {
            return Err(Error::invalid_parameter(
                "k",
                format!("must be finite and non-negative, got {spring_constant}"),
            ));
        }
        if sign != 1 && sign != -1 {
            return Err(Error::invalid_parameter(
                "d",
                format!("must be -1 or +1, got {sign}"),
            ));
        }
        if multiplicity < 1 {
            return Err(Error::invalid_parameter(
                "n",
                format!("must be a positive integer, got {multiplicity}"),
            ));
        }
        Ok(Self {
            spring_constant,
            sign,
            multiplicity: multiplicity as u32,
        })
    }

    /// Energy scale, k
    pub const fn spring_constant(&self) -> f64 {
        self.spring_constant
    }

    /// Sign, d = ±1
    pub const fn sign(&self) -> i32 {
        self.sign
    }

    /// Multiplicity, n
    pub const fn multiplicity(&self) -> u32 {
        self.multiplicity
    }

    /// Energy and its angular derivative, (𝑈, d𝑈/dφ), sharing one sin/cos evaluation
    #[inline]
    pub fn energy_and_derivative(&self, dihedral: f64) -> (f64, f64) {
        let n = f64::from(self.multiplicity);
        let d = f64::from(self.sign);
        let (sin, cos) = (n * dihedral).sin_cos();
        (
            self.spring_constant * (1.0 + d * cos),
            -self.spring_constant * d * n * sin,
        )
    }
}

impl IsotropicFourbodyEnergy for HarmonicDihedral {
    #[inline(always)]
    fn isotropic_fourbody_energy(&self, dihedral: f64) -> f64 {
        self.energy_and_derivative(dihedral).0
    }

    #[inline(always)]
    fn isotropic_fourbody_derivative(&self, dihedral: f64) -> f64 {
        self.energy_and_derivative(dihedral).1
    }
}

impl Info for HarmonicDihedral {
    fn short_name(&self) -> Option<&'static str> {
        Some("harmonic")
    }
    fn long_name(&self) -> Option<&'static str> {
        Some("Harmonic dihedral, k(1 + d cos nφ)")
    }
}

/// Unvalidated form used when reading user input
#[cfg(feature = "serde")]
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHarmonicDihedral {
    k: f64,
    d: i32,
    n: i32,
}

#[cfg(feature = "serde")]
impl TryFrom<RawHarmonicDihedral> for HarmonicDihedral {
    type Error = Error;
    fn try_from(raw: RawHarmonicDihedral) -> Result<Self, Self::Error> {
        Self::new(raw.k, raw.d, raw.n)
    }
}
