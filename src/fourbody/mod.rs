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

//! ## Fourbody interactions
//!
//! Module for describing four particles, a-b-c-d, interacting through
//! the dihedral angle about the b-c axis.

use std::fmt::Debug;

mod geometry;
mod harmonic;
pub use self::geometry::DihedralGeometry;
pub use self::harmonic::HarmonicDihedral;

/// Potential energy of a dihedral angle, 𝑈(φ)
pub trait IsotropicFourbodyEnergy: Debug {
    /// Interaction energy for the dihedral angle `dihedral` (radians)
    fn isotropic_fourbody_energy(&self, dihedral: f64) -> f64;

    /// Derivative of the energy with respect to the dihedral angle, d𝑈/dφ
    ///
    /// The default implementation uses a central difference
    /// and should be overridden with the exact analytical expression for better speed
    /// and accuracy.
    fn isotropic_fourbody_derivative(&self, dihedral: f64) -> f64 {
        const EPS: f64 = 1e-6;
        let delta_u = self.isotropic_fourbody_energy(dihedral + EPS)
            - self.isotropic_fourbody_energy(dihedral - EPS);
        delta_u / (2.0 * EPS)
    }
}
