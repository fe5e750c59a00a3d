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

//! # Torsional
//!
//! Harmonic dihedral (four-body torsion) forces for particle based molecular dynamics.
//!
//! The crate is organised leaf-first:
//!
//! - [`cell`]: periodic boundary conditions and the minimum-image convention.
//! - [`topology`]: dihedral entries, i.e. four particle indices and an interned type.
//! - [`fourbody`]: the dihedral angle, its analytic gradient, and the harmonic potential.
//! - [`coefficients`]: per-type potential parameters and the completeness check.
//! - [`force`]: the force term that turns all of the above into per-particle forces.
//! - [`integrate`]: a velocity Verlet integrator driving one or more force computes.
//!
//! ## Examples
//! ~~~
//! use torsional::{cell::Unbounded, force::HarmonicDihedralForce, Particles, Topology, Vector3};
//!
//! let mut topology = Topology::default();
//! topology.add_dihedral("dihedralA", [0, 1, 2, 3]).unwrap();
//!
//! let mut particles = Particles::from_positions(vec![
//!     Vector3::new(0.0, 1.0, 0.0),
//!     Vector3::new(0.0, 0.0, 0.0),
//!     Vector3::new(1.0, 0.0, 0.0),
//!     Vector3::new(1.0, -1.0, 0.0),
//! ]);
//!
//! let mut harmonic = HarmonicDihedralForce::default();
//! assert!(harmonic.evaluate(&topology, &mut particles, &Unbounded).is_err());
//!
//! harmonic.set_coefficients("dihedralA", 1.0, 1, 4).unwrap();
//! let report = harmonic.evaluate(&topology, &mut particles, &Unbounded).unwrap();
//! assert!((report.energy - 2.0).abs() < 1e-12);
//! ~~~

#[cfg(test)]
extern crate approx;

/// A point in 3D space
pub type Vector3 = nalgebra::Vector3<f64>;

pub mod cell;
pub mod coefficients;
mod error;
pub mod force;
pub mod fourbody;
pub mod integrate;
mod particles;
pub mod topology;

pub use error::{DegenerateGeometry, Error};
pub use particles::Particles;
pub use topology::{DihedralEntry, Topology, TypeId};

/// Short name, citation and url of an interaction or compute
pub trait Info {
    /// Short name used in e.g. log quantities
    fn short_name(&self) -> Option<&'static str> {
        None
    }
    /// Long, human readable name
    fn long_name(&self) -> Option<&'static str> {
        None
    }
    /// Citation for the method or potential
    fn citation(&self) -> Option<&'static str> {
        None
    }
    /// Tries to extract a URL from the citation
    fn url(&self) -> Option<String> {
        self.citation()
            .and_then(|c| c.split_whitespace().find(|s| s.starts_with("http")))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Cited;
    impl Info for Cited {
        fn citation(&self) -> Option<&'static str> {
            Some("Dihedral angle, https://en.wikipedia.org/wiki/Dihedral_angle")
        }
    }

    #[test]
    fn test_info_url() {
        assert_eq!(
            Cited.url().as_deref(),
            Some("https://en.wikipedia.org/wiki/Dihedral_angle")
        );
        assert!(Cited.short_name().is_none());
    }
}
