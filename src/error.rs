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

//! Error types for dihedral setup and evaluation.

use thiserror::Error;

/// Errors raised while configuring or evaluating dihedral interactions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A potential parameter is out of range, e.g. negative force constant.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// One or more dihedral types referenced by the topology have no coefficients.
    ///
    /// Raised before any force is accumulated; retrying without setting
    /// coefficients reproduces the same failure.
    #[error("coefficients not set for dihedral type(s): {}", .types.join(", "))]
    MissingCoefficients {
        /// Type names lacking coefficients, sorted
        types: Vec<String>,
    },

    /// Lookup of a single dihedral type without coefficients.
    #[error("no coefficients for dihedral type `{0}`")]
    UnsetCoefficient(String),

    /// A dihedral entry that cannot describe a four-body chain.
    #[error("invalid dihedral {index:?}: {reason}")]
    InvalidDihedral {
        /// The four particle indices
        index: [usize; 4],
        /// What is wrong with it
        reason: &'static str,
    },

    /// A dihedral refers to a particle that does not exist.
    #[error("dihedral refers to particle {index} but only {len} particles exist")]
    ParticleIndex {
        /// Offending particle index
        index: usize,
        /// Number of particles in the store
        len: usize,
    },
}

impl Error {
    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// The dihedral angle is undefined because the chain is (nearly) linear
/// or two consecutive particles coincide.
///
/// Non-fatal: the affected entry contributes neither energy nor force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("degenerate dihedral geometry: {0}")]
pub struct DegenerateGeometry(pub &'static str);
