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

use crate::{Error, Vector3};

/// Particle store with positions, velocities, masses and force accumulators
///
/// Particles are identified by their stable index into the arrays.
/// Force terms only read positions and _add_ to forces and energies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Particles {
    pub positions: Vec<Vector3>,
    pub velocities: Vec<Vector3>,
    pub forces: Vec<Vector3>,
    pub masses: Vec<f64>,
    /// Potential energy attributed to each particle
    pub energies: Vec<f64>,
}

impl Particles {
    /// Create particles at rest with unit mass
    pub fn from_positions(positions: Vec<Vector3>) -> Self {
        let n = positions.len();
        Self {
            positions,
            velocities: vec![Vector3::zeros(); n],
            forces: vec![Vector3::zeros(); n],
            masses: vec![1.0; n],
            energies: vec![0.0; n],
        }
    }

    /// Number of particles
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True if there are no particles
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Reset all force and energy accumulators to zero
    pub fn zero_forces(&mut self) {
        self.forces.fill(Vector3::zeros());
        self.energies.fill(0.0);
    }

    /// Sum of all accumulated forces
    pub fn net_force(&self) -> Vector3 {
        self.forces.iter().sum()
    }

    /// Kinetic energy, ½ Σ mᵢvᵢ²
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self
            .masses
            .iter()
            .zip(&self.velocities)
            .map(|(m, v)| m * v.norm_squared())
            .sum::<f64>()
    }

    /// Total linear momentum, Σ mᵢvᵢ
    pub fn total_momentum(&self) -> Vector3 {
        self.masses
            .iter()
            .zip(&self.velocities)
            .map(|(m, v)| *m * v)
            .sum()
    }

    /// Check that `index` refers to an existing particle
    pub fn check_index(&self, index: usize) -> Result<(), Error> {
        if index < self.len() {
            Ok(())
        } else {
            Err(Error::ParticleIndex {
                index,
                len: self.len(),
            })
        }
    }
}
