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

//! # Harmonic dihedral force
//!
//! Energy and forces from [`HarmonicDihedral`] for every dihedral in a [`Topology`].
//!
//! Before anything is accumulated, all dihedral types referenced by the topology must
//! have coefficients and all particle indices must exist. If not, the evaluation fails
//! and no force or energy accumulator is touched.

use crate::{
    cell::BoundaryConditions,
    coefficients::CoefficientTable,
    fourbody::{DihedralGeometry, HarmonicDihedral},
    DegenerateGeometry, DihedralEntry, Error, Info, Particles, Topology, Vector3,
};

/// Name of the log quantity holding the dihedral energy of the last evaluation
pub const ENERGY_LOG_QUANTITY: &str = "dihedral_harmonic_energy";

/// Configuration state of the force term with respect to a topology
///
/// `Uninitialized → CoefficientsPartial → CoefficientsComplete → Evaluating`.
/// Only `CoefficientsComplete` may enter `Evaluating`; a topology that introduces a
/// new dihedral type brings the state back to `CoefficientsPartial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoefficientStatus {
    /// No coefficients set while the topology needs some
    #[default]
    Uninitialized,
    /// Some, but not all, referenced types have coefficients
    CoefficientsPartial,
    /// All referenced types have coefficients
    CoefficientsComplete,
    /// An evaluation pass is running
    Evaluating,
}

/// Outcome of one evaluation pass
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EvaluationReport {
    /// Total dihedral energy
    pub energy: f64,
    /// Virial, Σ 𝒓ᵢ · 𝑭ᵢ
    pub virial: f64,
    /// Number of dihedrals that contributed
    pub evaluated: usize,
    /// Number of dihedrals skipped due to degenerate geometry
    pub degenerate: usize,
}

impl EvaluationReport {
    #[cfg(feature = "rayon")]
    fn merge(mut self, other: Self) -> Self {
        self.energy += other.energy;
        self.virial += other.virial;
        self.evaluated += other.evaluated;
        self.degenerate += other.degenerate;
        self
    }
}

/// Energy, forces and virial of a single dihedral
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DihedralContribution {
    pub energy: f64,
    /// Forces on a, b, c, d
    pub forces: [Vector3; 4],
    /// Virial, 𝒓ᵢ·𝑭ᵢ summed over the unwrapped positions
    pub virial: f64,
}

impl DihedralContribution {
    /// Evaluate one dihedral
    ///
    /// # Panics
    /// If a particle index of `entry` is outside `positions`.
    pub(crate) fn new<B: BoundaryConditions + ?Sized>(
        entry: &DihedralEntry,
        params: &HarmonicDihedral,
        positions: &[Vector3],
        cell: &B,
    ) -> Result<Self, DegenerateGeometry> {
        let [a, b, c, d] = *entry.index();
        let geometry = DihedralGeometry::new(
            [&positions[a], &positions[b], &positions[c], &positions[d]],
            cell,
        )?;
        let (energy, du_dphi) = params.energy_and_derivative(geometry.angle());
        let forces = geometry.forces(du_dphi);
        let virial = geometry.virial(&forces);
        Ok(Self {
            energy,
            forces,
            virial,
        })
    }
}

/// Harmonic dihedral force term
///
/// Owns the [`CoefficientTable`]; the topology, particles and cell are passed explicitly
/// to each evaluation.
#[derive(Debug, Clone, Default)]
pub struct HarmonicDihedralForce {
    coefficients: CoefficientTable,
    state: CoefficientStatus,
    last_report: Option<EvaluationReport>,
}

impl HarmonicDihedralForce {
    /// Create from an existing coefficient table, e.g. read from a configuration file
    pub fn with_coefficients(coefficients: CoefficientTable) -> Self {
        Self {
            coefficients,
            ..Default::default()
        }
    }

    /// Validate and set coefficients for a dihedral type
    pub fn set_coefficients(&mut self, type_name: &str, k: f64, d: i32, n: i32) -> Result<(), Error> {
        self.coefficients.set(type_name, k, d, n)
    }

    /// Coefficient table
    pub const fn coefficients(&self) -> &CoefficientTable {
        &self.coefficients
    }

    /// Mutable coefficient table, e.g. to merge coefficients read from a file
    pub fn coefficients_mut(&mut self) -> &mut CoefficientTable {
        &mut self.coefficients
    }

    /// State recorded at the most recent evaluation attempt
    pub const fn state(&self) -> CoefficientStatus {
        self.state
    }

    /// Report of the most recent successful evaluation
    pub const fn last_report(&self) -> Option<&EvaluationReport> {
        self.last_report.as_ref()
    }

    /// Configuration state with respect to `topology`
    pub fn status(&self, topology: &Topology) -> CoefficientStatus {
        let referenced = topology.referenced_types();
        let complete = referenced
            .iter()
            .filter_map(|id| topology.type_name(*id))
            .all(|name| self.coefficients.contains(name));
        if complete {
            CoefficientStatus::CoefficientsComplete
        } else if self.coefficients.is_empty() {
            CoefficientStatus::Uninitialized
        } else {
            CoefficientStatus::CoefficientsPartial
        }
    }

    /// Check coefficients and particle indices without touching any accumulator
    ///
    /// Returns the coefficients of each topology type, indexed by [`crate::TypeId::index`].
    /// Types not referenced by any dihedral may be `None`.
    pub fn precheck(
        &self,
        topology: &Topology,
        particles: &Particles,
    ) -> Result<Vec<Option<HarmonicDihedral>>, Error> {
        let referenced = topology.referenced_types();
        let required = referenced.iter().filter_map(|id| topology.type_name(*id));
        let missing = self.coefficients.missing(required);
        if !missing.is_empty() {
            return Err(Error::MissingCoefficients { types: missing });
        }
        if let Some(index) = topology.max_particle_index() {
            particles.check_index(index)?;
        }
        Ok(topology
            .type_names()
            .iter()
            .map(|name| self.coefficients.get(name).ok().copied())
            .collect())
    }

    /// Pre-check, then record the state transition into `Evaluating`
    fn begin(
        &mut self,
        topology: &Topology,
        particles: &Particles,
    ) -> Result<Vec<Option<HarmonicDihedral>>, Error> {
        match self.precheck(topology, particles) {
            Ok(resolved) => {
                self.state = CoefficientStatus::Evaluating;
                Ok(resolved)
            }
            Err(err) => {
                self.state = self.status(topology);
                log::error!("dihedral.harmonic: {err}");
                Err(err)
            }
        }
    }

    fn finish(&mut self, report: EvaluationReport) -> EvaluationReport {
        if report.degenerate > 0 {
            log::warn!(
                "dihedral.harmonic: {} of {} dihedrals have degenerate geometry and were skipped",
                report.degenerate,
                report.degenerate + report.evaluated
            );
        }
        self.state = CoefficientStatus::CoefficientsComplete;
        self.last_report = Some(report);
        report
    }

    /// Add dihedral forces and energies to the particle accumulators
    ///
    /// Forces are added to, not overwritten. Each particle in a dihedral receives a
    /// quarter of its energy.
    pub fn evaluate<B: BoundaryConditions + ?Sized>(
        &mut self,
        topology: &Topology,
        particles: &mut Particles,
        cell: &B,
    ) -> Result<EvaluationReport, Error> {
        let resolved = self.begin(topology, particles)?;
        let Particles {
            positions,
            forces,
            energies,
            ..
        } = particles;
        let mut report = EvaluationReport::default();
        for (entry, params) in resolve(topology, &resolved) {
            accumulate(entry, &params, positions, cell, forces, energies, &mut report);
        }
        Ok(self.finish(report))
    }

    /// Parallel version of [`HarmonicDihedralForce::evaluate`]
    ///
    /// Each thread sums into its own force buffer and the buffers are reduced afterwards,
    /// so results agree with the serial version to within round-off.
    #[cfg(feature = "rayon")]
    pub fn evaluate_parallel<B: BoundaryConditions + ?Sized>(
        &mut self,
        topology: &Topology,
        particles: &mut Particles,
        cell: &B,
    ) -> Result<EvaluationReport, Error> {
        use rayon::prelude::*;
        let resolved = self.begin(topology, particles)?;
        let n = particles.len();
        let positions = &particles.positions;
        let (forces, energies, report) = topology
            .dihedrals()
            .par_iter()
            .filter_map(|entry| resolved[entry.type_id().index()].map(|params| (entry, params)))
            .fold(
                || (vec![Vector3::zeros(); n], vec![0.0; n], EvaluationReport::default()),
                |(mut forces, mut energies, mut report), (entry, params)| {
                    accumulate(entry, &params, positions, cell, &mut forces, &mut energies, &mut report);
                    (forces, energies, report)
                },
            )
            .reduce(
                || (vec![Vector3::zeros(); n], vec![0.0; n], EvaluationReport::default()),
                |(mut forces, mut energies, report), (other_forces, other_energies, other_report)| {
                    forces.iter_mut().zip(other_forces).for_each(|(f, g)| *f += g);
                    energies.iter_mut().zip(other_energies).for_each(|(u, w)| *u += w);
                    (forces, energies, report.merge(other_report))
                },
            );
        particles.forces.iter_mut().zip(forces).for_each(|(f, g)| *f += g);
        particles.energies.iter_mut().zip(energies).for_each(|(u, w)| *u += w);
        Ok(self.finish(report))
    }

    /// Log quantities provided by this force term
    pub fn provided_log_quantities(&self) -> Vec<&'static str> {
        vec![ENERGY_LOG_QUANTITY]
    }

    /// Value of a log quantity from the last successful evaluation
    pub fn log_value(&self, quantity: &str) -> Option<f64> {
        match quantity {
            ENERGY_LOG_QUANTITY => self.last_report.map(|report| report.energy),
            _ => None,
        }
    }
}

impl Info for HarmonicDihedralForce {
    fn short_name(&self) -> Option<&'static str> {
        Some("dihedral.harmonic")
    }
    fn long_name(&self) -> Option<&'static str> {
        Some("Harmonic dihedral force, k(1 + d cos nφ)")
    }
}

/// Pair each dihedral with its coefficients
///
/// After a successful pre-check every referenced type resolves.
fn resolve<'a>(
    topology: &'a Topology,
    resolved: &'a [Option<HarmonicDihedral>],
) -> impl Iterator<Item = (&'a DihedralEntry, HarmonicDihedral)> + 'a {
    topology
        .dihedrals()
        .iter()
        .filter_map(|entry| resolved[entry.type_id().index()].map(|params| (entry, params)))
}

/// Add one dihedral to force and energy buffers; degenerate dihedrals only bump the counter
fn accumulate<B: BoundaryConditions + ?Sized>(
    entry: &DihedralEntry,
    params: &HarmonicDihedral,
    positions: &[Vector3],
    cell: &B,
    forces: &mut [Vector3],
    energies: &mut [f64],
    report: &mut EvaluationReport,
) {
    match DihedralContribution::new(entry, params, positions, cell) {
        Ok(contribution) => {
            for (&i, force) in entry.index().iter().zip(&contribution.forces) {
                forces[i] += force;
                energies[i] += 0.25 * contribution.energy;
            }
            report.energy += contribution.energy;
            report.virial += contribution.virial;
            report.evaluated += 1;
        }
        Err(err) => {
            log::debug!("dihedral {:?}: {err}", entry.index());
            report.degenerate += 1;
        }
    }
}
