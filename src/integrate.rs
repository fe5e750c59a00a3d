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

//! # Integration
//!
//! Constant energy (NVE) time integration driven by a set of force computes.
//!
//! Every step first validates _all_ force computes. Only when that succeeds are
//! forces recomputed and velocities and positions advanced, so a misconfigured force
//! aborts the step before anything moves.

use crate::{
    cell::{BoundaryConditions, Cuboid},
    force::HarmonicDihedralForce,
    Error, Info, Particles, Topology,
};
use anyhow::Context;
use as_any::AsAny;
use std::fmt::Debug;

/// Particles, topology and cell of a simulation
#[derive(Debug, Clone, PartialEq)]
pub struct System {
    pub topology: Topology,
    pub particles: Particles,
    pub cell: Cuboid,
}

impl System {
    /// Total potential energy stored in the per-particle accumulators
    pub fn potential_energy(&self) -> f64 {
        self.particles.energies.iter().sum()
    }
}

/// Force contribution applied once per integration step
///
/// `AsAny` allows typed access to a boxed force compute, see [`VelocityVerlet::force_mut`].
pub trait ForceCompute: Info + AsAny + Debug {
    /// Check that the force can be computed for `system`, without modifying anything
    fn validate(&self, system: &System) -> anyhow::Result<()>;

    /// Add forces to the particle accumulators and return the potential energy
    fn compute(&mut self, system: &mut System) -> anyhow::Result<f64>;

    /// Names of the log quantities provided
    fn provided_log_quantities(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Value of a log quantity, if provided
    fn log_value(&self, _quantity: &str) -> Option<f64> {
        None
    }
}

impl ForceCompute for HarmonicDihedralForce {
    fn validate(&self, system: &System) -> anyhow::Result<()> {
        self.precheck(&system.topology, &system.particles)?;
        Ok(())
    }

    fn compute(&mut self, system: &mut System) -> anyhow::Result<f64> {
        let System {
            topology,
            particles,
            cell,
        } = system;
        #[cfg(feature = "rayon")]
        let report = self.evaluate_parallel(&*topology, particles, &*cell)?;
        #[cfg(not(feature = "rayon"))]
        let report = self.evaluate(&*topology, particles, &*cell)?;
        Ok(report.energy)
    }

    fn provided_log_quantities(&self) -> Vec<&'static str> {
        HarmonicDihedralForce::provided_log_quantities(self)
    }

    fn log_value(&self, quantity: &str) -> Option<f64> {
        HarmonicDihedralForce::log_value(self, quantity)
    }
}

/// Energies at the start of a completed step
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepReport {
    /// Step number, starting from zero
    pub timestep: u64,
    pub potential_energy: f64,
    pub kinetic_energy: f64,
}

impl StepReport {
    /// Sum of potential and kinetic energy
    pub fn total_energy(&self) -> f64 {
        self.potential_energy + self.kinetic_energy
    }
}

/// Velocity Verlet integrator in the microcanonical (NVE) ensemble
///
/// Forces at the current positions are computed at the start of each step. They complete
/// the velocity half-kick of the previous step and start the next one, after which positions
/// drift a full time step and are wrapped into the cell.
#[derive(Debug)]
pub struct VelocityVerlet {
    timestep_size: f64,
    timestep: u64,
    forces: Vec<Box<dyn ForceCompute>>,
    half_kick_pending: bool,
    last_report: Option<StepReport>,
}

impl VelocityVerlet {
    /// New integrator with time step `dt`
    pub fn new(dt: f64) -> Result<Self, Error> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(Error::invalid_parameter(
                "dt",
                format!("time step must be positive, got {dt}"),
            ));
        }
        Ok(Self {
            timestep_size: dt,
            timestep: 0,
            forces: Vec::new(),
            half_kick_pending: false,
            last_report: None,
        })
    }

    /// Add a force compute
    pub fn add_force(&mut self, force: impl ForceCompute + 'static) {
        self.forces.push(Box::new(force));
    }

    /// Builder style version of [`VelocityVerlet::add_force`]
    pub fn with_force(mut self, force: impl ForceCompute + 'static) -> Self {
        self.add_force(force);
        self
    }

    /// Force computes, in the order they are applied
    pub fn forces(&self) -> &[Box<dyn ForceCompute>] {
        &self.forces
    }

    /// Mutable access to the force computes
    pub fn forces_mut(&mut self) -> &mut [Box<dyn ForceCompute>] {
        &mut self.forces
    }

    /// First force compute of type `T`, e.g. to set coefficients between runs
    ///
    /// The step counter and pending half-kick are kept, so a failed run can be
    /// resumed once the force is fixed.
    pub fn force_mut<T: ForceCompute + 'static>(&mut self) -> Option<&mut T> {
        self.forces.iter_mut().find_map(|force| {
            let force: &mut dyn ForceCompute = force.as_mut();
            force.as_any_mut().downcast_mut::<T>()
        })
    }

    /// Time step
    pub const fn dt(&self) -> f64 {
        self.timestep_size
    }

    /// Number of completed steps
    pub const fn timestep(&self) -> u64 {
        self.timestep
    }

    /// Report of the most recently completed step
    pub const fn last_report(&self) -> Option<&StepReport> {
        self.last_report.as_ref()
    }

    /// Value of a named log quantity from any of the force computes
    pub fn log_value(&self, quantity: &str) -> Option<f64> {
        self.forces.iter().find_map(|force| force.log_value(quantity))
    }

    /// Advance the system a single step
    ///
    /// On error, positions, velocities, forces and the step counter are unchanged.
    pub fn step(&mut self, system: &mut System) -> anyhow::Result<StepReport> {
        for force in &self.forces {
            force.validate(system).with_context(|| {
                format!(
                    "{} cannot be computed at step {}",
                    force.short_name().unwrap_or("force"),
                    self.timestep
                )
            })?;
        }

        system.particles.zero_forces();
        let mut potential_energy = 0.0;
        for force in &mut self.forces {
            potential_energy += force.compute(system)?;
        }

        let dt = self.timestep_size;
        let particles = &mut system.particles;
        if self.half_kick_pending {
            kick(particles, 0.5 * dt);
        }
        let report = StepReport {
            timestep: self.timestep,
            potential_energy,
            kinetic_energy: particles.kinetic_energy(),
        };
        kick(particles, 0.5 * dt);
        for (position, velocity) in particles.positions.iter_mut().zip(&particles.velocities) {
            *position += velocity * dt;
            system.cell.boundary(position);
        }

        self.half_kick_pending = true;
        self.timestep += 1;
        self.last_report = Some(report);
        Ok(report)
    }

    /// Run `steps` steps, stopping at the first error
    pub fn run(&mut self, system: &mut System, steps: u64) -> anyhow::Result<()> {
        log::info!(
            "running {steps} steps from step {} with dt = {}",
            self.timestep,
            self.timestep_size
        );
        for _ in 0..steps {
            self.step(system)?;
        }
        if let Some(report) = self.last_report {
            log::info!(
                "step {}: potential energy = {:.6}, kinetic energy = {:.6}",
                report.timestep,
                report.potential_energy,
                report.kinetic_energy
            );
        }
        Ok(())
    }
}

/// vᵢ += 𝑭ᵢ/mᵢ · δt
fn kick(particles: &mut Particles, dt: f64) {
    for ((velocity, force), mass) in particles
        .velocities
        .iter_mut()
        .zip(&particles.forces)
        .zip(&particles.masses)
    {
        *velocity += force * (dt / mass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vector3;
    use approx::assert_relative_eq;

    fn chain_system() -> System {
        let mut topology = Topology::default();
        topology.add_linear_chain("dihedralA", &[0, 1, 2, 3, 4]).unwrap();
        let mut particles = Particles::from_positions(vec![
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.2, 0.0, 0.0),
            Vector3::new(1.5, 0.7, 0.8),
            Vector3::new(2.6, 0.9, 1.0),
        ]);
        particles.velocities[0] = Vector3::new(0.0, 0.0, 0.3);
        particles.velocities[4] = Vector3::new(0.0, -0.2, 0.0);
        System {
            topology,
            particles,
            cell: Cuboid::cubic(35.0).unwrap(),
        }
    }

    #[test]
    fn test_invalid_time_step() {
        assert!(VelocityVerlet::new(0.0).is_err());
        assert!(VelocityVerlet::new(-0.005).is_err());
        assert!(VelocityVerlet::new(f64::NAN).is_err());
        assert_eq!(VelocityVerlet::new(0.005).unwrap().dt(), 0.005);
    }

    #[test]
    fn test_run_fails_without_coefficients() {
        let mut system = chain_system();
        let before = system.clone();
        let mut integrator =
            VelocityVerlet::new(0.005).unwrap().with_force(HarmonicDihedralForce::default());

        let err = integrator.run(&mut system, 100).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::MissingCoefficients {
                types: vec!["dihedralA".into()]
            })
        );
        assert_eq!(system, before);
        assert_eq!(integrator.timestep(), 0);
        assert!(integrator.last_report().is_none());
    }

    #[test]
    fn test_run_with_coefficients() {
        let mut system = chain_system();
        let mut force = HarmonicDihedralForce::default();
        force.set_coefficients("dihedralA", 1.0, 1, 4).unwrap();
        let mut integrator = VelocityVerlet::new(0.005).unwrap().with_force(force);

        let first = integrator.step(&mut system).unwrap();
        integrator.run(&mut system, 99).unwrap();
        assert_eq!(integrator.timestep(), 100);
        let last = *integrator.last_report().unwrap();
        assert_eq!(last.timestep, 99);

        assert_relative_eq!(first.total_energy(), last.total_energy(), epsilon = 1e-3);
        assert_relative_eq!(
            system.particles.total_momentum(),
            Vector3::new(0.0, -0.2, 0.3),
            epsilon = 1e-10
        );
        assert_relative_eq!(
            integrator.log_value("dihedral_harmonic_energy").unwrap(),
            system.potential_energy(),
            epsilon = 1e-10
        );
        assert!(system
            .particles
            .positions
            .iter()
            .all(|p| p.iter().all(|x| x.is_finite())));
    }

    #[test]
    fn test_new_type_stops_a_running_simulation() {
        let mut system = chain_system();
        let mut force = HarmonicDihedralForce::default();
        force.set_coefficients("dihedralA", 1.0, 1, 4).unwrap();
        let mut integrator = VelocityVerlet::new(0.005).unwrap().with_force(force);
        integrator.run(&mut system, 10).unwrap();

        system.topology.add_dihedral("dihedralB", [4, 3, 2, 1]).unwrap();
        let before = system.clone();
        let err = integrator.run(&mut system, 10).unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::MissingCoefficients {
                types: vec!["dihedralB".into()]
            })
        );
        assert_eq!(system, before);
        assert_eq!(integrator.timestep(), 10);
    }

    #[test]
    fn test_positions_are_wrapped() {
        let mut system = chain_system();
        system.cell = Cuboid::cubic(4.0).unwrap();
        system.particles.velocities[4] = Vector3::new(100.0, 0.0, 0.0);
        let mut force = HarmonicDihedralForce::default();
        force.set_coefficients("dihedralA", 0.0, 1, 1).unwrap();
        let mut integrator = VelocityVerlet::new(0.01).unwrap().with_force(force);
        integrator.run(&mut system, 3).unwrap();
        for position in &system.particles.positions {
            assert!(position.iter().all(|x| (-2.0..2.0).contains(x)));
        }
    }

    #[test]
    fn test_forces_without_log_quantities() {
        #[derive(Debug)]
        struct Constant(Vector3);
        impl Info for Constant {}
        impl ForceCompute for Constant {
            fn validate(&self, _system: &System) -> anyhow::Result<()> {
                Ok(())
            }
            fn compute(&mut self, system: &mut System) -> anyhow::Result<f64> {
                system.particles.forces.iter_mut().for_each(|f| *f += self.0);
                Ok(0.0)
            }
        }

        let mut system = chain_system();
        let mut integrator = VelocityVerlet::new(0.1).unwrap();
        integrator.add_force(Constant(Vector3::new(1.0, 0.0, 0.0)));
        integrator.step(&mut system).unwrap();
        assert_eq!(integrator.forces().len(), 1);
        assert!(integrator.forces()[0].provided_log_quantities().is_empty());
        assert_eq!(integrator.log_value("dihedral_harmonic_energy"), None);
        // half kick of F/m·dt/2 on a particle starting at rest
        assert_relative_eq!(system.particles.velocities[1], Vector3::new(0.05, 0.0, 0.0));
    }

    #[test]
    fn test_set_coefficients_between_runs() {
        let mut system = chain_system();
        let mut integrator =
            VelocityVerlet::new(0.005).unwrap().with_force(HarmonicDihedralForce::default());
        let before = system.clone();
        assert!(integrator.run(&mut system, 10).is_err());
        assert_eq!(system, before);

        integrator
            .force_mut::<HarmonicDihedralForce>()
            .unwrap()
            .set_coefficients("dihedralA", 1.0, 1, 4)
            .unwrap();
        integrator.run(&mut system, 10).unwrap();
        assert_eq!(integrator.timestep(), 10);

        system.topology.add_dihedral("dihedralB", [4, 3, 2, 1]).unwrap();
        assert!(integrator.run(&mut system, 5).is_err());
        integrator
            .force_mut::<HarmonicDihedralForce>()
            .unwrap()
            .set_coefficients("dihedralB", 0.5, -1, 2)
            .unwrap();
        integrator.run(&mut system, 5).unwrap();
        assert_eq!(integrator.timestep(), 15);
        assert_eq!(integrator.last_report().unwrap().timestep, 14);
    }

    #[test]
    fn test_force_mut_by_type() {
        #[derive(Debug)]
        struct Idle;
        impl Info for Idle {}
        impl ForceCompute for Idle {
            fn validate(&self, _system: &System) -> anyhow::Result<()> {
                Ok(())
            }
            fn compute(&mut self, _system: &mut System) -> anyhow::Result<f64> {
                Ok(0.0)
            }
        }

        let mut integrator = VelocityVerlet::new(0.005).unwrap().with_force(Idle);
        assert!(integrator.force_mut::<HarmonicDihedralForce>().is_none());
        integrator.add_force(HarmonicDihedralForce::default());
        assert!(integrator.force_mut::<Idle>().is_some());
        assert!(integrator.force_mut::<HarmonicDihedralForce>().is_some());
    }
}
