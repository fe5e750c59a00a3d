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

//! Random linear polymers in a periodic box with a single harmonic dihedral.
//!
//! The first run has no dihedral coefficients and must fail before any particle moves;
//! coefficients are then read from JSON into the same integrator and the run completes.
//!
//! Run with `RUST_LOG=info cargo run --example polymer`.

use rand::{rngs::StdRng, Rng, SeedableRng};
use torsional::{
    cell::{BoundaryConditions, Cuboid},
    coefficients::CoefficientTable,
    force::HarmonicDihedralForce,
    integrate::{System, VelocityVerlet},
    Error, Particles, Topology, Vector3,
};

const BOND_LENGTH: f64 = 1.2;
const SEPARATION: f64 = 0.7;
const MAX_ATTEMPTS: usize = 1000;

/// Random unit vector by rejection from the unit cube
fn random_direction(rng: &mut impl Rng) -> Vector3 {
    loop {
        let v = Vector3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        let norm_squared = v.norm_squared();
        if norm_squared > 1e-3 && norm_squared <= 1.0 {
            return v / norm_squared.sqrt();
        }
    }
}

fn overlaps(cell: &Cuboid, positions: &[Vector3], trial: &Vector3) -> bool {
    positions
        .iter()
        .any(|p| cell.distance(p, trial).norm_squared() < SEPARATION * SEPARATION)
}

/// Append `count` random walk chains of `length` particles and return their indices
fn add_polymers(
    rng: &mut impl Rng,
    cell: &Cuboid,
    positions: &mut Vec<Vector3>,
    length: usize,
    count: usize,
) -> anyhow::Result<Vec<Vec<usize>>> {
    let half = 0.5 * cell.length();
    let mut chains = Vec::with_capacity(count);
    for _ in 0..count {
        let start = positions.len();
        'particle: for monomer in 0..length {
            for _ in 0..MAX_ATTEMPTS {
                let mut trial = if monomer == 0 {
                    Vector3::new(
                        rng.gen_range(-half.x..half.x),
                        rng.gen_range(-half.y..half.y),
                        rng.gen_range(-half.z..half.z),
                    )
                } else {
                    positions[positions.len() - 1] + random_direction(rng) * BOND_LENGTH
                };
                cell.boundary(&mut trial);
                if !overlaps(cell, positions, &trial) {
                    positions.push(trial);
                    continue 'particle;
                }
            }
            anyhow::bail!("could not place monomer {monomer} without overlap");
        }
        chains.push((start..positions.len()).collect());
    }
    Ok(chains)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut rng = StdRng::seed_from_u64(4);
    let cell = Cuboid::cubic(35.0)?;
    let mut positions = Vec::new();
    let long = add_polymers(&mut rng, &cell, &mut positions, 19, 100)?;
    let short = add_polymers(&mut rng, &cell, &mut positions, 4, 10)?;
    println!(
        "{} particles in {} + {} chains",
        positions.len(),
        long.len(),
        short.len()
    );

    let mut topology = Topology::default();
    topology.add_dihedral("dihedralA", [0, 1, 2, 3])?;

    let mut system = System {
        topology,
        particles: Particles::from_positions(positions),
        cell,
    };

    // no coefficients: the run must fail without moving anything
    let mut integrator = VelocityVerlet::new(0.005)?.with_force(HarmonicDihedralForce::default());
    let before = system.particles.positions.clone();
    match integrator.run(&mut system, 100) {
        Err(err) => {
            let missing = matches!(
                err.downcast_ref::<Error>(),
                Some(Error::MissingCoefficients { .. })
            );
            anyhow::ensure!(missing, "unexpected error: {err:#}");
            anyhow::ensure!(system.particles.positions == before, "particles moved");
            println!("run without coefficients failed as expected: {err:#}");
        }
        Ok(()) => anyhow::bail!("run without dihedral coefficients succeeded"),
    }

    let coefficients: CoefficientTable =
        serde_json::from_str(r#"{"dihedralA": {"k": 1.0, "d": 1, "n": 4}}"#)?;
    let dihedrals = integrator
        .force_mut::<HarmonicDihedralForce>()
        .ok_or_else(|| anyhow::anyhow!("no dihedral force"))?;
    for (name, params) in coefficients.iter() {
        dihedrals.coefficients_mut().insert(name, *params);
    }
    integrator.run(&mut system, 100)?;

    if let Some(report) = integrator.last_report() {
        println!(
            "step {}: dihedral energy = {:.6}, kinetic energy = {:.6}",
            report.timestep,
            integrator
                .log_value("dihedral_harmonic_energy")
                .unwrap_or_default(),
            report.kinetic_energy
        );
    }
    Ok(())
}
