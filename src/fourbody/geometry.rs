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

//! Dihedral angle and its analytic gradient.

use crate::{cell::BoundaryConditions, DegenerateGeometry, Vector3};

/// Squared sine of a bond angle below which the chain is considered linear
const LINEAR_TOLERANCE: f64 = 1e-10;
/// Squared b-c separation below which b and c are considered overlapping
const OVERLAP_TOLERANCE: f64 = 1e-24;

/// Dihedral angle of a chain a-b-c-d together with ∂φ/∂𝒓 for all four particles
///
/// With the bond vectors 𝒓ₐ₆ = 𝒓ₐ - 𝒓₆, 𝒓꜀₆ = 𝒓꜀ - 𝒓₆, 𝒓₆꜀ = 𝒓₆ - 𝒓꜀ (all minimum image)
/// and plane normals 𝒎 = 𝒓ₐ₆ × 𝒓꜀₆, 𝒏 = 𝒓₆꜀ × 𝒓꜀₆, the signed angle is
/// $$ φ = \operatorname{atan2}\left((𝒎 × 𝒏) \cdot \hat{𝒓}_{cb},\ 𝒎 \cdot 𝒏\right) \in (-π, π] $$
/// so that a planar _trans_ chain has φ = π and a planar _cis_ chain φ = 0.
///
/// The gradients follow the standard torsion-angle expressions
/// (Bekker; Blondel and Karplus), which sum to zero by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct DihedralGeometry {
    angle: f64,
    gradients: [Vector3; 4],
    /// 𝒓ₐ₆, 𝒓꜀₆, 𝒓₆꜀
    bonds: [Vector3; 3],
}

impl DihedralGeometry {
    /// Measure the dihedral of `positions` = [a, b, c, d] in the given cell
    ///
    /// # Examples
    /// ~~~
    /// use torsional::{cell::Unbounded, fourbody::DihedralGeometry, Vector3};
    /// let positions = [
    ///     Vector3::new(1.0, 0.0, 0.0),
    ///     Vector3::new(0.0, 0.0, 0.0),
    ///     Vector3::new(0.0, 0.0, 1.0),
    ///     Vector3::new(0.0, 1.0, 1.0),
    /// ];
    /// let geometry = DihedralGeometry::new([&positions[0], &positions[1], &positions[2], &positions[3]], &Unbounded).unwrap();
    /// assert!((geometry.angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    /// ~~~
    pub fn new<B: BoundaryConditions + ?Sized>(
        positions: [&Vector3; 4],
        cell: &B,
    ) -> Result<Self, DegenerateGeometry> {
        let [a, b, c, d] = positions;
        let r_ab = cell.distance(a, b);
        let r_cb = cell.distance(c, b);
        let r_dc = cell.distance(d, c);

        let r_ab_sq = r_ab.norm_squared();
        let r_cb_sq = r_cb.norm_squared();
        let r_dc_sq = r_dc.norm_squared();

        if !(r_cb_sq >= OVERLAP_TOLERANCE) {
            return Err(DegenerateGeometry("particles b and c overlap"));
        }

        let m = r_ab.cross(&r_cb);
        let n = r_dc.cross(&r_cb);
        let m_sq = m.norm_squared();
        let n_sq = n.norm_squared();

        if !(m_sq > LINEAR_TOLERANCE * r_ab_sq * r_cb_sq) {
            return Err(DegenerateGeometry("particles a, b, c are collinear"));
        }
        if !(n_sq > LINEAR_TOLERANCE * r_dc_sq * r_cb_sq) {
            return Err(DegenerateGeometry("particles b, c, d are collinear"));
        }

        let r_cb_len = r_cb_sq.sqrt();
        let angle = f64::atan2(m.cross(&n).dot(&r_cb) / r_cb_len, m.dot(&n));

        let grad_a = m * (r_cb_len / m_sq);
        let grad_d = n * (-r_cb_len / n_sq);
        let p = r_ab.dot(&r_cb) / r_cb_sq;
        let q = -r_dc.dot(&r_cb) / r_cb_sq;
        let grad_b = grad_a * (p - 1.0) - grad_d * q;
        let grad_c = grad_d * (q - 1.0) - grad_a * p;

        Ok(Self {
            angle,
            gradients: [grad_a, grad_b, grad_c, grad_d],
            bonds: [r_ab, r_cb, r_dc],
        })
    }

    /// Signed dihedral angle in (-π, π]
    pub const fn angle(&self) -> f64 {
        self.angle
    }

    /// ∂φ/∂𝒓 for particles a, b, c, d
    pub const fn gradients(&self) -> &[Vector3; 4] {
        &self.gradients
    }

    /// Minimum-image bond vectors 𝒓ₐ₆, 𝒓꜀₆, 𝒓₆꜀
    pub const fn bonds(&self) -> &[Vector3; 3] {
        &self.bonds
    }

    /// Forces 𝑭ᵢ = -(d𝑈/dφ)(∂φ/∂𝒓ᵢ) on a, b, c, d
    pub fn forces(&self, du_dphi: f64) -> [Vector3; 4] {
        self.gradients.map(|gradient| gradient * -du_dphi)
    }

    /// Positions of a, b, c, d relative to b, unwrapped across periodic boundaries
    pub fn unwrapped_positions(&self) -> [Vector3; 4] {
        let [r_ab, r_cb, r_dc] = self.bonds;
        [r_ab, Vector3::zeros(), r_cb, r_cb + r_dc]
    }

    /// Virial contribution, Σᵢ 𝒓ᵢ · 𝑭ᵢ, using unwrapped positions
    pub fn virial(&self, forces: &[Vector3; 4]) -> f64 {
        self.unwrapped_positions()
            .iter()
            .zip(forces)
            .map(|(r, f)| r.dot(f))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cuboid, Unbounded};
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn measure(p: &[Vector3; 4]) -> Result<DihedralGeometry, DegenerateGeometry> {
        DihedralGeometry::new([&p[0], &p[1], &p[2], &p[3]], &Unbounded)
    }

    /// Chain along z with a on the x-axis and d rotated by `phi` about z
    fn rotated_chain(phi: f64) -> [Vector3; 4] {
        [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.5),
            Vector3::new(phi.cos(), phi.sin(), 1.5),
        ]
    }

    #[test]
    fn test_angle_sign_convention() {
        for phi in [-2.5, -FRAC_PI_2, -0.3, 0.0, 0.3, FRAC_PI_2, 2.5] {
            assert_relative_eq!(measure(&rotated_chain(phi)).unwrap().angle(), phi, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_planar_trans_and_cis() {
        let trans = [
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, -1.0, 0.0),
        ];
        assert_relative_eq!(measure(&trans).unwrap().angle().abs(), PI, epsilon = 1e-12);

        let cis = [
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
        ];
        assert_relative_eq!(measure(&cis).unwrap().angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let positions = [
            Vector3::new(0.1, 1.2, -0.3),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.4, 0.2, 0.1),
            Vector3::new(1.9, 0.4, 1.3),
        ];
        let geometry = measure(&positions).unwrap();
        const H: f64 = 1e-6;
        for particle in 0..4 {
            for dim in 0..3 {
                let mut plus = positions;
                let mut minus = positions;
                plus[particle][dim] += H;
                minus[particle][dim] -= H;
                let numeric =
                    (measure(&plus).unwrap().angle() - measure(&minus).unwrap().angle()) / (2.0 * H);
                assert_relative_eq!(
                    geometry.gradients()[particle][dim],
                    numeric,
                    epsilon = 1e-6
                );
            }
        }
    }

    #[test]
    fn test_gradients_sum_to_zero() {
        let positions = [
            Vector3::new(0.3, 1.0, 0.2),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.2, -0.1, 0.4),
            Vector3::new(1.0, 0.6, 1.5),
        ];
        let geometry = measure(&positions).unwrap();
        let sum: Vector3 = geometry.gradients().iter().sum();
        assert_relative_eq!(sum, Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_minimum_image() {
        // the same chain, once inside the cell and once split across the boundary
        let cell = Cuboid::cubic(10.0).unwrap();
        let inside = rotated_chain(1.1);
        let shift = Vector3::new(4.2, -4.6, 4.0);
        let mut split = inside.map(|p| p + shift);
        split.iter_mut().for_each(|p| cell.boundary(p));
        let geometry = DihedralGeometry::new([&split[0], &split[1], &split[2], &split[3]], &cell)
            .unwrap();
        assert_relative_eq!(geometry.angle(), 1.1, epsilon = 1e-12);
        assert_relative_eq!(
            geometry.unwrapped_positions()[3],
            inside[3] - inside[1],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_degenerate_geometry() {
        let linear = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(2.0, 1.0, 0.0),
        ];
        assert_eq!(
            measure(&linear),
            Err(DegenerateGeometry("particles a, b, c are collinear"))
        );

        let linear_tail = [
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 1e-9, 0.0),
        ];
        assert_eq!(
            measure(&linear_tail),
            Err(DegenerateGeometry("particles b, c, d are collinear"))
        );

        let overlap = [
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.5, 0.5, 0.5),
            Vector3::new(0.5, 0.5, 0.5),
            Vector3::new(2.0, 1.0, 0.0),
        ];
        assert_eq!(
            measure(&overlap),
            Err(DegenerateGeometry("particles b and c overlap"))
        );

        let nan = [Vector3::repeat(f64::NAN); 4];
        assert!(measure(&nan).is_err());
    }

    #[test]
    fn test_forces_and_virial() {
        let geometry = measure(&rotated_chain(0.8)).unwrap();
        let forces = geometry.forces(2.0);
        for (force, gradient) in forces.iter().zip(geometry.gradients()) {
            assert_relative_eq!(*force, gradient * -2.0);
        }
        // a torque-free internal force has a translation independent virial
        let virial = geometry.virial(&forces);
        let shifted: f64 = geometry
            .unwrapped_positions()
            .iter()
            .zip(&forces)
            .map(|(r, f)| (r + Vector3::new(3.0, -1.0, 7.0)).dot(f))
            .sum();
        assert_relative_eq!(virial, shifted, epsilon = 1e-12);
    }
}
