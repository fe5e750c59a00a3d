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

//! # Coefficient table
//!
//! Harmonic dihedral parameters for each named dihedral type.
//! The table starts out empty: a missing type is never silently given a zero force constant.
//!
//! ## Examples
//! ~~~
//! use torsional::coefficients::CoefficientTable;
//! let mut table = CoefficientTable::default();
//! assert!(!table.is_complete(["dihedralA"]));
//! table.set("dihedralA", 1.0, 1, 4).unwrap();
//! assert!(table.is_complete(["dihedralA"]));
//! assert!(table.set("dihedralB", 1.0, 3, 4).is_err());
//! ~~~

use crate::{fourbody::HarmonicDihedral, Error};
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};

/// Dense table of dihedral coefficients keyed by type name
///
/// Names are case-sensitive. Parameters are stored contiguously;
/// the name lookup is only needed when setting or resolving coefficients,
/// not in the per-dihedral loop.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(
        from = "BTreeMap<String, HarmonicDihedral>",
        into = "BTreeMap<String, HarmonicDihedral>"
    )
)]
pub struct CoefficientTable {
    names: Vec<String>,
    lookup: HashMap<String, usize>,
    params: Vec<HarmonicDihedral>,
}

impl CoefficientTable {
    /// Validate and set coefficients for a dihedral type, replacing any previous value
    ///
    /// Nothing is changed if validation fails.
    pub fn set(&mut self, type_name: &str, k: f64, d: i32, n: i32) -> Result<(), Error> {
        let params = HarmonicDihedral::new(k, d, n)?;
        self.insert(type_name, params);
        Ok(())
    }

    /// Set already validated coefficients for a dihedral type
    pub fn insert(&mut self, type_name: &str, params: HarmonicDihedral) {
        match self.lookup.get(type_name) {
            Some(&slot) => self.params[slot] = params,
            None => {
                self.lookup.insert(type_name.to_string(), self.params.len());
                self.names.push(type_name.to_string());
                self.params.push(params);
            }
        }
        log::debug!("dihedral coefficients for `{type_name}`: {params:?}");
    }

    /// Coefficients of a dihedral type
    pub fn get(&self, type_name: &str) -> Result<&HarmonicDihedral, Error> {
        self.lookup
            .get(type_name)
            .map(|&slot| &self.params[slot])
            .ok_or_else(|| Error::UnsetCoefficient(type_name.to_string()))
    }

    /// True if coefficients are set for `type_name`
    pub fn contains(&self, type_name: &str) -> bool {
        self.lookup.contains_key(type_name)
    }

    /// True if every required type name has coefficients
    pub fn is_complete<'a>(&self, required: impl IntoIterator<Item = &'a str>) -> bool {
        required.into_iter().all(|name| self.contains(name))
    }

    /// Required type names lacking coefficients; sorted and without duplicates
    pub fn missing<'a>(&self, required: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        required
            .into_iter()
            .filter(|name| !self.contains(name))
            .sorted()
            .dedup()
            .map(str::to_string)
            .collect()
    }

    /// Number of types with coefficients
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True if no coefficients have been set
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over type names and their coefficients in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HarmonicDihedral)> {
        self.names.iter().map(String::as_str).zip(&self.params)
    }
}

impl From<BTreeMap<String, HarmonicDihedral>> for CoefficientTable {
    fn from(map: BTreeMap<String, HarmonicDihedral>) -> Self {
        let mut table = Self::default();
        for (name, params) in map {
            table.insert(&name, params);
        }
        table
    }
}

impl From<CoefficientTable> for BTreeMap<String, HarmonicDihedral> {
    fn from(table: CoefficientTable) -> Self {
        table.names.into_iter().zip(table.params).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_complete() {
        let mut table = CoefficientTable::default();
        assert!(table.is_empty());
        for (k, d, n) in [(0.0, 1, 1), (1.0, -1, 2), (40.0, 1, 6)] {
            let name = format!("type{n}");
            table.set(&name, k, d, n).unwrap();
            assert!(table.is_complete([name.as_str()]));
        }
        assert_eq!(table.len(), 3);
        assert!(table.is_complete(["type1", "type2", "type6"]));
        assert!(table.is_complete(std::iter::empty()));
    }

    #[test]
    fn test_set_overwrites() {
        let mut table = CoefficientTable::default();
        table.set("dihedralA", 1.0, 1, 4).unwrap();
        table.set("dihedralA", 2.0, -1, 3).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get("dihedralA").unwrap(),
            &HarmonicDihedral::new(2.0, -1, 3).unwrap()
        );
    }

    #[test]
    fn test_invalid_set_is_not_applied() {
        let mut table = CoefficientTable::default();
        table.set("dihedralA", 1.0, 1, 4).unwrap();
        assert!(table.set("dihedralA", -1.0, 1, 4).is_err());
        assert!(table.set("dihedralB", 1.0, 1, 0).is_err());
        assert_eq!(table.get("dihedralA").unwrap().spring_constant(), 1.0);
        assert!(!table.contains("dihedralB"));
    }

    #[test]
    fn test_get_unset() {
        let table = CoefficientTable::default();
        assert_eq!(
            table.get("dihedralA"),
            Err(Error::UnsetCoefficient("dihedralA".into()))
        );
    }

    #[test]
    fn test_missing_is_sorted_and_case_sensitive() {
        let mut table = CoefficientTable::default();
        table.set("dihedralA", 1.0, 1, 4).unwrap();
        let missing = table.missing(["zeta", "DihedralA", "dihedralA", "zeta", "alpha"]);
        assert_eq!(missing, vec!["DihedralA", "alpha", "zeta"]);
    }

    #[test]
    fn test_iter_insertion_order() {
        let mut table = CoefficientTable::default();
        table.set("b", 1.0, 1, 1).unwrap();
        table.set("a", 2.0, 1, 1).unwrap();
        let names: Vec<_> = table.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde() {
        let json = r#"{"dihedralA": {"k": 1.0, "d": 1, "n": 4}, "dihedralB": {"k": 0.5, "d": -1, "n": 2}}"#;
        let table: CoefficientTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("dihedralB").unwrap().sign(), -1);

        let roundtrip: CoefficientTable =
            serde_json::from_str(&serde_json::to_string(&table).unwrap()).unwrap();
        assert_eq!(roundtrip.get("dihedralA"), table.get("dihedralA"));

        // invalid coefficients never make it into a table
        let invalid = r#"{"dihedralA": {"k": -1.0, "d": 1, "n": 4}}"#;
        assert!(serde_json::from_str::<CoefficientTable>(invalid).is_err());
    }
}
