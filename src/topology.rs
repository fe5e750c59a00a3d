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

//! # Topology
//!
//! Dihedral entries between four particles, each tagged with an interned type.
//! Type names are case-sensitive: `dihedralA` and `DihedralA` are different types.

use crate::Error;
use itertools::Itertools;
use std::collections::{BTreeSet, HashMap};

/// Dense, interned identifier of a dihedral type name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub(crate) usize);

impl TypeId {
    /// Position in the dense type table
    pub const fn index(&self) -> usize {
        self.0
    }
}

/// Dihedral between four particles, bonded as a-b-c-d
///
/// The torsion is measured about the b-c axis, so the order of the indices matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DihedralEntry {
    index: [usize; 4],
    type_id: TypeId,
}

impl DihedralEntry {
    /// Particle indices a, b, c, d
    pub const fn index(&self) -> &[usize; 4] {
        &self.index
    }
    /// Interned dihedral type
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }
    /// Determines if the dihedral contains the given particle index
    pub fn contains(&self, index: usize) -> bool {
        self.index.contains(&index)
    }
}

/// Collection of dihedral entries and the type names they refer to
///
/// Entries are never mutated once added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    type_names: Vec<String>,
    type_lookup: HashMap<String, TypeId>,
    dihedrals: Vec<DihedralEntry>,
}

impl Topology {
    /// Intern a type name, returning its id.
    ///
    /// Declaring a type does not make it _referenced_; only [`Topology::add_dihedral`] does that.
    pub fn intern(&mut self, type_name: &str) -> TypeId {
        if let Some(id) = self.type_lookup.get(type_name) {
            return *id;
        }
        let id = TypeId(self.type_names.len());
        self.type_names.push(type_name.to_string());
        self.type_lookup.insert(type_name.to_string(), id);
        id
    }

    /// Add a dihedral a-b-c-d of the given type and return its position in the list
    pub fn add_dihedral(&mut self, type_name: &str, index: [usize; 4]) -> Result<usize, Error> {
        if !index.iter().all_unique() {
            return Err(Error::InvalidDihedral {
                index,
                reason: "particle indices must be unique",
            });
        }
        let type_id = self.intern(type_name);
        self.dihedrals.push(DihedralEntry { index, type_id });
        Ok(self.dihedrals.len() - 1)
    }

    /// Add a dihedral for every four consecutive particles in a linear chain
    ///
    /// A chain of _N_ particles gives _N_ - 3 dihedrals; shorter chains add nothing.
    /// Returns the number of added dihedrals.
    ///
    /// # Examples
    /// ~~~
    /// use torsional::Topology;
    /// let mut topology = Topology::default();
    /// let added = topology.add_linear_chain("backbone", &[0, 1, 2, 3, 4, 5]).unwrap();
    /// assert_eq!(added, 3);
    /// assert_eq!(topology.dihedrals()[2].index(), &[2, 3, 4, 5]);
    /// ~~~
    pub fn add_linear_chain(&mut self, type_name: &str, chain: &[usize]) -> Result<usize, Error> {
        if let Some(index) = chain.iter().duplicates().next() {
            return Err(Error::InvalidDihedral {
                index: [*index; 4],
                reason: "particle appears more than once in chain",
            });
        }
        let count_before = self.dihedrals.len();
        for (&a, &b, &c, &d) in chain.iter().tuple_windows() {
            self.add_dihedral(type_name, [a, b, c, d])?;
        }
        Ok(self.dihedrals.len() - count_before)
    }

    /// All dihedral entries
    pub fn dihedrals(&self) -> &[DihedralEntry] {
        &self.dihedrals
    }

    /// Number of dihedral entries
    pub fn len(&self) -> usize {
        self.dihedrals.len()
    }

    /// True if there are no dihedral entries
    pub fn is_empty(&self) -> bool {
        self.dihedrals.is_empty()
    }

    /// All interned type names, indexed by [`TypeId::index`]
    pub fn type_names(&self) -> &[String] {
        &self.type_names
    }

    /// Name of an interned type
    pub fn type_name(&self, id: TypeId) -> Option<&str> {
        self.type_names.get(id.0).map(String::as_str)
    }

    /// Look up the id of a type name
    pub fn type_id(&self, type_name: &str) -> Option<TypeId> {
        self.type_lookup.get(type_name).copied()
    }

    /// Distinct types referenced by at least one dihedral entry
    pub fn referenced_types(&self) -> BTreeSet<TypeId> {
        self.dihedrals.iter().map(DihedralEntry::type_id).collect()
    }

    /// Largest particle index referred to by any dihedral
    pub fn max_particle_index(&self) -> Option<usize> {
        self.dihedrals
            .iter()
            .flat_map(|d| d.index.iter().copied())
            .max()
    }
}
