//! Identifier Codification
//!
//! Every array handed to the solver is indexed positionally, so each kind of entity and
//! each parameter family gets its own dense, 1-based code space. Codes follow the order in
//! which ids first appear in the validated model, which makes codification a pure function
//! of the entity graph: compiling the same model twice yields identical codes.
//!
//! The [`CodeMap`] type is the single primitive; [`ModelCodes`] bundles the entity code
//! spaces derived from a [`KineticModel`].

use std::collections::HashMap;

use itertools::Itertools;

use crate::error::EncodingError;
use crate::model::KineticModel;

/// A bijection between the ids of one code space and the integers `1..=len`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeMap {
    space: String,
    ids: Vec<String>,
    codes: HashMap<String, usize>,
}

impl CodeMap {
    /// Codifies an ordered sequence of unique ids.
    ///
    /// # Arguments
    ///
    /// * `space` - Name of the code space, used in error messages
    /// * `ids` - Ids in the order their codes should follow
    ///
    /// # Returns
    ///
    /// Returns the code map, or [`EncodingError::DuplicateId`] if an id occurs twice.
    pub fn new<I, S>(space: impl Into<String>, ids: I) -> Result<Self, EncodingError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let space = space.into();
        let mut map = Self {
            space,
            ids: Vec::new(),
            codes: HashMap::new(),
        };

        for id in ids {
            let id = id.into();
            if map.codes.contains_key(&id) {
                return Err(EncodingError::DuplicateId {
                    space: map.space,
                    id,
                });
            }
            map.ids.push(id.clone());
            map.codes.insert(id, map.ids.len());
        }

        Ok(map)
    }

    /// Codifies ids in order of first appearance, silently skipping repeats.
    ///
    /// Used for spaces such as Km whose ids are collected from several edges that may
    /// share an enzyme-metabolite pair.
    pub fn first_appearance<I, S>(space: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique = ids.into_iter().map(Into::into).unique().collect::<Vec<String>>();
        let codes = unique
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i + 1))
            .collect();

        Self {
            space: space.into(),
            ids: unique,
            codes,
        }
    }

    /// Name of the code space.
    pub fn space(&self) -> &str {
        &self.space
    }

    /// Returns the code of an id.
    pub fn code(&self, id: &str) -> Result<usize, EncodingError> {
        self.get(id).ok_or_else(|| EncodingError::UnknownId {
            space: self.space.clone(),
            id: id.to_string(),
        })
    }

    /// Returns the code of an id, if the id is part of this space.
    pub fn get(&self, id: &str) -> Option<usize> {
        self.codes.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.codes.contains_key(id)
    }

    /// Returns the id a code stands for.
    pub fn decode(&self, code: usize) -> Option<&str> {
        code.checked_sub(1)
            .and_then(|i| self.ids.get(i))
            .map(String::as_str)
    }

    /// Like [`CodeMap::decode`], failing with an [`EncodingError`] for codes out of range.
    pub fn try_decode(&self, code: usize) -> Result<&str, EncodingError> {
        self.decode(code).ok_or_else(|| EncodingError::UnknownCode {
            space: self.space.clone(),
            code,
            size: self.len(),
        })
    }

    /// Codes of several ids, in the given order.
    pub fn codes<'a, I>(&self, ids: I) -> Result<Vec<usize>, EncodingError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        ids.into_iter().map(|id| self.code(id)).collect()
    }

    /// Ids in code order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Iterates over `(code, id)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.ids.iter().enumerate().map(|(i, id)| (i + 1, id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Code spaces of all entity kinds of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCodes {
    pub metabolite: CodeMap,
    pub compartment: CodeMap,
    pub mic: CodeMap,
    pub balanced_mic: CodeMap,
    pub unbalanced_mic: CodeMap,
    pub enzyme: CodeMap,
    pub reaction: CodeMap,
    pub drain: CodeMap,
    pub enzyme_reaction: CodeMap,
    /// Drains first, then enzyme-reaction pairs, each in declaration order.
    pub edge: CodeMap,
    pub experiment: CodeMap,
    pub competitive_inhibition: CodeMap,
    pub allostery: CodeMap,
    pub phosphorylation: CodeMap,
}

impl ModelCodes {
    /// Codifies every entity kind of a validated model.
    ///
    /// # Arguments
    ///
    /// * `model` - The validated entity graph
    ///
    /// # Returns
    ///
    /// Returns the code spaces, or an [`EncodingError`] if the model violates uniqueness,
    /// which validation should have ruled out.
    pub fn codify(model: &KineticModel) -> Result<Self, EncodingError> {
        let drain_ids = model.drains().map(|r| r.id.clone()).collect::<Vec<_>>();
        let enzyme_reaction_ids = model
            .enzyme_reactions()
            .iter()
            .map(|er| er.id())
            .collect::<Vec<_>>();

        let codes = Self {
            metabolite: CodeMap::new("metabolite", model.metabolites().iter().map(|m| &m.id).cloned())?,
            compartment: CodeMap::new(
                "compartment",
                model.compartments().iter().map(|c| &c.id).cloned(),
            )?,
            mic: CodeMap::new("mic", model.mics().iter().map(|m| m.id()))?,
            balanced_mic: CodeMap::new(
                "balanced_mic",
                model.mics().iter().filter(|m| m.balanced).map(|m| m.id()),
            )?,
            unbalanced_mic: CodeMap::new(
                "unbalanced_mic",
                model.mics().iter().filter(|m| !m.balanced).map(|m| m.id()),
            )?,
            enzyme: CodeMap::new("enzyme", model.enzymes().iter().map(|e| &e.id).cloned())?,
            reaction: CodeMap::new("reaction", model.reactions().iter().map(|r| &r.id).cloned())?,
            drain: CodeMap::new("drain", drain_ids.iter().cloned())?,
            enzyme_reaction: CodeMap::new("enzyme_reaction", enzyme_reaction_ids.iter().cloned())?,
            edge: CodeMap::new("edge", drain_ids.into_iter().chain(enzyme_reaction_ids))?,
            experiment: CodeMap::new(
                "experiment",
                model.experiments().iter().map(|e| &e.id).cloned(),
            )?,
            competitive_inhibition: CodeMap::new(
                "competitive_inhibition",
                model.competitive_inhibitions().iter().map(|ci| ci.id()),
            )?,
            allostery: CodeMap::new("allostery", model.allosteries().iter().map(|a| a.id()))?,
            phosphorylation: CodeMap::new(
                "phosphorylation",
                model.phosphorylations().iter().map(|p| p.id()),
            )?,
        };

        log::debug!(
            "Codified {} mics, {} edges ({} drains), {} enzymes, {} experiments",
            codes.mic.len(),
            codes.edge.len(),
            codes.drain.len(),
            codes.enzyme.len(),
            codes.experiment.len()
        );

        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_dense_and_ordered() {
        let map = CodeMap::new("metabolite", ["b", "a", "c"]).unwrap();

        assert_eq!(map.code("b").unwrap(), 1);
        assert_eq!(map.code("a").unwrap(), 2);
        assert_eq!(map.code("c").unwrap(), 3);
        assert_eq!(map.len(), 3);

        for (code, id) in map.iter() {
            assert_eq!(map.decode(code), Some(id));
            assert_eq!(map.code(id).unwrap(), code);
        }
    }

    #[test]
    fn test_decode_out_of_range() {
        let map = CodeMap::new("enzyme", ["e1"]).unwrap();
        assert_eq!(map.decode(0), None);
        assert_eq!(map.decode(2), None);
        assert!(matches!(
            map.try_decode(2),
            Err(EncodingError::UnknownCode { code: 2, size: 1, .. })
        ));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let result = CodeMap::new("reaction", ["r1", "r2", "r1"]);
        assert_eq!(
            result,
            Err(EncodingError::DuplicateId {
                space: "reaction".to_string(),
                id: "r1".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_id() {
        let map = CodeMap::new("mic", ["a_c"]).unwrap();
        let err = map.code("b_c").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Identifier 'b_c' has no code in the 'mic' code space"
        );
    }

    #[test]
    fn test_first_appearance_skips_repeats() {
        let map = CodeMap::first_appearance("km", ["e1_a_c", "e1_b_c", "e1_a_c", "e2_a_c"]);
        assert_eq!(map.ids(), &["e1_a_c", "e1_b_c", "e2_a_c"]);
        assert_eq!(map.code("e2_a_c").unwrap(), 3);
    }

    #[test]
    fn test_codification_is_deterministic() {
        let ids = (0..50).map(|i| format!("m{i}")).collect::<Vec<_>>();
        let first = CodeMap::new("metabolite", ids.clone()).unwrap();
        let second = CodeMap::new("metabolite", ids).unwrap();
        assert_eq!(first, second);
    }
}
