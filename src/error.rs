//! Compiler Error Module
//!
//! Errors are grouped by where they originate:
//!
//! - [`crate::loader::LoadError`]: structural problems in the input (duplicate ids,
//!   dangling references, invalid stoichiometry). Always fatal.
//! - [`crate::priors::error::PriorError`]: invalid or incomplete prior specifications.
//! - [`EncodingError`]: inconsistencies between compiler stages, such as a code looked up
//!   for an id its code space does not contain. These indicate a bug, not bad input.
//! - [`crate::io::IOError`]: reading input or writing artifacts.
//!
//! [`CompileError`] aggregates all of them for the end-to-end pipeline.

use thiserror::Error;

use crate::{io::IOError, loader::LoadError, priors::error::PriorError};

/// Internal inconsistency between two compiler stages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("Identifier '{id}' has no code in the '{space}' code space")]
    UnknownId { space: String, id: String },
    #[error("Code {code} is outside the '{space}' code space of size {size}")]
    UnknownCode {
        space: String,
        code: usize,
        size: usize,
    },
    #[error("Identifier '{id}' occurs twice in the '{space}' code space")]
    DuplicateId { space: String, id: String },
    #[error("Ragged group {group} with bounds ({start}, {end}) exceeds the flat array of length {len}")]
    BoundsOutOfRange {
        group: usize,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("Ragged bounds are not contiguous at group {group}: expected start {expected}, found {found}")]
    NonContiguousBounds {
        group: usize,
        expected: usize,
        found: usize,
    },
    #[error("Expression for edge {edge} references '{name}' before it is defined")]
    UndefinedAuxiliary { edge: usize, name: String },
}

/// Any failure of the end-to-end compilation.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Prior specification error: {0}")]
    Prior(#[from] PriorError),
    #[error("Internal encoding error: {0}")]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    IO(#[from] IOError),
}
