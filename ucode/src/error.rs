use thiserror::Error;

use crate::bitdef::{BitPattern, Word};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UcodeError {
    #[error("cannot compose {name}: {reason}")]
    Composition { name: String, reason: String },

    #[error("address {address} is {first_data} from '{first_source}' but {second_data} from '{second_source}'")]
    AddressConflict {
        address: Word,
        first_data: Word,
        first_source: String,
        second_data: Word,
        second_source: String,
    },

    #[error(
        "{} addresses have no data, starting with {}",
        .missing.len(),
        .missing.first().map(ToString::to_string).unwrap_or_default()
    )]
    IncompleteCoverage { missing: Vec<Word> },

    #[error("{bits} bits is not a whole number of bytes")]
    InvalidWidth { bits: usize },

    #[error("'{0}' is not a bit")]
    InvalidBit(char),

    #[error("'{source_name}' has a {actual} bit {field} but {expected} bits were expected")]
    WidthMismatch {
        source_name: String,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("'{source_name}' has unresolved data {data}")]
    UnresolvedData { source_name: String, data: BitPattern },

    #[error("{bits} address bits is too large to expand")]
    AddressSpaceTooLarge { bits: usize },

    #[error("'{source_name}' needs {steps} steps but only {max} fit")]
    TooManySteps { source_name: String, steps: usize, max: usize },

    #[error("address packing failed: {0}")]
    Packing(String),
}
