use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    /// The builder is sealed or already holds `capacity` records.
    #[error("batch cannot accept more records (capacity {capacity}, sealed: {sealed})")]
    CapacityExceeded { capacity: usize, sealed: bool },

    #[error("illegal batch state: {0}")]
    IllegalState(&'static str),
}
