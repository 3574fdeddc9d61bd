//! Error type and small shared traits for the alchemap crates.
//!
//! [`AlchemapError`] covers parsing, substructure search and input loading;
//! [`AlchemapError::is_pair_scoped`] tells the similarity matrix which
//! failures only cost one pair. The traits let the loader and the matrix
//! treat molecules and pair scores uniformly.

pub mod error;
pub mod traits;

pub use error::{AlchemapError, Result};
pub use traits::*;
