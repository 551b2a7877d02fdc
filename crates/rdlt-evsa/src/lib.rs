//! EVSA preprocessor: simplifies an RDLT into a Level-1 view plus one
//! Level-2 subgraph per reset-bound subsystem, synthesising abstract arcs
//! whose bounds come from the expanded-reusability computation.

pub mod combine;
pub mod eru;
pub mod preprocess;

pub use combine::{combine, combine_levels, prime, split_levels, Combined};
pub use eru::{expanded_reusability, EruOutcome};
pub use preprocess::{preprocess, Level2, Preprocessed};
