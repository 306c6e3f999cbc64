//! Pokémon domain model: catalog entries, cached records, stats and types.

mod types;

pub use types::*;
