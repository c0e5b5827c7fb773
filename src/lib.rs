//! spillset - sorted sets that spill to verified files
//!
//! A `SpillableSortedSet` keeps its elements in memory until asked to
//! persist, then streams them to a checksummed spill file and answers
//! queries from that file until it is loaded back.
//!
//! - `sortedset`: the set, its ordering, handler capability and errors
//! - `spill`: spill file format, local and in-memory handlers, configuration
//! - `observability`: structured logging and counters
//! - `rewrite`, `geo`: hooks for the query planning collaborators
//! - `cli`: maintenance commands for spill files

pub mod cli;
pub mod geo;
pub mod observability;
pub mod rewrite;
pub mod sortedset;
pub mod spill;
