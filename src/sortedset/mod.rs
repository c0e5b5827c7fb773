//! Spillable sorted set
//!
//! An ordered set of unique elements that can move between memory and a
//! file-backed representation without changing its observable contents.
//!
//! # Guarantees
//!
//! - A persist either fully succeeds and is verified, or leaves no file behind
//! - A failed load leaves the persisted file intact
//! - Every stream opened for a query is closed on every exit path
//! - Subset views over a persisted set never delete the shared file
//!
//! The comparator is part of the set's type (`SpillableSortedSet<E, C>`), so
//! sets ordered differently cannot be mixed up.

mod bounded;
mod errors;
mod factory;
mod handler;
mod iter;
mod order;
mod set;

pub use bounded::{open_bounded, BoundedReader};
pub use errors::{ErrorCategory, SortedSetError, SortedSetErrorCode, SortedSetResult};
pub use factory::SetFactory;
pub use handler::{
    ElementReader, ElementWriter, HandlerError, HandlerResult, ReaderScope, SharedHandler,
    TypedFileHandler, WriterScope,
};
pub use iter::{FileIter, Iter};
pub use order::{Comparator, KeyRange, Natural, NullsFirst, Reversed};
pub use set::{SpillableSortedSet, DEFAULT_VERIFY_SAMPLE};
