//! Element ordering
//!
//! The comparator is a type parameter of the set rather than a runtime value.
//! Every comparison the set makes (in-memory ordering, subset bounds, bounded
//! file reads, verification, persisted `contains`) goes through the same
//! `Comparator` implementation.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

/// Total order over elements of type `E`.
pub trait Comparator<E>: 'static {
    /// Compare two elements.
    fn compare(a: &E, b: &E) -> Ordering;

    /// Comparator equality.
    fn equal(a: &E, b: &E) -> bool {
        Self::compare(a, b) == Ordering::Equal
    }
}

/// Natural ordering via `Ord`. Used when no comparator is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct Natural;

impl<E: Ord> Comparator<E> for Natural {
    fn compare(a: &E, b: &E) -> Ordering {
        a.cmp(b)
    }
}

/// Reverses another comparator.
pub struct Reversed<C = Natural>(PhantomData<fn() -> C>);

impl<E, C: Comparator<E>> Comparator<E> for Reversed<C> {
    fn compare(a: &E, b: &E) -> Ordering {
        C::compare(b, a)
    }
}

/// Orders `None` before every present value, then by `C`.
///
/// A set of `Option<E>` under this comparator can hold a logical null
/// element; absence of a value is still reported through `Option`/`Result`
/// at the API boundary.
pub struct NullsFirst<C = Natural>(PhantomData<fn() -> C>);

impl<E, C: Comparator<E>> Comparator<Option<E>> for NullsFirst<C> {
    fn compare(a: &Option<E>, b: &Option<E>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => C::compare(a, b),
        }
    }
}

/// An element ordered by `C` so it can live in a `BTreeSet`.
pub(crate) struct Keyed<E, C> {
    element: E,
    order: PhantomData<fn() -> C>,
}

impl<E, C> Keyed<E, C> {
    pub(crate) fn new(element: E) -> Self {
        Self {
            element,
            order: PhantomData,
        }
    }

    pub(crate) fn get(&self) -> &E {
        &self.element
    }
}

impl<E: Clone, C> Clone for Keyed<E, C> {
    fn clone(&self) -> Self {
        Self::new(self.element.clone())
    }
}

impl<E: fmt::Debug, C> fmt::Debug for Keyed<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.element.fmt(f)
    }
}

impl<E, C: Comparator<E>> PartialEq for Keyed<E, C> {
    fn eq(&self, other: &Self) -> bool {
        C::equal(&self.element, &other.element)
    }
}

impl<E, C: Comparator<E>> Eq for Keyed<E, C> {}

impl<E, C: Comparator<E>> PartialOrd for Keyed<E, C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E, C: Comparator<E>> Ord for Keyed<E, C> {
    fn cmp(&self, other: &Self) -> Ordering {
        C::compare(&self.element, &other.element)
    }
}

/// Half-open key range: `start` inclusive, `end` exclusive, `None` unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange<E> {
    /// Inclusive lower bound
    pub start: Option<E>,
    /// Exclusive upper bound
    pub end: Option<E>,
}

impl<E> Default for KeyRange<E> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<E> KeyRange<E> {
    /// A range with no bounds.
    pub fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// A range with the given bounds.
    pub fn new(start: Option<E>, end: Option<E>) -> Self {
        Self { start, end }
    }

    /// Returns whether neither side is bounded.
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Returns whether `element` falls inside the range.
    pub fn contains<C: Comparator<E>>(&self, element: &E) -> bool {
        let above_start = self
            .start
            .as_ref()
            .map_or(true, |s| C::compare(element, s) != Ordering::Less);
        let below_end = self
            .end
            .as_ref()
            .map_or(true, |e| C::compare(element, e) == Ordering::Less);
        above_start && below_end
    }
}

impl<E: Clone> KeyRange<E> {
    /// Intersect with `[from, to)`, keeping the tighter bound on each side.
    ///
    /// Never widens the range.
    pub fn narrow<C: Comparator<E>>(&self, from: Option<&E>, to: Option<&E>) -> Self {
        let start = match (self.start.as_ref(), from) {
            (None, None) => None,
            (Some(s), None) => Some(s.clone()),
            (None, Some(f)) => Some(f.clone()),
            (Some(s), Some(f)) => {
                if C::compare(s, f) == Ordering::Greater {
                    Some(s.clone())
                } else {
                    Some(f.clone())
                }
            }
        };
        let end = match (self.end.as_ref(), to) {
            (None, None) => None,
            (Some(e), None) => Some(e.clone()),
            (None, Some(t)) => Some(t.clone()),
            (Some(e), Some(t)) => {
                if C::compare(e, t) == Ordering::Less {
                    Some(e.clone())
                } else {
                    Some(t.clone())
                }
            }
        };
        Self { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_natural_and_reversed() {
        assert_eq!(<Natural as Comparator<i32>>::compare(&1, &2), Ordering::Less);
        assert_eq!(<Reversed as Comparator<i32>>::compare(&1, &2), Ordering::Greater);
        assert!(<Natural as Comparator<i32>>::equal(&7, &7));
    }

    #[test]
    fn test_nulls_first() {
        type Nf = NullsFirst<Reversed>;
        assert_eq!(<Nf as Comparator<Option<i32>>>::compare(&None, &Some(1)), Ordering::Less);
        assert_eq!(
            <Nf as Comparator<Option<i32>>>::compare(&Some(1), &Some(2)),
            Ordering::Greater
        );
        assert!(<Nf as Comparator<Option<i32>>>::equal(&None, &None));
    }

    #[test]
    fn test_keyed_uses_comparator_for_dedup() {
        let mut set: BTreeSet<Keyed<i32, Reversed>> = BTreeSet::new();
        for x in [1, 3, 2, 3] {
            set.insert(Keyed::new(x));
        }
        let ordered: Vec<i32> = set.iter().map(|k| *k.get()).collect();
        assert_eq!(ordered, vec![3, 2, 1]);
    }

    #[test]
    fn test_narrow_takes_tighter_bounds() {
        let range = KeyRange::new(Some(10), Some(50));

        let narrowed = range.narrow::<Natural>(Some(&5), Some(&60));
        assert_eq!(narrowed, KeyRange::new(Some(10), Some(50)));

        let narrowed = range.narrow::<Natural>(Some(&20), Some(&30));
        assert_eq!(narrowed, KeyRange::new(Some(20), Some(30)));

        let narrowed = range.narrow::<Natural>(None, Some(&40));
        assert_eq!(narrowed, KeyRange::new(Some(10), Some(40)));
    }

    #[test]
    fn test_narrow_unbounded() {
        let range: KeyRange<i32> = KeyRange::unbounded();
        assert!(range.is_unbounded());
        let narrowed = range.narrow::<Natural>(Some(&3), None);
        assert_eq!(narrowed, KeyRange::new(Some(3), None));
        assert!(!narrowed.is_unbounded());
    }

    #[test]
    fn test_contains_is_half_open() {
        let range = KeyRange::new(Some(2), Some(5));
        assert!(!range.contains::<Natural>(&1));
        assert!(range.contains::<Natural>(&2));
        assert!(range.contains::<Natural>(&4));
        assert!(!range.contains::<Natural>(&5));
    }
}
