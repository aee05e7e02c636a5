use std::fmt;

use hashbrown::HashSet;
use itertools::Itertools;
use roaring::RoaringBitmap;

use crate::models::filter::DocFilter;
use crate::models::types::{DocId, OurRc};

/// The encoding of a [`DocSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Encoding {
    Sorted,
    Hash,
    Bits,
}

/// A finite set of document ordinals, valid for one snapshot.
///
/// The three encodings are interchangeable: they only differ in
/// cost, never in membership. Cloning is cheap, the ordinals are shared.
#[derive(Clone)]
pub enum DocSet {
    /// Ascending, deduplicated ordinals. Compact for small sets.
    Sorted(OurRc<[DocId]>),
    /// Unordered. Only meant for transient random access testing.
    Hash(OurRc<HashSet<DocId>>),
    /// One bit per ordinal. Cheap unions and membership for large sets.
    Bits(OurRc<RoaringBitmap>),
}

impl Default for DocSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl DocSet {
    /// The empty set.
    pub fn empty() -> Self {
        DocSet::Sorted(OurRc::from(Vec::new()))
    }

    /// A sorted set from ordinals in any order, possibly repeated.
    pub fn from_unsorted(mut docs: Vec<DocId>) -> Self {
        docs.sort_unstable();
        docs.dedup();
        DocSet::Sorted(docs.into())
    }

    /// A sorted set from ordinals the caller guarantees ascending and unique.
    pub(crate) fn from_sorted(docs: Vec<DocId>) -> Self {
        debug_assert!(docs.windows(2).all(|w| w[0] < w[1]));
        DocSet::Sorted(docs.into())
    }

    pub fn from_bits(bits: RoaringBitmap) -> Self {
        DocSet::Bits(OurRc::new(bits))
    }

    /// The encoding of this set.
    pub fn encoding(&self) -> Encoding {
        match self {
            DocSet::Sorted(_) => Encoding::Sorted,
            DocSet::Hash(_) => Encoding::Hash,
            DocSet::Bits(_) => Encoding::Bits,
        }
    }

    /// The exact cardinality.
    pub fn size(&self) -> usize {
        match self {
            DocSet::Sorted(docs) => docs.len(),
            DocSet::Hash(docs) => docs.len(),
            DocSet::Bits(bits) => bits.len() as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Membership test. Logarithmic on sorted sets, constant otherwise.
    pub fn exists(&self, doc: DocId) -> bool {
        match self {
            DocSet::Sorted(docs) => docs.binary_search(&doc).is_ok(),
            DocSet::Hash(docs) => docs.contains(&doc),
            DocSet::Bits(bits) => bits.contains(doc),
        }
    }

    /// Do these two sets share at least one ordinal?
    /// The intersection is never materialised.
    pub fn intersects(&self, other: &DocSet) -> bool {
        match (self, other) {
            (DocSet::Bits(a), DocSet::Bits(b)) => !a.is_disjoint(b),
            (DocSet::Sorted(a), DocSet::Sorted(b)) => sorted_intersect(a, b),
            // Walk the smaller one, probe the other.
            _ if self.size() <= other.size() => self.iter().any(|d| other.exists(d)),
            _ => other.iter().any(|d| self.exists(d)),
        }
    }

    /// Sets the bit of every ordinal of this set in the given bitset.
    pub fn union_into(&self, bits: &mut RoaringBitmap) {
        match self {
            DocSet::Bits(mine) => *bits |= mine.as_ref(),
            DocSet::Sorted(docs) => {
                bits.extend(docs.iter().copied());
            }
            DocSet::Hash(docs) => {
                bits.extend(docs.iter().copied());
            }
        }
    }

    /// A reusable filter over this set, for scoring.
    pub fn as_filter(&self) -> DocFilter {
        DocFilter::new(self)
    }

    /// Iterates over the members. Sorted and bits sets yield ascending
    /// ordinals, hash sets yield them in no particular order.
    pub fn iter(&self) -> DocSetIter<'_> {
        match self {
            DocSet::Sorted(docs) => DocSetIter::Sorted(docs.iter()),
            DocSet::Hash(docs) => DocSetIter::Hash(docs.iter()),
            DocSet::Bits(bits) => DocSetIter::Bits(bits.iter()),
        }
    }

    /// The members, ascending.
    pub fn to_sorted_vec(&self) -> Vec<DocId> {
        match self {
            DocSet::Hash(docs) => docs.iter().copied().sorted_unstable().collect(),
            _ => self.iter().collect(),
        }
    }

    /// This set encoded as a sorted array.
    pub fn to_sorted(&self) -> DocSet {
        match self {
            DocSet::Sorted(_) => self.clone(),
            _ => DocSet::from_sorted(self.to_sorted_vec()),
        }
    }

    /// This set encoded as a hash set.
    pub fn to_hash(&self) -> DocSet {
        match self {
            DocSet::Hash(_) => self.clone(),
            _ => DocSet::Hash(OurRc::new(self.iter().collect())),
        }
    }

    /// This set encoded as a bitset.
    pub fn to_bits(&self) -> DocSet {
        match self {
            DocSet::Bits(_) => self.clone(),
            _ => {
                let mut bits = RoaringBitmap::new();
                self.union_into(&mut bits);
                DocSet::from_bits(bits)
            }
        }
    }

    /// This set minus the given ordinals. Returns a clone when
    /// nothing needs removing.
    pub fn without(&self, removed: &RoaringBitmap) -> DocSet {
        let overlaps = match self {
            DocSet::Bits(bits) => !bits.is_disjoint(removed),
            _ => self.iter().any(|d| removed.contains(d)),
        };
        if removed.is_empty() || !overlaps {
            return self.clone();
        }
        match self {
            DocSet::Bits(bits) => DocSet::from_bits(bits.as_ref() - removed),
            DocSet::Sorted(docs) => DocSet::from_sorted(
                docs.iter()
                    .copied()
                    .filter(|d| !removed.contains(*d))
                    .collect(),
            ),
            DocSet::Hash(docs) => DocSet::Hash(OurRc::new(
                docs.iter()
                    .copied()
                    .filter(|d| !removed.contains(*d))
                    .collect(),
            )),
        }
    }
}

fn sorted_intersect(a: &[DocId], b: &[DocId]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => return true,
        }
    }
    false
}

/// Two sets are equal when they have the same members,
/// whatever their encodings.
impl PartialEq for DocSet {
    fn eq(&self, other: &Self) -> bool {
        self.size() == other.size() && self.iter().all(|d| other.exists(d))
    }
}

impl Eq for DocSet {}

impl fmt::Debug for DocSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocSet::{}", self.encoding())?;
        f.debug_set().entries(self.to_sorted_vec()).finish()
    }
}

impl FromIterator<DocId> for DocSet {
    fn from_iter<T: IntoIterator<Item = DocId>>(iter: T) -> Self {
        DocSet::from_unsorted(iter.into_iter().collect())
    }
}

pub enum DocSetIter<'a> {
    Sorted(std::slice::Iter<'a, DocId>),
    Hash(hashbrown::hash_set::Iter<'a, DocId>),
    Bits(roaring::bitmap::Iter<'a>),
}

impl Iterator for DocSetIter<'_> {
    type Item = DocId;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            DocSetIter::Sorted(it) => it.next().copied(),
            DocSetIter::Hash(it) => it.next().copied(),
            DocSetIter::Bits(it) => it.next(),
        }
    }
}
