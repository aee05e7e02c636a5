use std::fmt;

use hstats::Hstats;
use log::{debug, trace};
use roaring::RoaringBitmap;

use crate::itertools::merge_dedup;
use crate::models::docset::DocSet;
use crate::models::error::Result;
use crate::models::snapshot::Snapshot;
use crate::models::term_cursor::SeekStatus;

/// What one join computation went through.
/// [`Display`] is implemented for quick convenient output.
#[derive(Debug, Clone)]
pub struct JoinStats {
    from_terms: usize,
    intersecting_terms: usize,
    direct_scans: usize,
    cached_lookups: usize,
    to_terms: usize,
    bitset_mode: bool,
    result_size: usize,
    to_term_sizes: Hstats<f64>,
}

impl Default for JoinStats {
    fn default() -> Self {
        Self {
            from_terms: 0,
            intersecting_terms: 0,
            direct_scans: 0,
            cached_lookups: 0,
            to_terms: 0,
            bitset_mode: false,
            result_size: 0,
            to_term_sizes: Hstats::new(0.0, 1024.0, 32),
        }
    }
}

impl JoinStats {
    /// From-field terms visited.
    pub fn from_terms(&self) -> usize {
        self.from_terms
    }

    /// From-field terms sharing documents with the sub-query.
    pub fn intersecting_terms(&self) -> usize {
        self.intersecting_terms
    }

    /// Postings scanned directly, on either side.
    pub fn direct_scans(&self) -> usize {
        self.direct_scans
    }

    /// Per-term DocSets used for intersection tests.
    pub fn cached_lookups(&self) -> usize {
        self.cached_lookups
    }

    /// To-field terms accumulated into the result.
    pub fn to_terms(&self) -> usize {
        self.to_terms
    }

    /// Did the accumulation switch to a bitset?
    pub fn bitset_mode(&self) -> bool {
        self.bitset_mode
    }

    pub fn result_size(&self) -> usize {
        self.result_size
    }

    /// Sizes of the to-term DocSets accumulated.
    pub fn to_term_sizes(&self) -> &Hstats<f64> {
        &self.to_term_sizes
    }
}

impl fmt::Display for JoinStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "From terms={} (intersecting={})
Direct scans={} Cached lookups={}
To terms={} Bitset={} Result size={}
To term sizes:
{}",
            self.from_terms,
            self.intersecting_terms,
            self.direct_scans,
            self.cached_lookups,
            self.to_terms,
            self.bitset_mode,
            self.result_size,
            self.to_term_sizes,
        )
    }
}

/// The live documents having, in `to_field`, a term that one of the
/// documents of `from_set` has in `from_field`.
///
/// Rare terms are scanned directly, frequent ones go through the
/// snapshot's term cache. The result grows as a list of small sorted
/// sets until it gets large enough to be worth a bitset.
pub(crate) fn join_doc_set(
    snapshot: &Snapshot,
    from_field: &str,
    to_field: &str,
    from_set: &DocSet,
) -> Result<(DocSet, JoinStats)> {
    let config = snapshot.config();
    let max_doc = snapshot.max_doc();
    let min_doc_freq = config.min_doc_freq(max_doc);
    let max_sorted_size = config.max_sorted_size(max_doc) as usize;
    let mut stats = JoinStats::default();

    let (Some(mut from_terms), Some(mut to_terms)) = (
        snapshot.term_cursor(from_field, min_doc_freq),
        snapshot.term_cursor(to_field, min_doc_freq),
    ) else {
        return Ok((DocSet::empty(), stats));
    };

    // Random access into the sub-query's matches.
    let fast_membership = match from_set {
        DocSet::Sorted(_) if min_doc_freq > 0 => from_set.to_hash(),
        _ => from_set.clone(),
    };

    let prefix = snapshot
        .schema()
        .field_type(from_field)
        .and_then(|ft| ft.main_value_prefix());
    match prefix {
        Some(p) => {
            from_terms.seek_ceil(p);
        }
        None => {
            from_terms.next_term();
        }
    }

    let mut result_list: Vec<DocSet> = vec![];
    let mut result_list_docs: usize = 0;
    let mut result_bits: Option<RoaringBitmap> = None;

    while let Some(term) = from_terms.current_term() {
        if prefix.is_some_and(|p| !term.starts_with(p)) {
            break;
        }
        stats.from_terms += 1;

        let intersects = if from_terms.doc_freq() < min_doc_freq {
            stats.direct_scans += 1;
            // Deleted documents are never in from_set.
            !from_terms.scan_postings(false, |d| !fast_membership.exists(d))
        } else {
            stats.cached_lookups += 1;
            from_set.intersects(&from_terms.doc_set()?)
        };

        if intersects {
            stats.intersecting_terms += 1;
            match to_terms.seek_ceil(&term) {
                // No further from-term can be in the to-dictionary.
                SeekStatus::End => break,
                SeekStatus::NotFound => {}
                SeekStatus::Found => {
                    stats.to_terms += 1;
                    let df = to_terms.doc_freq();
                    if result_bits.is_none()
                        && df as usize + result_list_docs > max_sorted_size
                        && !result_list.is_empty()
                    {
                        trace!(
                            "Join {}->{} switches to a bitset after {} documents",
                            from_field,
                            to_field,
                            result_list_docs
                        );
                        result_bits = Some(RoaringBitmap::new());
                    }

                    let direct = result_bits.is_some() && df < min_doc_freq;
                    if direct {
                        stats.direct_scans += 1;
                        if let Some(bits) = result_bits.as_mut() {
                            let mut n = 0;
                            to_terms.scan_postings(true, |d| {
                                bits.insert(d);
                                n += 1;
                                true
                            });
                            result_list_docs += n;
                            stats.to_term_sizes.add(n as f64);
                        }
                    } else {
                        let to_set = to_terms.doc_set()?;
                        result_list_docs += to_set.size();
                        stats.to_term_sizes.add(to_set.size() as f64);
                        if let Some(bits) = result_bits.as_mut() {
                            to_set.union_into(bits);
                        } else if let DocSet::Bits(bits) = &to_set {
                            trace!(
                                "Join {}->{} starts from the bitset of a to-term",
                                from_field,
                                to_field
                            );
                            result_bits = Some(bits.as_ref().clone());
                        } else {
                            result_list.push(to_set);
                        }
                    }
                }
            }
        }

        from_terms.next_term();
    }

    stats.bitset_mode = result_bits.is_some();
    let result = match result_bits {
        Some(mut bits) => {
            for set in result_list.iter() {
                set.union_into(&mut bits);
            }
            DocSet::from_bits(bits)
        }
        None if result_list.len() <= 1 => result_list.pop().unwrap_or_default(),
        None => DocSet::from_sorted(merge_dedup(result_list.iter().map(|s| s.iter())).collect()),
    };

    // Cached sets already exclude deletions. This makes sure every path does.
    let result = result.without(snapshot.deleted_docs());
    stats.result_size = result.size();
    debug!(
        "Join {}->{} from {} documents: {} terms visited, {} intersecting, {} direct scans, {} results",
        from_field,
        to_field,
        from_set.size(),
        stats.from_terms,
        stats.intersecting_terms,
        stats.direct_scans,
        stats.result_size
    );
    Ok((result, stats))
}
