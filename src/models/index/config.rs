/// Tuning knobs of an index and of the joins executed against it.
///
/// None of these change query results. They only decide which
/// representation and which code path are used.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexConfig {
    pub(crate) min_doc_freq_floor: u32,
    pub(crate) min_doc_freq_shift: u32,
    pub(crate) max_sorted_floor: u32,
    pub(crate) max_sorted_shift: u32,
    pub(crate) small_set_shift: u32,
    pub(crate) read_batch_size: usize,
    pub(crate) term_cache_capacity: usize,
    pub(crate) query_cache_capacity: usize,
    pub(crate) max_prefix_expansions: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            min_doc_freq_floor: 5,
            min_doc_freq_shift: 13,
            max_sorted_floor: 10,
            max_sorted_shift: 10,
            small_set_shift: 6,
            read_batch_size: 64,
            term_cache_capacity: 4096,
            query_cache_capacity: 512,
            max_prefix_expansions: 1024,
        }
    }
}

impl IndexConfig {
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }

    /// The document frequency from which a term's DocSet
    /// goes through the term cache during a join.
    ///
    /// The default is `max(5, max_doc / 8192)`
    pub fn min_doc_freq(&self, max_doc: u32) -> u32 {
        self.min_doc_freq_floor
            .max(max_doc.checked_shr(self.min_doc_freq_shift).unwrap_or(0))
    }

    /// The accumulated size from which a join stops collecting
    /// small sets and switches to a bitset.
    ///
    /// The default is `max(10, max_doc / 1024)`
    pub fn max_sorted_size(&self, max_doc: u32) -> u32 {
        self.max_sorted_floor
            .max(max_doc.checked_shr(self.max_sorted_shift).unwrap_or(0))
    }

    /// Term DocSets bigger than this are built as bitsets.
    ///
    /// The default is `max_doc / 64`
    pub fn small_set_size(&self, max_doc: u32) -> u32 {
        max_doc.checked_shr(self.small_set_shift).unwrap_or(0)
    }

    /// How many ordinals a postings read returns at most.
    pub fn read_batch_size(&self) -> usize {
        self.read_batch_size
    }

    pub fn term_cache_capacity(&self) -> usize {
        self.term_cache_capacity
    }

    pub fn query_cache_capacity(&self) -> usize {
        self.query_cache_capacity
    }

    /// The most terms a prefix query may rewrite to.
    pub fn max_prefix_expansions(&self) -> usize {
        self.max_prefix_expansions
    }
}

#[derive(Default)]
/// A builder should you want an index
/// with different parameters
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    pub fn build(self) -> IndexConfig {
        self.config
    }

    /// Sets the lower bound of the cached term document frequency.
    ///
    /// Example:
    /// ```
    /// use joinery::prelude::*;
    ///
    /// let c = IndexConfig::builder().min_doc_freq_floor(2).build();
    /// assert_eq!(c.min_doc_freq(100), 2);
    /// ```
    pub fn min_doc_freq_floor(mut self, floor: u32) -> Self {
        self.config.min_doc_freq_floor = floor;
        self
    }

    /// Sets the shift applied to max_doc to get the cached
    /// term document frequency.
    pub fn min_doc_freq_shift(mut self, shift: u32) -> Self {
        self.config.min_doc_freq_shift = shift;
        self
    }

    /// Sets the lower bound of the sorted accumulation size.
    pub fn max_sorted_floor(mut self, floor: u32) -> Self {
        self.config.max_sorted_floor = floor;
        self
    }

    /// Sets the shift applied to max_doc to get the sorted accumulation size.
    pub fn max_sorted_shift(mut self, shift: u32) -> Self {
        self.config.max_sorted_shift = shift;
        self
    }

    pub fn small_set_shift(mut self, shift: u32) -> Self {
        self.config.small_set_shift = shift;
        self
    }

    /// Ordinals per postings read. Zero is turned into one.
    pub fn read_batch_size(mut self, size: usize) -> Self {
        self.config.read_batch_size = size.max(1);
        self
    }

    pub fn term_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.term_cache_capacity = capacity;
        self
    }

    pub fn query_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.query_cache_capacity = capacity;
        self
    }

    pub fn max_prefix_expansions(mut self, limit: usize) -> Self {
        self.config.max_prefix_expansions = limit;
        self
    }
}
