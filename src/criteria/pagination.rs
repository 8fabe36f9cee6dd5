/// Classification of the active range window, consumed by external paging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeMode {
    #[default]
    None,
    /// Row window
    Scope,
    /// Page window
    Page,
}

/// Pagination window of a criteria node.
///
/// Only one window can be active: setting a row window replaces a page window and
/// the other way round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Range {
    #[default]
    Unbounded,
    /// Rows `start..end`, zero-based, end exclusive
    Rows { start: u64, end: u64 },
    /// Pages `start..=end` of `size` rows, one-based
    Pages { start: u64, end: u64, size: u64 },
}

impl Range {
    pub fn rows(start: u64, end: u64) -> Self {
        Range::Rows { start, end }
    }

    /// Page numbers below 1 are treated as page 1; an end before the start
    /// collapses to a single page.
    pub fn pages(start: u64, end: u64, size: u64) -> Self {
        let start = start.max(1);
        Range::Pages {
            start,
            end: end.max(start),
            size,
        }
    }

    pub fn mode(&self) -> RangeMode {
        match self {
            Range::Unbounded => RangeMode::None,
            Range::Rows { .. } => RangeMode::Scope,
            Range::Pages { .. } => RangeMode::Page,
        }
    }

    pub fn limit(&self) -> Option<u64> {
        match *self {
            Range::Unbounded => None,
            Range::Rows { start, end } => Some(end.saturating_sub(start)),
            Range::Pages { start, end, size } => {
                Some(end.saturating_sub(start).saturating_add(1).saturating_mul(size))
            }
        }
    }

    pub fn offset(&self) -> Option<u64> {
        match *self {
            Range::Unbounded => None,
            Range::Rows { start, .. } => Some(start),
            Range::Pages { start, size, .. } => Some(start.saturating_sub(1).saturating_mul(size)),
        }
    }

    /// Convert to SQL string
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(limit) = self.limit() {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        if let Some(offset) = self.offset() {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        sql
    }

    // Paging helpers for callers that run the count statement and page through results.

    /// Calculate total pages given a total count
    pub fn total_pages(&self, total_count: u64) -> u64 {
        match self.page_size() {
            Some(size) if size > 0 => total_count.div_ceil(size),
            _ => 1,
        }
    }

    /// Get current page number (1-indexed)
    pub fn current_page(&self) -> u64 {
        match *self {
            Range::Pages { start, .. } => start,
            Range::Rows { start, end } if end > start => (start / (end - start)).saturating_add(1),
            _ => 1,
        }
    }

    /// Check if there's a next page
    pub fn has_next_page(&self, total_count: u64) -> bool {
        match (self.limit(), self.offset()) {
            (Some(limit), Some(offset)) => offset.saturating_add(limit) < total_count,
            _ => false,
        }
    }

    /// Check if there's a previous page
    pub fn has_previous_page(&self) -> bool {
        self.offset().is_some_and(|offset| offset > 0)
    }

    fn page_size(&self) -> Option<u64> {
        match *self {
            Range::Pages { size, .. } => Some(size),
            Range::Rows { .. } => self.limit(),
            Range::Unbounded => None,
        }
    }
}
