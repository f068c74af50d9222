//! Per-call options for fetch

/// Options for [`SchemaBase::fetch`](super::SchemaBase::fetch)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Target item count across all pages; `None` is unbounded
    pub limit: Option<usize>,
    /// Cursor to continue from
    pub last: Option<String>,
    /// Descending key order, kept on every continuation call
    pub desc: bool,
    /// Follow cursors until `limit` is met or the collection ends.
    /// When false exactly one page is fetched.
    pub auto_paginate: bool,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn last(mut self, cursor: impl Into<String>) -> Self {
        self.last = Some(cursor.into());
        self
    }

    pub fn desc(mut self) -> Self {
        self.desc = true;
        self
    }

    pub fn auto_paginate(mut self) -> Self {
        self.auto_paginate = true;
        self
    }

    /// Whether `count` items satisfy the limit
    pub(crate) fn is_satisfied(&self, count: usize) -> bool {
        self.limit.map_or(false, |limit| count >= limit)
    }

    /// Limit for the next page after `count` items
    pub(crate) fn remaining(&self, count: usize) -> Option<usize> {
        self.limit.map(|limit| limit.saturating_sub(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let options = FetchOptions::new().limit(100).desc().auto_paginate();
        assert_eq!(options.limit, Some(100));
        assert!(options.desc);
        assert!(options.auto_paginate);
        assert_eq!(options.last, None);
        assert!(!FetchOptions::default().auto_paginate);
    }

    #[test]
    fn test_remaining() {
        let options = FetchOptions::new().limit(10);
        assert_eq!(options.remaining(4), Some(6));
        assert!(!options.is_satisfied(9));
        assert!(options.is_satisfied(10));

        let unbounded = FetchOptions::new();
        assert_eq!(unbounded.remaining(1_000_000), None);
        assert!(!unbounded.is_satisfied(usize::MAX));
    }
}
