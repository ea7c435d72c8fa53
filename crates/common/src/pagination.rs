//! Pagination query passed straight through to the storage layer.
//!
//! `offset` maps to SQL `OFFSET` (skip) and `limit` to `LIMIT` (take).
//! Absent values mean "no bound"; nothing is clamped or defaulted here.

use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PaginationQuery {
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
}

impl PaginationQuery {
    pub fn new(limit: Option<u64>, offset: Option<u64>) -> Self { Self { limit, offset } }

    /// `(skip, take)` in repository terms.
    pub fn skip_take(&self) -> (Option<u64>, Option<u64>) { (self.offset, self.limit) }
}

#[cfg(test)]
mod tests {
    use super::PaginationQuery;

    #[test]
    fn missing_fields_are_unbounded() {
        let q: PaginationQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q, PaginationQuery::default());
        assert_eq!(q.skip_take(), (None, None));
    }

    #[test]
    fn offset_is_skip_and_limit_is_take() {
        let q: PaginationQuery = serde_json::from_str(r#"{"limit": 2, "offset": 4}"#).unwrap();
        assert_eq!(q.skip_take(), (Some(4), Some(2)));
    }
}
