//! Pagination windows and page metadata
//!
//! [`Pagination`] is the resolved `LIMIT`/`OFFSET` window a list query runs
//! with. [`PaginationMetadata`] describes one page of a paginated result and is
//! always derived from the total row count and the page size.
//!
//! # Example
//!
//! ```rust
//! use repokit::repository::{Pagination, PaginationMetadata};
//!
//! let window = Pagination::page(3, 20).unwrap();
//! assert_eq!(window.offset, 40);
//! assert_eq!(window.limit, Some(20));
//!
//! let meta = PaginationMetadata::new(3, 20, 45).unwrap();
//! assert_eq!(meta.total_pages, 3);
//! ```

use serde::{Deserialize, Serialize};

use super::error::{RepositoryError, RepositoryOperation, RepositoryResult};

/// Resolved limit/offset window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    /// Maximum number of rows, `None` for unlimited
    pub limit: Option<u64>,
    /// Number of rows to skip
    pub offset: u64,
}

impl Pagination {
    /// Window that returns every row
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            limit: None,
            offset: 0,
        }
    }

    /// Window from signed arguments
    ///
    /// A negative `limit` means unlimited and a negative `offset` means no
    /// offset.
    #[must_use]
    pub fn window(limit: i64, offset: i64) -> Self {
        Self {
            limit: u64::try_from(limit).ok(),
            offset: u64::try_from(offset).unwrap_or(0),
        }
    }

    /// Window for a 1-indexed page
    ///
    /// Fails with `InvalidArgument` when `page < 1`, `per_page <= 0`, or the
    /// offset does not fit in an `i64`.
    pub fn page(page: i64, per_page: i64) -> RepositoryResult<Self> {
        let (page, per_page) = validate_page(page, per_page)?;
        let offset = (page - 1)
            .checked_mul(per_page)
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or_else(|| {
                RepositoryError::invalid_argument(
                    RepositoryOperation::Paginate,
                    format!("page {} with per_page {} overflows the offset", page, per_page),
                )
            })?;

        Ok(Self {
            limit: Some(per_page),
            offset,
        })
    }

    /// Whether this window returns every row
    pub fn is_unbounded(&self) -> bool {
        self.limit.is_none() && self.offset == 0
    }
}

/// Page descriptor returned with paginated results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMetadata {
    /// Current page, starting at 1
    pub page: u64,
    /// Page size
    pub per_page: u64,
    /// `ceil(total_items / per_page)`
    pub total_pages: u64,
    /// Rows matching the query, ignoring the window
    pub total_items: u64,
}

impl PaginationMetadata {
    /// Compute metadata for `page` of size `per_page` over `total_items` rows
    pub fn new(page: i64, per_page: i64, total_items: u64) -> RepositoryResult<Self> {
        let (page, per_page) = validate_page(page, per_page)?;
        Ok(Self {
            page,
            per_page,
            total_pages: calculate_total_pages(total_items, per_page),
            total_items,
        })
    }

    /// Whether a page follows this one
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Whether a page precedes this one
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

fn validate_page(page: i64, per_page: i64) -> RepositoryResult<(u64, u64)> {
    if page < 1 {
        return Err(RepositoryError::invalid_argument(
            RepositoryOperation::Paginate,
            format!("page must be at least 1, got {}", page),
        ));
    }
    if per_page <= 0 {
        return Err(RepositoryError::invalid_argument(
            RepositoryOperation::Paginate,
            format!("per_page must be positive, got {}", per_page),
        ));
    }
    // Both are positive here.
    Ok((page.unsigned_abs(), per_page.unsigned_abs()))
}

fn calculate_total_pages(total_items: u64, per_page: u64) -> u64 {
    total_items.div_ceil(per_page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryErrorKind;

    #[test]
    fn test_window_negative_arguments() {
        assert_eq!(Pagination::window(-1, -5), Pagination::unbounded());
        assert_eq!(
            Pagination::window(10, -5),
            Pagination {
                limit: Some(10),
                offset: 0
            }
        );
        assert_eq!(
            Pagination::window(-1, 7),
            Pagination {
                limit: None,
                offset: 7
            }
        );
    }

    #[test]
    fn test_page_offset() {
        for page in 1..=5_i64 {
            for per_page in 1..=7_i64 {
                let window = Pagination::page(page, per_page).unwrap();
                assert_eq!(window.offset, ((page - 1) * per_page) as u64);
                assert_eq!(window.limit, Some(per_page as u64));
            }
        }
    }

    #[test]
    fn test_first_page_starts_at_zero() {
        let window = Pagination::page(1, 20).unwrap();
        assert_eq!(window.offset, 0);
        assert!(!window.is_unbounded());
    }

    #[test]
    fn test_invalid_page_arguments() {
        for (page, per_page) in [(0, 10), (-3, 10), (1, 0), (1, -1)] {
            let err = Pagination::page(page, per_page).unwrap_err();
            assert_eq!(err.kind, RepositoryErrorKind::InvalidArgument);
            assert_eq!(err.operation, RepositoryOperation::Paginate);

            let err = PaginationMetadata::new(page, per_page, 10).unwrap_err();
            assert_eq!(err.kind, RepositoryErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn test_offset_overflow_is_rejected() {
        let err = Pagination::page(i64::MAX, i64::MAX).unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::InvalidArgument);
    }

    #[test]
    fn test_total_pages_is_ceiling() {
        let cases = [(0, 10, 0), (1, 10, 1), (10, 10, 1), (11, 10, 2), (45, 20, 3), (7, 1, 7)];
        for (total, per_page, expected) in cases {
            let meta = PaginationMetadata::new(1, per_page, total).unwrap();
            assert_eq!(meta.total_pages, expected, "total={} per_page={}", total, per_page);
        }
    }

    #[test]
    fn test_navigation_helpers() {
        let meta = PaginationMetadata::new(2, 10, 25).unwrap();
        assert!(meta.has_next());
        assert!(meta.has_prev());

        let last = PaginationMetadata::new(3, 10, 25).unwrap();
        assert!(!last.has_next());
    }

    #[test]
    fn test_metadata_serialization() {
        let meta = PaginationMetadata::new(2, 10, 25).unwrap();
        let json = serde_json::to_value(meta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "page": 2,
                "per_page": 10,
                "total_pages": 3,
                "total_items": 25
            })
        );
    }
}
