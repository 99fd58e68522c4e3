use serde::{Deserialize, Serialize};

use super::errors::QueryError;
use crate::store::Page;

pub const DEFAULT_LIMIT: i64 = 100;

/// Offset/limit as a caller supplies them. Validated into a [`Page`]
/// before anything touches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self { offset, limit }
    }

    /// Offset with the default limit.
    pub fn from_offset(offset: i64) -> Self {
        Self {
            offset,
            ..Self::default()
        }
    }

    pub fn validate(self) -> Result<Page, QueryError> {
        if self.offset < 0 || self.limit <= 0 {
            return Err(QueryError::InvalidPaginationParams {
                offset: self.offset,
                limit: self.limit,
            });
        }
        Ok(Page::new_unchecked(self.offset, self.limit))
    }
}
