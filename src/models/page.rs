//! Pagination parameters and result pages.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// 1-based page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, size: 10 }
    }
}

impl PageRequest {
    /// Create a page request; both `page` and `size` must be at least 1.
    pub fn new(page: u64, size: u64) -> Result<Self> {
        if page == 0 {
            return Err(AppError::validation("page must be >= 1"));
        }
        if size == 0 {
            return Err(AppError::validation("size must be >= 1"));
        }
        Ok(Self { page, size })
    }

    /// Offset of the first hit on this page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.size)
    }

    /// Matches left after this page, never negative.
    pub fn remaining(&self, total: u64) -> u64 {
        total.saturating_sub(self.page.saturating_mul(self.size))
    }
}

/// One page of results: `{page, size, total, data, remaining}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u64,
    pub size: u64,
    pub total: u64,
    pub data: Vec<T>,
    pub remaining: u64,
}

impl<T> Page<T> {
    pub fn new(request: PageRequest, total: u64, data: Vec<T>) -> Self {
        Self {
            page: request.page,
            size: request.size,
            total,
            data,
            remaining: request.remaining(total),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
