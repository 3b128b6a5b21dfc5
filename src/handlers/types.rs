//! # Common API Types
//!
//! Shared response wrappers and pagination parameters.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, validation_error};

pub const DEFAULT_PAGE_LIMIT: u64 = 20;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Generic page of results for list endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
    /// Items on the current page
    pub items: Vec<T>,
    /// Number of items matching the query across all pages
    pub total: u64,
    /// 1-based page number
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        Self {
            items,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit.max(1)),
        }
    }
}

/// Page/limit query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
pub struct PageParams {
    /// 1-based page number (default: 1)
    pub page: Option<u64>,
    /// Page size (default: 20, max: 100)
    pub limit: Option<u64>,
}

impl PageParams {
    /// Resolves defaults and rejects out-of-range values.
    pub fn resolve(&self) -> Result<(u64, u64), ApiError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(validation_error(
                "Invalid page",
                serde_json::json!({ "page": "Must be at least 1" }),
            ));
        }

        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(validation_error(
                "Invalid limit",
                serde_json::json!({ "limit": format!("Must be between 1 and {MAX_PAGE_LIMIT}") }),
            ));
        }

        Ok((page, limit))
    }
}
