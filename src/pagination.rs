use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// PageQuery
///
/// Raw list-query parameters exactly as the client sent them. Numbers are kept as text so a
/// non-numeric value is reported as `InvalidPagination` instead of a generic extractor rejection.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number (default 1).
    pub page: Option<String>,
    /// Rows per page (default 10).
    pub page_size: Option<String>,
    /// Case-insensitive substring filter.
    pub search: Option<String>,
}

/// Window
///
/// The normalized (page, page_size, search) triple bounding a list query.
/// `page >= 1` and `page_size >= 1` hold by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    page: u32,
    page_size: u32,
    search: Option<String>,
}

impl Window {
    /// normalize
    ///
    /// Absent or blank values fall back to the defaults. A supplied value that is not a
    /// positive integer is rejected rather than reinterpreted.
    pub fn normalize(
        raw_page: Option<&str>,
        raw_page_size: Option<&str>,
        raw_search: Option<&str>,
    ) -> Result<Self, AppError> {
        let page = parse_positive("page", raw_page)?.unwrap_or(DEFAULT_PAGE);
        let page_size = parse_positive("page_size", raw_page_size)?.unwrap_or(DEFAULT_PAGE_SIZE);
        let search = raw_search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        Ok(Self {
            page,
            page_size,
            search,
        })
    }

    pub fn from_query(query: &PageQuery) -> Result<Self, AppError> {
        Self::normalize(
            query.page.as_deref(),
            query.page_size.as_deref(),
            query.search.as_deref(),
        )
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Trimmed, lower-cased search term; `None` when no filter applies.
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }

    /// computeResult: metadata for a list response given the total matching row count.
    pub fn page_info(&self, total_count: u64) -> PageInfo {
        let total_pages = total_count.div_ceil(u64::from(self.page_size));
        PageInfo {
            page: self.page,
            page_size: self.page_size,
            count: total_count,
            total_pages,
            more_records: u64::from(self.page) < total_pages,
        }
    }
}

impl Default for Window {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            search: None,
        }
    }
}

fn parse_positive(field: &str, raw: Option<&str>) -> Result<Option<u32>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<u32>() {
        Ok(value) if value >= 1 => Ok(Some(value)),
        _ => Err(AppError::InvalidPagination(format!(
            "{field} must be a positive integer, got {raw:?}"
        ))),
    }
}

/// Case-insensitive "contains" test used by stores that filter in process.
/// `needle` is expected to be already lower-cased (see `Window::search`).
pub fn matches_search(needle: &str, haystack: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// PageInfo
///
/// Pagination metadata returned alongside every list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PageInfo {
    pub page: u32,
    pub page_size: u32,
    pub count: u64,
    pub total_pages: u64,
    pub more_records: bool,
}

/// Paginated
///
/// One page of `T` plus its metadata; shared by every resource type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub info: PageInfo,
}
