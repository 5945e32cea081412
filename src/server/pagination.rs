//! Page-number pagination for list endpoints.

use chorelog_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;

const MIN_VALUE: &str = "Ensure this value is greater than or equal to 1.";

/// Raw `?page=&page_size=` query parameters.
///
/// Kept as strings so malformed numbers become field errors rather than
/// extractor rejections.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    /// Validate query parameters; oversized `page_size` is clamped.
    pub fn from_query(query: &PageQuery, config: &PaginationConfig) -> Result<Self> {
        let mut errors = chorelog_common::FieldErrors::new();

        let page = parse_positive(query.page.as_deref(), "page", &mut errors).unwrap_or(1);
        let page_size = parse_positive(query.page_size.as_deref(), "page_size", &mut errors)
            .unwrap_or(config.default_page_size)
            .min(config.max_page_size);

        errors.into_result()?;
        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    /// Check the page exists for `count` total items.
    ///
    /// The first page always exists, even for an empty collection.
    pub fn check_in_range(&self, count: i64) -> Result<()> {
        if self.page == 1 || self.offset() < count {
            Ok(())
        } else {
            Err(Error::not_found(format!("page {}", self.page)))
        }
    }
}

fn parse_positive(
    value: Option<&str>,
    field: &str,
    errors: &mut chorelog_common::FieldErrors,
) -> Option<u32> {
    let value = value?.trim();
    match value.parse::<i64>() {
        Ok(n) if n >= 1 => Some(u32::try_from(n).unwrap_or(u32::MAX)),
        Ok(_) => {
            errors.add(field, MIN_VALUE);
            None
        }
        Err(_) => {
            errors.add(field, "A valid integer is required.");
            None
        }
    }
}

/// One page of a listing.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<u32>,
    pub previous: Option<u32>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(request: PageRequest, count: i64, results: Vec<T>) -> Self {
        let shown = request.offset() + results.len() as i64;
        Self {
            count,
            next: (shown < count).then(|| request.page + 1),
            previous: (request.page > 1).then(|| request.page - 1),
            results,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}
