//! List options and pages for server-side paginated grids
//!
//! A grid asks for one page of rows at a time, optionally sorted by a column,
//! filtered by column equality and narrowed by a free-text search. The
//! repository layer validates column names; this module only carries them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CoreError;

/// Maximum rows per page
pub const MAX_PER_PAGE: u32 = 100;

/// Rows per page when the caller does not say
pub const DEFAULT_PER_PAGE: u32 = 25;

/// Query parameter names with a fixed meaning; every other key is a filter
const RESERVED_KEYS: [&str; 5] = ["page", "per_page", "sort", "order", "q"];

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    fn parse(value: &str) -> Result<Self, CoreError> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(CoreError::validation(format!("Invalid sort order: {}", other))),
        }
    }
}

/// Paging, sorting, filtering and search for a list query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Page number (1-indexed)
    pub page: u32,
    /// Rows per page (1..=100)
    pub per_page: u32,
    /// Column to sort by, falls back to the table default when unknown
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    /// Case-insensitive substring search across the searchable columns
    pub search: Option<String>,
    /// Column equality filters, keyed by column name
    pub filters: BTreeMap<String, String>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            sort_by: None,
            sort_order: SortOrder::Asc,
            search: None,
            filters: BTreeMap::new(),
        }
    }
}

impl ListOptions {
    /// Creates options for a page, clamping page to >= 1 and per_page to 1..=100
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            ..Default::default()
        }
    }

    pub fn sorted_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(column.into());
        self.sort_order = order;
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = if term.trim().is_empty() { None } else { Some(term.trim().to_string()) };
        self
    }

    pub fn with_filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(column.into(), value.into());
        self
    }

    /// Removes and returns a filter, used by repositories that treat some
    /// keys (such as `tag_id`) as joins rather than column equality
    pub fn take_filter(&mut self, column: &str) -> Option<String> {
        self.filters.remove(column)
    }

    /// SQL OFFSET
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// SQL LIMIT
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    /// Builds options from raw query-string pairs.
    ///
    /// `page`, `per_page`, `sort`, `order` and `q` are interpreted; all
    /// other keys become equality filters.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = ListOptions::default();
        let mut page = 1u32;
        let mut per_page = DEFAULT_PER_PAGE;

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "page" => {
                    page = value
                        .parse()
                        .map_err(|_| CoreError::validation(format!("Invalid page: {}", value)))?;
                }
                "per_page" => {
                    per_page = value
                        .parse()
                        .map_err(|_| CoreError::validation(format!("Invalid per_page: {}", value)))?;
                }
                "sort" if !value.is_empty() => options.sort_by = Some(value.to_string()),
                "order" => options.sort_order = SortOrder::parse(value)?,
                "q" => options = options.with_search(value),
                _ if RESERVED_KEYS.contains(&key) => {}
                _ => {
                    options.filters.insert(key.to_string(), value.to_string());
                }
            }
        }

        options.page = page.max(1);
        options.per_page = per_page.clamp(1, MAX_PER_PAGE);
        Ok(options)
    }
}

/// One page of a list result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total rows across all pages
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, options: &ListOptions) -> Self {
        Self {
            items,
            total,
            page: options.page,
            per_page: options.per_page,
        }
    }

    /// Total number of pages, never less than one
    pub fn total_pages(&self) -> u32 {
        if self.total <= 0 {
            return 1;
        }
        let per_page = self.per_page.max(1) as i64;
        (((self.total + per_page - 1) / per_page) as u32).max(1)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Converts the items while keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}
