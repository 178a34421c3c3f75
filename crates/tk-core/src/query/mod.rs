//! Query pipeline: filter, then sort, then paginate
//!
//! The pipeline is a pure function of the rows and the query parameters.
//! Stage order is fixed: the page is cut from the sorted sequence, and the
//! sort only sees rows that survived the filter.

pub mod collation;

use std::cmp::Ordering;
use std::num::NonZeroUsize;
use serde::{Serialize, Deserialize};

use crate::model::{CellValue, Column, Row};
pub use collation::locale_compare;

/// Rows per page unless configured otherwise
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(n) => n,
    None => unreachable!(),
};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Active sort: a column and a direction. An empty column id or no
/// direction means the filtered order is kept as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    #[serde(default)]
    pub column_id: String,
    #[serde(default)]
    pub direction: Option<SortDirection>,
}

impl SortSpec {
    pub fn new(column_id: impl Into<String>, direction: Option<SortDirection>) -> Self {
        Self {
            column_id: column_id.into(),
            direction,
        }
    }

    pub fn unsorted() -> Self {
        Self::default()
    }

    /// The column and direction to sort by, if sorting is active
    pub fn active(&self) -> Option<(&str, SortDirection)> {
        match self.direction {
            Some(direction) if !self.column_id.is_empty() => Some((&self.column_id, direction)),
            _ => None,
        }
    }

    /// Next sort after a header click on `column_id`: the active column
    /// cycles asc, desc, unsorted; any other column starts ascending.
    pub fn cycle(&self, column_id: &str) -> SortSpec {
        if self.column_id != column_id {
            return SortSpec::new(column_id, Some(SortDirection::Asc));
        }
        match self.direction {
            None => SortSpec::new(column_id, Some(SortDirection::Asc)),
            Some(SortDirection::Asc) => SortSpec::new(column_id, Some(SortDirection::Desc)),
            Some(SortDirection::Desc) => SortSpec::unsorted(),
        }
    }
}

/// Current page and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size", alias = "rowsPerPage")]
    pub page_size: NonZeroUsize,
}

fn default_page_size() -> NonZeroUsize {
    DEFAULT_PAGE_SIZE
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: usize, page_size: NonZeroUsize) -> Self {
        Self { page, page_size }
    }

    /// Index range of this page within a sequence of `len` items,
    /// clamped to the sequence
    pub fn bounds(&self, len: usize) -> std::ops::Range<usize> {
        let start = self.page.saturating_mul(self.page_size.get()).min(len);
        let end = start.saturating_add(self.page_size.get()).min(len);
        start..end
    }

    /// Number of pages needed for `total` items
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size.get())
    }
}

/// Query parameters applied to a row set
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    pub visible_columns: &'a [&'a Column],
    pub search: &'a str,
    pub sort: &'a SortSpec,
    pub pagination: &'a Pagination,
}

/// One page of the derived view
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<'a> {
    /// Rows on the requested page
    pub page_rows: Vec<&'a Row>,
    /// Rows matching the search, before pagination
    pub total_matched: usize,
}

/// Run filter, sort and paginate over `rows`
pub fn run_query<'a>(rows: &'a [Row], query: &Query<'_>) -> QueryResult<'a> {
    let mut matched = filter_rows(rows, query.visible_columns, query.search);
    sort_rows(&mut matched, query.sort);
    let total_matched = matched.len();
    let page_rows = paginate(&matched, query.pagination).to_vec();

    tracing::trace!(
        total = rows.len(),
        matched = total_matched,
        page = query.pagination.page,
        shown = page_rows.len(),
        "query evaluated"
    );

    QueryResult {
        page_rows,
        total_matched,
    }
}

/// Keep rows where any visible column contains `search`, case-insensitively.
/// An empty search keeps every row.
pub fn filter_rows<'a>(rows: &'a [Row], visible_columns: &[&Column], search: &str) -> Vec<&'a Row> {
    if search.is_empty() {
        return rows.iter().collect();
    }
    let needle = search.to_lowercase();
    rows.iter()
        .filter(|row| {
            visible_columns.iter().any(|column| {
                row.value(&column.id)
                    .map(|value| value.render().to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
        })
        .collect()
}

/// Stable sort by the active column. Absent values go last in either
/// direction; `Desc` flips the comparison, so ties keep their order.
pub fn sort_rows(rows: &mut [&Row], sort: &SortSpec) {
    let Some((column_id, direction)) = sort.active() else {
        return;
    };
    rows.sort_by(|a, b| match (a.value(column_id), b.value(column_id)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ordering = compare_values(x, y);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    });
}

/// The contiguous slice of `rows` on the current page; empty past the end
pub fn paginate<'r, T>(rows: &'r [T], pagination: &Pagination) -> &'r [T] {
    &rows[pagination.bounds(rows.len())]
}

/// Numbers compare numerically, anything else by locale-aware text order
pub fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => locale_compare(&a.render(), &b.render()),
    }
}
