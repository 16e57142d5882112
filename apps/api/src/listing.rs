//! Query-string helpers shared by the list endpoints. Filtering happens in memory
//! over rows the store has already scoped to the caller.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Orders rows by creation time; ties keep their incoming order.
pub fn sort_by_created<T>(
    rows: &mut [T],
    direction: SortDirection,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) {
    match direction {
        SortDirection::Asc => rows.sort_by_key(|row| created_at(row)),
        SortDirection::Desc => rows.sort_by_key(|row| std::cmp::Reverse(created_at(row))),
    }
}

/// A lowercased search term, or `None` when the term is blank.
pub fn search_term(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// True if any of `fields` contains `term` (already lowercased), ignoring case.
pub fn matches_any<'a>(term: &str, fields: impl IntoIterator<Item = Option<&'a str>>) -> bool {
    fields
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(term))
}
