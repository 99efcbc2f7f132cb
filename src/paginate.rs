//! Provider-agnostic pagination
//!
//! [`fetch_all`] drives a "fetch page, merge, decide continuation" loop for
//! both offset-counting and opaque-marker APIs. Any page error aborts the
//! whole listing; callers never see a truncated list in place of an error.

use crate::error::Result;
use serde::Deserialize;
use std::collections::HashSet;
use std::future::Future;

/// Upper bound on pages followed in one listing
pub const MAX_PAGES: usize = 10_000;

/// How a provider signals that more pages exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStyle {
    /// Running item count, stop at the reported total
    Offset,
    /// Opaque "next marker" echoed back on the next request
    Marker,
}

impl PageStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offset => "offset",
            Self::Marker => "marker",
        }
    }
}

/// One page as returned by a fetch function
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total item count hint (offset style)
    pub total: Option<usize>,
    /// Marker for the following page (marker style)
    pub next_marker: Option<String>,
    /// Explicit "more pages exist" flag, when the provider sends one
    pub has_more: Option<bool>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            total: None,
            next_marker: None,
            has_more: None,
        }
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.next_marker = Some(marker.into());
        self
    }

    pub fn with_more(mut self, has_more: bool) -> Self {
        self.has_more = Some(has_more);
        self
    }
}

/// Where the next page starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Number of items accumulated so far
    Offset(usize),
    /// Marker returned by the previous page
    Marker(String),
}

/// Fetch every page and return the merged items.
///
/// `fetch` performs one request for the current query; `advance` moves the
/// query forward from a [`Continuation`]. Stops on an empty page, on the
/// style's own end condition, on a repeated marker, or after [`MAX_PAGES`].
pub async fn fetch_all<Q, T, F, Fut, A>(
    style: PageStyle,
    mut query: Q,
    mut fetch: F,
    mut advance: A,
) -> Result<Vec<T>>
where
    F: FnMut(&Q) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
    A: FnMut(&mut Q, &Continuation),
{
    let mut all_items: Vec<T> = Vec::new();
    let mut seen_markers: HashSet<String> = HashSet::new();

    for page_no in 1..=MAX_PAGES {
        let page = fetch(&query).await?;
        let page_len = page.items.len();
        all_items.extend(page.items);

        if page_len == 0 {
            break;
        }

        let next = match style {
            PageStyle::Offset => {
                let accumulated = all_items.len();
                let more = match (page.total, page.has_more) {
                    (Some(total), _) => accumulated < total,
                    (None, Some(has_more)) => has_more,
                    (None, None) => false,
                };
                more.then_some(Continuation::Offset(accumulated))
            },
            PageStyle::Marker => match page.next_marker.filter(|m| !m.is_empty()) {
                Some(marker) if page.has_more != Some(false) => {
                    if !seen_markers.insert(marker.clone()) {
                        tracing::warn!(
                            "Provider repeated page marker {:?}, stopping after {} pages",
                            marker,
                            page_no
                        );
                        None
                    } else {
                        Some(Continuation::Marker(marker))
                    }
                },
                _ => None,
            },
        };

        let Some(next) = next else {
            break;
        };

        if page_no == MAX_PAGES {
            tracing::warn!("Stopped listing after {} pages", MAX_PAGES);
            break;
        }

        advance(&mut query, &next);
    }

    Ok(all_items)
}
