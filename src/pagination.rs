//! Paginated Fetcher (§4.B): drives offset/page-number or cursor-based
//! pagination against the GitHub REST/GraphQL endpoints until exhausted or a
//! safety cap is hit.

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::Error;
use crate::rate_limiter::RateGovernor;

/// Hard upper bound on pages requested per logical list, independent of
/// server signaling (prevents infinite loops on a buggy or malicious
/// upstream).
pub const PAGE_CAP: usize = 100;
pub const DEFAULT_PAGE_SIZE: usize = 100;
const SERVER_DEFAULT_PAGE_SIZE: usize = 30;

/// Rate-limit and pagination headers extracted from one REST response.
#[derive(Debug, Clone, Copy)]
pub struct PageSignal {
    pub remaining: u64,
    pub limit: u64,
    pub reset_at: i64,
    pub next_page: Option<u32>,
    pub item_count: usize,
}

/// Decide whether offset-mode pagination should continue, per §4.B's
/// priority-ordered termination rules.
pub fn should_continue_offset(signal: &PageSignal) -> bool {
    if signal.next_page == Some(0) {
        return false;
    }
    if signal.item_count >= DEFAULT_PAGE_SIZE {
        return true;
    }
    if signal.item_count == SERVER_DEFAULT_PAGE_SIZE {
        return true;
    }
    if signal.item_count == 0 {
        return false;
    }
    false
}

/// Drive an offset/page-number paginated endpoint. `fetch_page(page_number)`
/// performs one request and returns the page's items plus its `PageSignal`.
pub async fn paginate_offset<T, F, Fut>(
    governor: &RateGovernor,
    cancel: &CancellationToken,
    mut fetch_page: F,
) -> Result<Vec<T>, Error>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<(Vec<T>, PageSignal), Error>>,
{
    let mut all_items = Vec::new();
    let mut page: u32 = 1;

    loop {
        governor.wait_if_needed(cancel).await?;
        let (items, signal) = fetch_page(page).await?;
        governor
            .record(signal.remaining, signal.limit, signal.reset_at)
            .await;
        let item_count = items.len();
        all_items.extend(items);

        if page as usize >= PAGE_CAP {
            warn!(page, "pagination cap reached; stopping without error");
            break;
        }
        if !should_continue_offset(&signal) {
            break;
        }
        debug_assert_eq!(item_count, signal.item_count);
        page += 1;
    }

    Ok(all_items)
}

/// Cursor-based pagination (GraphQL): stop when `has_next_page` is false.
#[derive(Debug, Clone)]
pub struct CursorSignal {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

pub async fn paginate_cursor<T, F, Fut>(
    governor: &RateGovernor,
    cancel: &CancellationToken,
    mut fetch_page: F,
) -> Result<Vec<T>, Error>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: std::future::Future<Output = Result<(Vec<T>, CursorSignal), Error>>,
{
    let mut all_items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        governor.wait_if_needed(cancel).await?;
        let (items, signal) = fetch_page(cursor.clone()).await?;
        all_items.extend(items);
        pages += 1;

        if pages >= PAGE_CAP {
            warn!(pages, "pagination cap reached; stopping without error");
            break;
        }
        if !signal.has_next_page {
            break;
        }
        cursor = signal.end_cursor;
    }

    Ok(all_items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(next_page: Option<u32>, item_count: usize) -> PageSignal {
        PageSignal {
            remaining: 5000,
            limit: 5000,
            reset_at: 0,
            next_page,
            item_count,
        }
    }

    #[test]
    fn stops_when_server_reports_no_next_page() {
        assert!(!should_continue_offset(&signal(Some(0), 100)));
    }

    #[test]
    fn continues_when_page_is_full() {
        assert!(should_continue_offset(&signal(None, DEFAULT_PAGE_SIZE)));
    }

    #[test]
    fn continues_on_server_default_page_size_signal() {
        assert!(should_continue_offset(&signal(None, SERVER_DEFAULT_PAGE_SIZE)));
    }

    #[test]
    fn stops_on_empty_page() {
        assert!(!should_continue_offset(&signal(None, 0)));
    }

    #[test]
    fn stops_on_partial_page_with_no_next_page_header() {
        assert!(!should_continue_offset(&signal(None, 17)));
    }

    #[tokio::test]
    async fn pagination_cap_bounds_pages_regardless_of_upstream_signal() {
        //* Given: an upstream that always reports a full page forever.
        let governor = RateGovernor::new();
        let cancel = CancellationToken::new();
        let mut calls = 0usize;

        //* When
        let result: Result<Vec<u32>, Error> = paginate_offset(&governor, &cancel, |_page| {
            calls += 1;
            async move {
                Ok((
                    vec![0u32; DEFAULT_PAGE_SIZE],
                    signal(None, DEFAULT_PAGE_SIZE),
                ))
            }
        })
        .await;

        //* Then
        assert!(result.is_ok());
        assert_eq!(calls, PAGE_CAP);
    }
}
