//! Offset pagination over the pending-outage list.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::oms::{OmsError, OmsGateway, OutageRecord, PageWindow, PendingFilter, Session};

#[derive(Debug, Clone)]
pub struct PagerSettings {
    /// Records requested per page. Must be positive.
    pub page_size: usize,
    /// Stop once this many records are collected; 0 means no cap.
    pub limit: usize,
    /// Fixed pause between page requests.
    pub page_delay: Duration,
}

/// Fetches pending outages page by page until the server runs out or
/// `limit` is satisfied, then truncates to exactly `limit`.
///
/// Each iteration either stops or advances the offset by one page, and the
/// walk stops once the offset passes `total_records` or a page comes back
/// empty.
pub async fn fetch_all<G: OmsGateway>(
    gateway: &G,
    session: &Session,
    filter: &PendingFilter,
    settings: &PagerSettings,
) -> Result<Vec<OutageRecord>, OmsError> {
    let page_size = settings.page_size.max(1);
    let limit = settings.limit;
    let mut all: Vec<OutageRecord> = Vec::new();
    let mut window = PageWindow {
        offset: 0,
        limit: page_size,
    };

    loop {
        let page = gateway.fetch_pending_page(session, filter, window).await?;
        let got = page.records.len();
        all.extend(page.records);
        info!(
            offset = window.offset,
            got,
            total = page.total_records,
            "fetched pending page"
        );

        let limit_reached = limit > 0 && all.len() >= limit;
        let exhausted = window.offset + page_size >= page.total_records;
        if limit_reached || exhausted || got == 0 {
            break;
        }

        window.offset += page_size;
        if !settings.page_delay.is_zero() {
            debug!(delay_ms = settings.page_delay.as_millis() as u64, "pausing between pages");
            sleep(settings.page_delay).await;
        }
    }

    if limit > 0 && all.len() > limit {
        all.truncate(limit);
    }
    Ok(all)
}
