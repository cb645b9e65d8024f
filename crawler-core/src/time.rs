//! A single seam for wall-clock timestamps, so `CrawlResult::timestamp`
//! construction isn't scattered as raw `SystemTime` calls through the
//! pipeline.

use std::time::{SystemTime, UNIX_EPOCH};

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
