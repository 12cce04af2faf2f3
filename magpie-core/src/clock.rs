// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wall-clock timestamps for document metadata.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in whole seconds.
///
/// Timestamps are informational document metadata (created/updated fields);
/// scheduling order never depends on them.
pub fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}
