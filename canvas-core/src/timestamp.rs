// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unix timestamps in seconds.
use std::time::{SystemTime, UNIX_EPOCH};

pub type Timestamp = u64;

/// Current system time as unix timestamp.
///
/// Falls back to zero when the system clock is set before the unix epoch.
pub fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}
