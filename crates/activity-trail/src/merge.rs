use std::cmp::Ordering;

use compliance_core_types::NormalizedEntry;
use serde::Serialize;

/// Ordering rule picked for one poll's snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailOrder {
    /// Newest `source_timestamp` first; entries without one trail behind.
    TimestampDesc,
    /// Last received first.
    ReverseArrival,
}

/// Decide the order from the first two received entries: timestamp order
/// only when both carry a timestamp.
pub fn order_for(entries: &[NormalizedEntry]) -> TrailOrder {
    let stamped = match entries {
        [] => false,
        [only] => only.has_timestamp(),
        [first, second, ..] => first.has_timestamp() && second.has_timestamp(),
    };
    if stamped {
        TrailOrder::TimestampDesc
    } else {
        TrailOrder::ReverseArrival
    }
}

/// Re-derive the whole trail from one poll's complete snapshot.
pub fn derive_trail(normalized: Vec<NormalizedEntry>) -> (Vec<NormalizedEntry>, TrailOrder) {
    let order = order_for(&normalized);
    let mut trail = normalized;
    trail.reverse();
    if order == TrailOrder::TimestampDesc {
        // Stable, so equal timestamps keep last-received-first.
        trail.sort_by(compare_newest_first);
    }
    (trail, order)
}

fn compare_newest_first(a: &NormalizedEntry, b: &NormalizedEntry) -> Ordering {
    match (a.source_timestamp, b.source_timestamp) {
        (Some(a_ts), Some(b_ts)) => b_ts.cmp(&a_ts),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
