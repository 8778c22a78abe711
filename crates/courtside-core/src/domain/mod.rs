//! Domain types shared by the fetch and ingest stages.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`WorkUnitKey`] | Opaque key of one fetchable batch (a season) |
//! | [`WinLoss`] | Team outcome stored as `W` / `L` |
//! | [`RawRecordMap`] | One upstream row keyed by header, values as received |

mod win_loss;
mod work_unit;

pub use win_loss::WinLoss;
pub use work_unit::WorkUnitKey;

/// Upstream header name to the value exactly as received.
pub type RawRecordMap = serde_json::Map<String, serde_json::Value>;
