//! Alerting System
//!
//! Shared by both trackers: the `SuspicionEvent` record, the cooldown
//! watermark that rate-limits emissions, and the `EventSink` seam the
//! host process plugs its log, database and query slot into.

mod cooldown;
mod event;
mod sink;

pub use cooldown::Cooldown;
pub use event::{normalize_epoch_seconds, unix_now, Severity, SuspicionEvent, NORMAL_LABEL};
pub use sink::{EventSink, FanOutSink, SinkError, TracingSink};
