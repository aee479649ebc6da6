//! Alert monitoring engine.
//!
//! Classifies and normalizes feed records, keeps a short-lived freshness
//! cache and a rolling per-location history, and polls subscribed locations
//! on a fixed schedule.

pub mod cache;
pub mod clock;
pub mod engine;
pub mod history;
pub mod normalize;
pub mod registry;
pub mod scheduler;
pub mod severity;

#[cfg(test)]
mod testing;

pub use cache::{cache_key, round_coordinate, AlertCache, CacheEntry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{
    valid_coordinates, AlertEngine, EngineSettings, MAX_CACHE_TTL_SECS, MAX_RETENTION_HOURS,
};
pub use history::HistoricalStore;
pub use registry::{AlertSubscriber, ChannelSubscriber, FnSubscriber, SubscriptionRegistry};
pub use scheduler::{parse_location_key, Scheduler, TickSummary};
pub use severity::classify;
