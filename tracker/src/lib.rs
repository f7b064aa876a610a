pub mod api;
pub mod repositories;
pub mod services;
pub mod statistics;
pub mod updater;

pub use api::router;
pub use repositories::{MarketStore, PriceHistory};
pub use services::QueryService;
pub use updater::{Scheduler, SchedulerError, UpdateCycle, UpdateReport};
