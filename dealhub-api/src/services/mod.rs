//! Business logic behind the HTTP handlers and the scheduler

pub mod affiliate;
pub mod alerts;
pub mod comparison;
pub mod jobs;
pub mod price_refresh;

pub use alerts::{trigger_price_alerts, AlertSummary};
pub use jobs::{run_price_job, PriceJobReport};
pub use price_refresh::{
    update_all_prices, update_product_prices, EstimatedPriceSource, PriceObservation, PriceSource,
    RefreshSummary,
};
