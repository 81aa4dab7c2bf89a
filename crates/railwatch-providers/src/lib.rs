//! # Railwatch Providers
//!
//! Reservation status providers. Only ConfirmTkt is implemented; the
//! [`StatusFetcher`] trait is the extension point for others.

pub mod confirmtkt;

use railwatch_core::config::WatchConfig;
use railwatch_core::traits::StatusFetcher;

pub use confirmtkt::ConfirmTktFetcher;

/// Create the status fetcher from configuration.
pub fn create_fetcher(config: &WatchConfig) -> Box<dyn StatusFetcher> {
    Box::new(ConfirmTktFetcher::from_config(&config.provider))
}
