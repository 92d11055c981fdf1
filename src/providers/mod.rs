//! Upstream market-data providers.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::core::{AppError, PeriodWindow};

pub mod pulsedb;
pub mod util;

pub use pulsedb::{FundMetadata, FundSummary, PulseDbClient};

/// Upstream source of fund listings, metadata and NAV history.
///
/// The production implementation is [`PulseDbClient`]; sync and history
/// consumers depend on this trait so tests can substitute canned data.
#[async_trait]
pub trait FundDataSource: Send + Sync {
    /// Full-text search over scheme names.
    async fn search_funds(&self, query: &str) -> Result<Vec<FundSummary>, AppError>;

    /// All asset category names known to the provider.
    async fn asset_categories(&self) -> Result<Vec<String>, AppError>;

    /// Detailed metadata for one scheme, `None` when the provider has no
    /// record for the code.
    async fn fund_metadata(&self, scheme_code: &str) -> Result<Option<FundMetadata>, AppError>;

    /// NAV samples for one scheme over `window`, keyed and ordered by date.
    async fn nav_history(
        &self,
        scheme_code: &str,
        window: &PeriodWindow,
    ) -> Result<BTreeMap<NaiveDate, f64>, AppError>;
}
