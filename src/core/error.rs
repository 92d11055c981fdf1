use thiserror::Error;

/// Error taxonomy for the request path.
///
/// Sync-time per-fund failures are not represented here; the pipeline logs and
/// counts them instead of propagating.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid period '{0}': expected one of 6M, 1Y, 3Y, 5Y, MAX")]
    InvalidPeriod(String),

    #[error("fund not found: {0}")]
    FundNotFound(String),

    #[error("provider authentication failed: {0}")]
    UpstreamAuth(String),

    #[error("provider request to {endpoint} failed: {message}")]
    UpstreamRequest { endpoint: String, message: String },

    /// A NAV series existed but had no usable points after parsing.
    #[error("NAV series is empty")]
    EmptySeries,

    /// The provider returned no history at all for the fund/period.
    #[error("no NAV history available for {0}")]
    NoDataAvailable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidPeriod(_) => "INVALID_PERIOD",
            AppError::FundNotFound(_) => "FUND_NOT_FOUND",
            AppError::UpstreamAuth(_) => "UPSTREAM_AUTH_FAILED",
            AppError::UpstreamRequest { .. } => "UPSTREAM_REQUEST_FAILED",
            AppError::EmptySeries => "EMPTY_SERIES",
            AppError::NoDataAvailable(_) => "NO_DATA_AVAILABLE",
            AppError::Internal(_) => "INTERNAL",
        }
    }
}
