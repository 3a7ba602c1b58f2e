//! Failure taxonomy of an import run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    /// Raised before any network or database activity.
    #[error(
        "no USDA API key configured; set source.api_key in larder.toml or LARDER_SOURCE__API_KEY \
         (get one at https://fdc.nal.usda.gov/api-key-signup.html)"
    )]
    MissingCredential,

    #[error("could not connect to the database after {attempts} attempt(s): {source:#}")]
    Connect {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    /// Transport failure or non-2xx response from the food source.
    #[error("food source unavailable for '{term}': {source:#}")]
    SourceUnavailable {
        term: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("giving up after {reconnects} reconnect(s) caused by failed commits")]
    ReconnectBudgetExhausted { reconnects: u32 },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ImportError {
    /// Whether the whole run must stop.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ImportError::SourceUnavailable { .. })
    }
}
