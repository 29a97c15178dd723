use thiserror::Error;

use crate::oms::OmsError;

#[derive(Debug, Error)]
pub enum ReasonerError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Login failed: {0}")]
    Auth(#[source] OmsError),

    #[error("Failed to fetch pending outages: {0}")]
    Fetch(#[source] OmsError),

    #[error("Pole lookup failed for outage {outage_id}: {source}")]
    Locations {
        outage_id: String,
        #[source]
        source: OmsError,
    },

    #[error("No candidate poles for outage {0}")]
    EmptyCandidateSet(String),

    #[error("Submit failed for outage {outage_id}: {source}")]
    Submit {
        outage_id: String,
        #[source]
        source: OmsError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
