pub mod client;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod types;

pub use client::{DEFAULT_BASE_URL, OmsClient, OmsGateway};
pub use error::OmsError;
pub use types::{
    Credentials, LocationId, OutageRecord, PageWindow, PendingFilter, Session, Submission,
};
