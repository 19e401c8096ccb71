//! Engine error taxonomy.

use thiserror::Error;

/// Failures surfaced to the command boundary.
///
/// Every variant is recoverable: the transport renders it as a reply to
/// the caller and the process keeps running. The evaluation loop treats
/// `Upstream` as "abort this cycle, retry on the next tick".
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("caller is not authorized")]
    NotAuthorized,

    #[error("no access to {0}")]
    Forbidden(String),

    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    #[error("no pending request for {0}")]
    NoSuchRequest(String),

    #[error("{0} is already registered")]
    AlreadyExists(String),

    #[error("price source does not recognize {0}")]
    ValidationFailed(String),

    #[error("invalid alert position: {0}")]
    InvalidPosition(String),

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("price source unavailable: {0}")]
    Upstream(#[from] coinwatch_feeds::FeedError),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}
