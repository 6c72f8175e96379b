use deal_core::status;
use thiserror::Error;

/// Reasons a deal operation is rejected
///
/// A failing operation never leaves a partial effect behind.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum DealError {
    /// No live deal carries the requested id
    #[error("Deal not found")]
    NotFound,
    /// The claim arrived after the deal's end time
    #[error("Deal ended")]
    Expired,
    /// Every claim slot is taken
    #[error("Deal is sold out")]
    SoldOut,
    /// The user already holds a claim on this deal
    #[error("User already claimed the deal")]
    AlreadyClaimed,
    /// The request could not be decoded
    #[error("{0}")]
    MalformedInput(String),
}

impl DealError {
    /// HTTP status reported to the client
    pub fn status(&self) -> u16 {
        match self {
            DealError::NotFound => status::NOT_FOUND,
            DealError::Expired | DealError::SoldOut | DealError::AlreadyClaimed => status::GONE,
            DealError::MalformedInput(_) => status::BAD_REQUEST,
        }
    }
}
