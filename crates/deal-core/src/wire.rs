//! JSON shapes exchanged with clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a deal as exposed to callers
///
/// The set of claimants is deliberately absent; only the number of successful
/// claims leaves the registry.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct DealView {
    /// Unique identifier assigned at creation
    pub id: String,
    /// Total number of claim slots
    #[serde(rename = "item")]
    pub item_count: i64,
    /// Informational price
    pub price: f64,
    /// Instant after which no claims are accepted
    #[serde(rename = "endTime")]
    pub end_time: DateTime<Utc>,
    /// Number of successful claims so far
    #[serde(rename = "claimed")]
    pub claimed_count: usize,
}

/// Payload of a create request
///
/// Unknown fields (such as `id` or `claimed` of a previously serialized deal)
/// are ignored.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct NewDeal {
    /// Total number of claim slots
    #[serde(rename = "item")]
    pub item_count: i64,
    /// Informational price
    pub price: f64,
    /// Instant after which no claims are accepted
    #[serde(rename = "endTime")]
    pub end_time: DateTime<Utc>,
}

/// Payload of an update request
///
/// Both fields replace the stored values wholesale.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct DealUpdate {
    /// New total number of claim slots
    #[serde(rename = "items", alias = "item")]
    pub item_count: i64,
    /// New end time
    #[serde(rename = "endTime")]
    pub end_time: DateTime<Utc>,
}
