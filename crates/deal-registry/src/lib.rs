//! In-memory registry of claimable deals and the request handler serving it.
//!
//! The [`Registry`] owns every live deal and serializes all operations
//! through a single lock. The [`Service`] sits between the transport and the
//! registry: it decodes payloads, dispatches to the registry, and maps
//! [`DealError`]s to responses.

pub mod clock;
mod error;
pub mod ids;
mod registry;
mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::DealError;
pub use ids::IdGenerator;
pub use registry::Registry;
pub use service::Service;

use deal_core::Config;

/// Entrypoint for the transport
///
/// Constructs the service that the surrounding infrastructure feeds requests
/// into.
pub fn launch(config: &Config) -> Service {
    Service::new(config)
}
