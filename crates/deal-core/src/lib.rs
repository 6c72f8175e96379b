//! 🏗 Infrastructure for handling deal requests, etc.
#![warn(missing_docs)]

mod request;
mod wire;

pub use request::{RawRequest, Request, RequestHandler, RequestKind, RequestMethod};
pub use wire::{DealUpdate, DealView, NewDeal};

/// Configuration of the deal registry
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    /// How identifiers for new deals are generated
    pub id_scheme: IdScheme,
}

/// Scheme used to assign identifiers to newly created deals
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum IdScheme {
    /// Random hyphenated UUID v4
    #[default]
    Uuid,
    /// Process-local monotonic counter (`deal-1`, `deal-2`, ...)
    Sequential,
}

impl std::str::FromStr for IdScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uuid" => Ok(Self::Uuid),
            "sequential" | "seq" | "counter" => Ok(Self::Sequential),
            other => Err(format!("unknown id scheme `{other}` (expected uuid or sequential)")),
        }
    }
}

/// HTTP status codes used across the transport boundary
pub mod status {
    /// Success
    pub const OK: u16 = 200;
    /// A deal was created
    pub const CREATED: u16 = 201;
    /// The payload could not be decoded
    pub const BAD_REQUEST: u16 = 400;
    /// The referenced deal does not exist
    pub const NOT_FOUND: u16 = 404;
    /// The deal can no longer be claimed by this user
    pub const GONE: u16 = 410;
}
