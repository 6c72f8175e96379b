//! Identifier generation for new deals

use std::sync::atomic::{AtomicU64, Ordering};

use deal_core::IdScheme;
use uuid::Uuid;

/// Supplies identifiers for newly created deals
pub trait IdGenerator: Send + Sync {
    /// Produce the next identifier
    fn next_id(&self) -> String;
}

/// Random hyphenated UUID v4 identifiers
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().hyphenated().to_string()
    }
}

/// Monotonic `deal-<n>` identifiers, starting at 1
#[derive(Debug, Default)]
pub struct SequentialIds(AtomicU64);

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.0.fetch_add(1, Ordering::Relaxed) + 1;
        format!("deal-{n}")
    }
}

/// Build the generator selected by `scheme`
pub fn from_scheme(scheme: IdScheme) -> Box<dyn IdGenerator> {
    match scheme {
        IdScheme::Uuid => Box::new(UuidIds),
        IdScheme::Sequential => Box::<SequentialIds>::default(),
    }
}
