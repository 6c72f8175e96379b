//! The registry of live deals

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use deal_core::{Config, DealUpdate, DealView, NewDeal};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::ids::{self, IdGenerator};
use crate::DealError;

#[derive(Debug)]
struct Deal {
    id: String,
    item_count: i64,
    price: f64,
    end_time: DateTime<Utc>,
    /// Users holding a claim; its size is the claimed count
    claimants: HashSet<String>,
}

impl Deal {
    #[inline]
    fn claimed_count(&self) -> usize {
        self.claimants.len()
    }

    #[inline]
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.end_time
    }

    #[inline]
    fn is_sold_out(&self) -> bool {
        i64::try_from(self.claimed_count()).unwrap_or(i64::MAX) >= self.item_count
    }

    fn view(&self) -> DealView {
        DealView {
            id: self.id.clone(),
            item_count: self.item_count,
            price: self.price,
            end_time: self.end_time,
            claimed_count: self.claimed_count(),
        }
    }
}

struct RegistryInner {
    deals: HashMap<String, Deal>,
}

/// All live deals behind one exclusive lock
///
/// Every operation holds the lock for its whole body, so operations are
/// totally ordered and never observe a partially applied mutation.
pub struct Registry {
    inner: Mutex<RegistryInner>,
    ids: Box<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl Registry {
    /// Create an empty registry using the wall clock
    pub fn new(config: &Config) -> Self {
        Self::with_parts(ids::from_scheme(config.id_scheme), Arc::new(SystemClock))
    }

    /// Create an empty registry from explicit collaborators
    pub fn with_parts(ids: Box<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                deals: HashMap::new(),
            }),
            ids,
            clock,
        }
    }

    /// Register a new deal
    ///
    /// Item count and end time are stored as given, even when negative or
    /// already in the past.
    pub fn create(&self, new: NewDeal) -> DealView {
        let mut inner = self.inner.lock();

        if new.item_count < 0 || new.end_time < self.clock.now() {
            warn!(
                item_count = new.item_count,
                end_time = %new.end_time,
                "creating a deal that can never be claimed"
            );
        }

        let mut id = self.ids.next_id();
        while inner.deals.contains_key(&id) {
            warn!(id = %id, "id generator returned a live id, drawing again");
            id = self.ids.next_id();
        }
        let deal = Deal {
            id: id.clone(),
            item_count: new.item_count,
            price: new.price,
            end_time: new.end_time,
            claimants: HashSet::new(),
        };
        let view = deal.view();
        inner.deals.insert(id, deal);
        info!(id = %view.id, items = view.item_count, "deal created");
        view
    }

    /// Replace item count and end time of a deal
    ///
    /// Existing claims are kept, even if the new item count is lower than the
    /// number of claims already made.
    pub fn update(&self, id: &str, update: DealUpdate) -> Result<DealView, DealError> {
        let mut inner = self.inner.lock();
        let deal = inner.deals.get_mut(id).ok_or(DealError::NotFound)?;

        deal.item_count = update.item_count;
        deal.end_time = update.end_time;
        info!(id, items = deal.item_count, end_time = %deal.end_time, "deal updated");
        Ok(deal.view())
    }

    /// Claim one slot of a deal for `user`
    ///
    /// Conditions are checked in a fixed order and the first failing one is
    /// reported: unknown id, expiry, no remaining slots, repeated claim.
    pub fn claim(&self, id: &str, user: &str) -> Result<DealView, DealError> {
        let mut inner = self.inner.lock();
        let deal = inner.deals.get_mut(id).ok_or(DealError::NotFound)?;

        if deal.is_expired(self.clock.now()) {
            return Err(DealError::Expired);
        }
        if deal.is_sold_out() {
            return Err(DealError::SoldOut);
        }
        if deal.claimants.contains(user) {
            return Err(DealError::AlreadyClaimed);
        }

        deal.claimants.insert(user.to_owned());
        debug!(id, user, claimed = deal.claimed_count(), "deal claimed");
        Ok(deal.view())
    }

    /// Remove a deal and return its final state
    pub fn end(&self, id: &str) -> Result<DealView, DealError> {
        let deal = self
            .inner
            .lock()
            .deals
            .remove(id)
            .ok_or(DealError::NotFound)?;
        info!(id, claimed = deal.claimed_count(), "deal ended");
        Ok(deal.view())
    }

    /// Current state of a live deal
    pub fn get(&self, id: &str) -> Result<DealView, DealError> {
        let inner = self.inner.lock();
        inner
            .deals
            .get(id)
            .map(Deal::view)
            .ok_or(DealError::NotFound)
    }

    /// Snapshots of all live deals, ordered by id
    pub fn list(&self) -> Vec<DealView> {
        let inner = self.inner.lock();
        let mut deals: Vec<DealView> = inner.deals.values().map(Deal::view).collect();
        deals.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        deals
    }

    /// Number of live deals
    pub fn len(&self) -> usize {
        self.inner.lock().deals.len()
    }

    /// Whether no deal is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
