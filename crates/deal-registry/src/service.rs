//! Request handler dispatching decoded requests to the [`Registry`]

use deal_core::{Config, DealUpdate, DealView, NewDeal, Request, RequestHandler, RequestKind};
use tracing::{debug, info, warn};

use crate::{DealError, Registry};

/// Answers requests from the transport using one shared [`Registry`]
pub struct Service {
    registry: Registry,
}

impl Service {
    /// Create a service around an empty registry
    pub fn new(config: &Config) -> Self {
        Self::with_registry(Registry::new(config))
    }

    /// Create a service around an existing registry
    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    /// The registry backing this service
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn create(&self, rq: &mut Request) -> Result<DealView, DealError> {
        // The body is fully read before the registry lock is taken.
        let new: NewDeal = rq.read_json().map_err(DealError::MalformedInput)?;
        Ok(self.registry.create(new))
    }

    fn update(&self, rq: &mut Request) -> Result<DealView, DealError> {
        let update: DealUpdate = rq.read_json().map_err(DealError::MalformedInput)?;
        self.registry.update(deal_id(rq)?, update)
    }

    fn claim(&self, rq: &Request) -> Result<DealView, DealError> {
        let user = match rq.user_id() {
            Some(user) if !user.is_empty() => user,
            _ => return Err(DealError::MalformedInput("No user id provided!".into())),
        };
        self.registry.claim(deal_id(rq)?, user)
    }
}

fn deal_id(rq: &Request) -> Result<&str, DealError> {
    rq.deal_id()
        .ok_or_else(|| DealError::MalformedInput("No deal id provided!".into()))
}

impl RequestHandler for Service {
    fn handle(&self, mut rq: Request) {
        let kind = *rq.kind();
        debug!(?kind, method = ?rq.method(), url = rq.url(), "handling request");
        let result = match kind {
            RequestKind::CreateDeal => match self.create(&mut rq) {
                Ok(deal) => return rq.respond_with_created(deal),
                Err(e) => Err(e),
            },
            RequestKind::UpdateDeal => self.update(&mut rq),
            RequestKind::ClaimDeal => self.claim(&rq),
            RequestKind::EndDeal => deal_id(&rq).and_then(|id| self.registry.end(id)),
            RequestKind::GetDeal => deal_id(&rq).and_then(|id| self.registry.get(id)),
            RequestKind::ListDeals => return rq.respond_with_deal_list(self.registry.list()),
        };

        match result {
            Ok(deal) => rq.respond_with_deal(deal),
            Err(e) => {
                if let DealError::MalformedInput(msg) = &e {
                    warn!(?kind, url = rq.url(), "rejecting malformed request: {msg}");
                }
                rq.respond_with_err(e.status(), e.to_string());
            }
        }
    }

    fn shutdown(self) {
        info!(live_deals = self.registry.len(), "deal service shutting down");
    }
}
