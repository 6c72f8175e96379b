use std::io;

use serde::de::DeserializeOwned;

use crate::status;
use crate::wire::DealView;

/// Kind of the request
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum RequestKind {
    /// Create a new deal from the JSON payload
    ///
    /// The response carries the stored deal including its freshly assigned id.
    CreateDeal,

    /// Replace item count and end time of an existing deal
    UpdateDeal,

    /// Claim one slot of a deal on behalf of a user
    ///
    /// The user is identified by the `userId` query parameter.
    ClaimDeal,

    /// Remove a deal from the registry and return its final state
    EndDeal,

    /// Look up a single live deal
    GetDeal,

    /// List all live deals
    ListDeals,
}

/// Request sent by a client
///
/// Request handlers primarily interact with instances of this type.
pub struct Request {
    kind: RequestKind,
    deal: Option<String>,
    user: Option<String>,
    raw: Box<dyn RawRequest + Send>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.kind)
            .field("deal", &self.deal)
            .field("user", &self.user)
            .field("raw", &format_args!(".."))
            .finish()
    }
}

/// HTTP request method
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum RequestMethod {
    /// GET request
    Get,
    /// POST request, may have a payload
    Post,
    /// PUT request, carries a payload
    Put,
}

/// Interface for handling requests from clients
pub trait RequestHandler {
    /// Handle a request
    ///
    /// This method may be called concurrently from different threads.
    fn handle(&self, request: Request);

    /// Shut the handler down once no more requests will arrive
    fn shutdown(self);
}

/// A raw request, implemented by the transport
pub trait RawRequest {
    /// Get the URL
    fn url(&self) -> &str;
    /// Get the request method
    fn method(&self) -> RequestMethod;

    /// Read the request body as bytes
    fn read_bytes(&mut self) -> io::Result<Vec<u8>>;

    /// Respond with an error message and the given status code
    fn respond_with_err(self: Box<Self>, status: u16, err: String);
    /// Respond with a single deal
    fn respond_with_deal(self: Box<Self>, status: u16, deal: DealView);
    /// Respond with a list of deals
    fn respond_with_deal_list(self: Box<Self>, deals: Vec<DealView>);
}

impl Request {
    /// Get the request's kind
    #[inline]
    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    /// Get the id of the addressed deal, if the route carried one
    #[inline]
    pub fn deal_id(&self) -> Option<&str> {
        self.deal.as_deref()
    }

    /// Get the id of the claiming user, if provided
    #[inline]
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Get the request URL
    #[inline]
    pub fn url(&self) -> &str {
        self.raw.url()
    }

    /// Get the request method
    #[inline]
    pub fn method(&self) -> RequestMethod {
        self.raw.method()
    }

    /// Read the payload as bytes
    ///
    /// Returns [`Err`] in case of a communication error. See
    /// [`std::io::Read::read_to_end()`] for more details. This method has side
    /// effects and should be called only once per request.
    #[inline]
    pub fn read_bytes(&mut self) -> io::Result<Vec<u8>> {
        self.raw.read_bytes()
    }

    /// Read and decode a JSON payload
    ///
    /// Communication errors and decoding errors are both reported as a
    /// human-readable message suitable for a `400` response.
    pub fn read_json<T: DeserializeOwned>(&mut self) -> Result<T, String> {
        let bytes = self.read_bytes().map_err(|e| e.to_string())?;
        serde_json::from_slice(&bytes).map_err(|e| e.to_string())
    }

    /// Respond with an error message and status code
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_err(self, status: u16, err: impl Into<String>) {
        self.raw.respond_with_err(status, err.into());
    }

    /// Respond with a deal and status `200`
    #[inline]
    pub fn respond_with_deal(self, deal: DealView) {
        self.raw.respond_with_deal(status::OK, deal);
    }

    /// Respond with a freshly created deal and status `201`
    #[inline]
    pub fn respond_with_created(self, deal: DealView) {
        self.raw.respond_with_deal(status::CREATED, deal);
    }

    /// Respond with a list of deals
    #[inline]
    pub fn respond_with_deal_list(self, deals: Vec<DealView>) {
        self.raw.respond_with_deal_list(deals)
    }

    /// Create a new request from a [`RawRequest`]
    #[inline]
    pub fn from_raw(
        kind: RequestKind,
        deal: Option<String>,
        user: Option<String>,
        raw: Box<dyn RawRequest + Send>,
    ) -> Self {
        Self {
            kind,
            deal,
            user,
            raw,
        }
    }
}
