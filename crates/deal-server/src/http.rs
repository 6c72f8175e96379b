//! 🏗 HTTP request implementation

use std::io;
use std::io::Read;

use deal_core::{DealView, RequestKind, RequestMethod};
use serde_json::json;
use tiny_http::{Header, Method, Response};
use tracing::warn;

const ROUTES: &str = "🦀 could not find the service you are looking for!

Valid requests are:
  POST /createDeal
  PUT  /updateDeal/{id}
  POST /claimDeal/{id}?userId={user}
  POST /endDeal/{id}
  GET  /deal/{id}
  GET  /deals";

/// Largest request body accepted, in bytes
const MAX_BODY: usize = 64 * 1024;

struct HTTPRequest(tiny_http::Request);

impl deal_core::RawRequest for HTTPRequest {
    fn url(&self) -> &str {
        self.0.url()
    }

    fn method(&self) -> RequestMethod {
        method_of(self.0.method()).expect("unsupported methods are rejected by `parse`")
    }

    fn read_bytes(&mut self) -> io::Result<Vec<u8>> {
        // `parse` already turned away larger announced lengths; chunked
        // bodies are only bounded here
        let announced = self.0.body_length().unwrap_or(0).min(MAX_BODY);
        let mut buf = Vec::with_capacity(announced);
        let limit = MAX_BODY as u64 + 1;
        self.0.as_reader().take(limit).read_to_end(&mut buf)?;
        if buf.len() > MAX_BODY {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("request body exceeds {MAX_BODY} bytes"),
            ));
        }
        Ok(buf)
    }

    fn respond_with_err(self: Box<Self>, status: u16, err: String) {
        self.respond_json(status, json!({ "error": err }).to_string().into_bytes())
    }

    fn respond_with_deal(self: Box<Self>, status: u16, deal: DealView) {
        match serde_json::to_vec(&deal) {
            Ok(body) => self.respond_json(status, body),
            Err(e) => self.respond_encoding_failure(e),
        }
    }

    fn respond_with_deal_list(self: Box<Self>, deals: Vec<DealView>) {
        match serde_json::to_vec(&deals) {
            Ok(body) => self.respond_json(deal_core::status::OK, body),
            Err(e) => self.respond_encoding_failure(e),
        }
    }
}

impl HTTPRequest {
    /// Send `body` as `application/json` with the given status
    fn respond_json(self, status: u16, body: Vec<u8>) {
        let mut res = Response::from_data(body).with_status_code(status);
        res.add_header(Header::from_bytes(b"Content-Type", b"application/json").unwrap());
        send(self.0, res);
    }

    fn respond_encoding_failure(self, e: serde_json::Error) {
        warn!(error = %e, url = self.0.url(), "failed to encode response");
        send(self.0, Response::empty(500));
    }
}

/// Add CORS headers to `res` and send it
fn send<R: Read>(rq: tiny_http::Request, mut res: Response<R>) {
    add_response_cors_headers(&mut res);
    if let Err(e) = rq.respond(res) {
        warn!(error = %e, "HTTP response failed");
    }
}

/// Split `url` into its path and the value of the `userId` query parameter
fn split_url(url: &str) -> (&str, Option<String>) {
    let Some((path, query)) = url.split_once('?') else {
        return (url, None);
    };
    let user = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "userId")
        .map(|(_, value)| value.replace('+', " "))
        .and_then(|value| urlencoding::decode(&value).ok().map(|v| v.into_owned()));
    (path, user)
}

/// Map a request path to the kind of request and the addressed deal id
fn route(path: &str) -> Option<(RequestKind, Option<String>)> {
    match path {
        "/createDeal" => return Some((RequestKind::CreateDeal, None)),
        "/deals" => return Some((RequestKind::ListDeals, None)),
        _ => {}
    }

    let (prefix, id) = path.strip_prefix('/')?.split_once('/')?;
    let kind = match prefix {
        "updateDeal" => RequestKind::UpdateDeal,
        "claimDeal" => RequestKind::ClaimDeal,
        "endDeal" => RequestKind::EndDeal,
        "deal" => RequestKind::GetDeal,
        _ => return None,
    };
    if id.is_empty() || id.contains('/') {
        return None;
    }
    let id = urlencoding::decode(id).ok()?.into_owned();
    Some((kind, Some(id)))
}

/// The only method accepted for requests of `kind`
fn expected_method(kind: RequestKind) -> RequestMethod {
    match kind {
        RequestKind::CreateDeal | RequestKind::ClaimDeal | RequestKind::EndDeal => {
            RequestMethod::Post
        }
        RequestKind::UpdateDeal => RequestMethod::Put,
        RequestKind::GetDeal | RequestKind::ListDeals => RequestMethod::Get,
    }
}

fn method_of(method: &Method) -> Option<RequestMethod> {
    match method {
        Method::Get => Some(RequestMethod::Get),
        Method::Post => Some(RequestMethod::Post),
        Method::Put => Some(RequestMethod::Put),
        _ => None,
    }
}

/// Parse the given HTTP request
///
/// If [`None`] is returned, the request was already answered with a
/// corresponding error message, or its announced body exceeds [`MAX_BODY`]
/// and the connection was abandoned.
pub fn parse(rq: tiny_http::Request) -> Option<deal_core::Request> {
    if let Some(length) = rq.body_length().filter(|&n| n > MAX_BODY) {
        // Answering or dropping the request makes tiny_http drain the unread
        // body into one buffer of the announced size. The connection is
        // abandoned instead.
        warn!(length, url = rq.url(), "request body too large, dropping connection");
        std::mem::forget(rq);
        return None;
    }

    if matches!(rq.method(), Method::Options) {
        send(rq, Response::empty(204));
        return None;
    }

    let (path, user) = split_url(rq.url());
    let Some((kind, deal)) = route(path) else {
        send(rq, Response::from_string(ROUTES).with_status_code(404));
        return None;
    };

    if method_of(rq.method()) != Some(expected_method(kind)) {
        send(rq, Response::empty(405));
        return None;
    }

    Some(deal_core::Request::from_raw(
        kind,
        deal,
        user,
        Box::new(HTTPRequest(rq)),
    ))
}

/// Add CORS headers to `res`
fn add_response_cors_headers<R: Read>(res: &mut Response<R>) {
    res.add_header(Header::from_bytes(b"Access-Control-Request-Method", b"*").unwrap());
    res.add_header(Header::from_bytes(b"Access-Control-Allow-Origin", b"*").unwrap());
    res.add_header(Header::from_bytes(b"Access-Control-Allow-Headers", b"*").unwrap());
    res.add_header(Header::from_bytes(b"Access-Control-Expose-Headers", b"*").unwrap());
}
