//! Mock API implementation directly using the `deal-registry` crate

use std::sync::Arc;

use deal_core::{DealView, RawRequest, Request, RequestHandler, RequestKind, RequestMethod};
use deal_registry::Service;
use tokio::sync::oneshot;
use tokio::task::{self, JoinHandle};

use super::{Api, RequestMsg, Response};

pub struct MockService {
    service: Arc<Service>,
    join_handles: Vec<JoinHandle<()>>,
}

struct MockRawRequest {
    url: String,
    payload: Option<String>,
    kind: RequestKind,
    response_channel: oneshot::Sender<Response>,
}

pub fn start(threads: u16, service: Service) -> (MockService, Api) {
    let service = Arc::new(service);

    let it = (0..threads).map(|_| {
        let (sender, receiver) = flume::bounded::<RequestMsg>(65536);
        let service = service.clone();
        let handle = task::spawn_blocking(move || {
            let service = &*service;
            for msg in receiver.into_iter() {
                let raw = Box::new(MockRawRequest {
                    url: url_of(msg.kind, msg.deal_id.as_deref(), msg.user_id.as_deref()),
                    payload: msg.payload,
                    kind: msg.kind,
                    response_channel: msg.response_channel,
                });
                service.handle(Request::from_raw(msg.kind, msg.deal_id, msg.user_id, raw))
            }
        });
        (sender, handle)
    });
    let (senders, join_handles) = it.unzip();

    let mock_service = MockService {
        service,
        join_handles,
    };
    (mock_service, Api::new(senders))
}

fn url_of(kind: RequestKind, deal: Option<&str>, user: Option<&str>) -> String {
    use RequestKind::*;
    let deal = deal.unwrap_or_default();
    match kind {
        CreateDeal => "/createDeal".into(),
        UpdateDeal => format!("/updateDeal/{deal}"),
        ClaimDeal => match user {
            Some(user) => format!("/claimDeal/{deal}?userId={user}"),
            None => format!("/claimDeal/{deal}"),
        },
        EndDeal => format!("/endDeal/{deal}"),
        GetDeal => format!("/deal/{deal}"),
        ListDeals => "/deals".into(),
    }
}

impl MockService {
    pub async fn shutdown(self) {
        for handle in self.join_handles {
            handle.await.unwrap()
        }
        task::spawn_blocking(move || Arc::into_inner(self.service).unwrap().shutdown())
            .await
            .unwrap();
    }
}

impl RawRequest for MockRawRequest {
    fn url(&self) -> &str {
        &self.url
    }

    fn method(&self) -> RequestMethod {
        use RequestKind::*;
        match self.kind {
            GetDeal | ListDeals => RequestMethod::Get,
            UpdateDeal => RequestMethod::Put,
            _ => RequestMethod::Post,
        }
    }

    fn read_bytes(&mut self) -> std::io::Result<Vec<u8>> {
        Ok(self.payload.take().unwrap_or_default().into_bytes())
    }

    fn respond_with_err(self: Box<Self>, status: u16, msg: String) {
        let response = Response::Error { status, msg };
        self.response_channel.send(response).unwrap()
    }

    fn respond_with_deal(self: Box<Self>, status: u16, deal: DealView) {
        let response = Response::Deal { status, deal };
        self.response_channel.send(response).unwrap()
    }

    fn respond_with_deal_list(self: Box<Self>, deals: Vec<DealView>) {
        let response = Response::DealList(deals);
        self.response_channel.send(response).unwrap()
    }
}
