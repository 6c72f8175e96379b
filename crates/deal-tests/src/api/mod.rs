use std::sync::Arc;

use deal_core::{DealUpdate, DealView, NewDeal, RequestKind};
use eyre::Result;
use flume::Sender;
use nanorand::Rng;
use thiserror::Error;
use tokio::sync::oneshot;

pub mod mock;

#[derive(Debug, Error)]
#[error("Error {status}: {msg}")]
pub struct ApiError {
    pub status: u16,
    pub msg: String,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum Response {
    Error { status: u16, msg: String },
    Deal { status: u16, deal: DealView },
    DealList(Vec<DealView>),
}

impl Response {
    fn into_api_response_deal(self, rq_kind: RequestKind) -> ApiResponse<DealView> {
        match self {
            Response::Error { status, msg } => ApiResponse {
                status,
                result: Err(ApiError { status, msg }),
            },
            Response::Deal { status, deal } => ApiResponse {
                status,
                result: Ok(deal),
            },
            resp => panic!("{rq_kind:?} must not be answered by {resp:?}"),
        }
    }
}

struct RequestMsg {
    kind: RequestKind,
    payload: Option<String>,
    deal_id: Option<String>,
    user_id: Option<String>,
    response_channel: oneshot::Sender<Response>,
}

pub struct Api {
    /// One channel per handler thread
    channels: Arc<Vec<Sender<RequestMsg>>>,

    my_channel: Sender<RequestMsg>,
    my_index: usize,
}

impl Api {
    fn new(channels: Vec<Sender<RequestMsg>>) -> Self {
        let my_channel = channels[0].clone();
        Self {
            channels: Arc::new(channels),
            my_channel,
            my_index: 0,
        }
    }
}

impl Clone for Api {
    fn clone(&self) -> Self {
        let my_index = (self.my_index + 1) % self.channels.len();
        Self {
            channels: self.channels.clone(),
            my_channel: self.channels[my_index].clone(),
            my_index,
        }
    }
}

impl Api {
    async fn make_request(
        &self,
        kind: RequestKind,
        payload: Option<String>,
        deal_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Response> {
        let (sender, receiver) = oneshot::channel();
        let msg = RequestMsg {
            kind,
            payload,
            deal_id: deal_id.map(str::to_owned),
            user_id: user_id.map(str::to_owned),
            response_channel: sender,
        };
        self.my_channel.send_async(msg).await?;
        Ok(receiver.await?)
    }

    async fn deal_request(
        &self,
        kind: RequestKind,
        payload: Option<String>,
        deal_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<ApiResponse<DealView>> {
        let response = self.make_request(kind, payload, deal_id, user_id);
        Ok(response.await?.into_api_response_deal(kind))
    }

    pub async fn create_deal(&self, deal: &NewDeal) -> Result<ApiResponse<DealView>> {
        self.create_deal_raw(serde_json::to_string(deal)?).await
    }

    /// Create a deal from an arbitrary (possibly malformed) JSON body
    pub async fn create_deal_raw(
        &self,
        body: impl Into<String>,
    ) -> Result<ApiResponse<DealView>> {
        let kind = RequestKind::CreateDeal;
        self.deal_request(kind, Some(body.into()), None, None).await
    }

    pub async fn update_deal(
        &self,
        id: &str,
        update: &DealUpdate,
    ) -> Result<ApiResponse<DealView>> {
        self.update_deal_raw(id, serde_json::to_string(update)?)
            .await
    }

    pub async fn update_deal_raw(
        &self,
        id: &str,
        body: impl Into<String>,
    ) -> Result<ApiResponse<DealView>> {
        let kind = RequestKind::UpdateDeal;
        self.deal_request(kind, Some(body.into()), Some(id), None)
            .await
    }

    pub async fn claim_deal(
        &self,
        id: &str,
        user: Option<&str>,
    ) -> Result<ApiResponse<DealView>> {
        let kind = RequestKind::ClaimDeal;
        self.deal_request(kind, None, Some(id), user).await
    }

    pub async fn end_deal(&self, id: &str) -> Result<ApiResponse<DealView>> {
        let kind = RequestKind::EndDeal;
        self.deal_request(kind, None, Some(id), None).await
    }

    pub async fn get_deal(&self, id: &str) -> Result<ApiResponse<DealView>> {
        let kind = RequestKind::GetDeal;
        self.deal_request(kind, None, Some(id), None).await
    }

    pub async fn list_deals(&self) -> Result<ApiResponse<Vec<DealView>>> {
        let kind = RequestKind::ListDeals;
        let response = self.make_request(kind, None, None, None);
        Ok(match response.await? {
            Response::Error { status, msg } => ApiResponse {
                status,
                result: Err(ApiError { status, msg }),
            },
            Response::DealList(deals) => ApiResponse {
                status: deal_core::status::OK,
                result: Ok(deals),
            },
            resp => panic!("{kind:?} must not be answered by {resp:?}"),
        })
    }

    pub fn create_user_session(&self) -> UserSession {
        let mut bytes = [0u8; 8];
        nanorand::tls_rng().fill(&mut bytes);
        let user_id = bytes.iter().map(|b| format!("{b:02x}")).collect();
        UserSession {
            api: self,
            user_id,
        }
    }
}

pub struct ApiResponse<T> {
    pub status: u16,
    pub result: ApiResult<T>,
}

impl<T> ApiResponse<T> {
    /// The error message, if the request failed
    pub fn err_msg(&self) -> Option<&str> {
        self.result.as_ref().err().map(|e| e.msg.as_str())
    }
}

/// A user with a fixed random identifier
pub struct UserSession<'a> {
    pub api: &'a Api,
    pub user_id: String,
}

impl<'a> UserSession<'a> {
    pub async fn claim(&self, deal_id: &str) -> Result<ApiResponse<DealView>> {
        self.api.claim_deal(deal_id, Some(self.user_id.as_str())).await
    }
}
