//! Vendor gateways: one adapter per SMS provider.

mod aliyun;
mod qcloud;
mod yunpian;

pub use aliyun::{AliyunConfig, AliyunGateway};
pub use qcloud::{QcloudConfig, QcloudGateway};
pub use yunpian::{YunpianConfig, YunpianGateway};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::{MessageError, PhoneNumber, ResolvedMessage};
use crate::transport::{BoxError, BoxFuture, HttpRequest, HttpResponse, HttpTransport};

/// An SMS provider the dispatcher can route messages through.
///
/// `send` receives the message already resolved for this gateway and returns the raw vendor
/// response body when the vendor accepted the message.
pub trait Gateway: Send + Sync {
    /// Registry key; must be unique among the gateways of one dispatcher.
    fn name(&self) -> &str;

    fn send<'a>(
        &'a self,
        http: &'a dyn HttpTransport,
        to: &'a PhoneNumber,
        message: &'a ResolvedMessage,
    ) -> BoxFuture<'a, Result<String, GatewayError>>;
}

#[derive(Debug, thiserror::Error)]
/// Failure of a single gateway attempt.
pub enum GatewayError {
    /// No gateway with this name is registered.
    #[error("gateway not found: {name}")]
    NotFound { name: String },

    /// The message could not be resolved for this gateway.
    #[error(transparent)]
    Message(#[from] MessageError),

    /// The request payload could not be encoded.
    #[error("request data error: {0}")]
    RequestData(#[source] serde_json::Error),

    /// HTTP client / transport failure (DNS, TLS, timeouts, etc).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Non-successful HTTP status code without a readable vendor response.
    #[error("unexpected HTTP status: {status}")]
    HttpStatus { status: u16, body: Option<String> },

    /// Response body could not be parsed as the expected format.
    #[error("parse error: {0}")]
    Parse(#[source] BoxError),

    /// The vendor answered but refused the message.
    #[error("{gateway} send failed: code {code}: {message}")]
    Vendor {
        gateway: String,
        code: String,
        message: String,
    },
}

impl GatewayError {
    pub(crate) fn vendor(
        gateway: &str,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Vendor {
            gateway: gateway.to_owned(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub(crate) async fn execute(
    http: &dyn HttpTransport,
    gateway: &str,
    request: HttpRequest,
) -> Result<HttpResponse, GatewayError> {
    debug!(
        gateway,
        method = request.method.as_str(),
        url = %request.url,
        "sending vendor request"
    );
    let response = http
        .execute(request)
        .await
        .map_err(GatewayError::Transport)?;
    debug!(gateway, status = response.status, body = %response.body, "vendor responded");
    Ok(response)
}

/// Vendors report failures inside JSON bodies even on 4xx, so the body is parsed first and the
/// status only matters when it does not parse.
pub(crate) fn decode_json<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, GatewayError> {
    match serde_json::from_str(&response.body) {
        Ok(parsed) => Ok(parsed),
        Err(_) if !response.is_success() => {
            let body = if response.body.trim().is_empty() {
                None
            } else {
                Some(response.body.clone())
            };
            Err(GatewayError::HttpStatus {
                status: response.status,
                body,
            })
        }
        Err(err) => Err(GatewayError::Parse(Box::new(err))),
    }
}
