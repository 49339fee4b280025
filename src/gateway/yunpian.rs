use serde::Deserialize;
use tracing::debug;

use super::{Gateway, GatewayError, decode_json, execute};
use crate::domain::{PhoneNumber, ResolvedMessage, TemplateData, ValidationError, non_empty};
use crate::transport::{BoxFuture, HttpRequest, HttpTransport};

const NAME: &str = "yunpian";
const PRODUCT: &str = "sms";
const VERSION: &str = "v2";
const RESOURCE: &str = "sms";
const FORMAT: &str = "json";
const SINGLE_SEND: &str = "single_send";
const TPL_SINGLE_SEND: &str = "tpl_single_send";
const SIGNATURE_OPEN: char = '【';

#[derive(Debug, Clone, Deserialize)]
/// Credentials for [`YunpianGateway`], as found in a config file.
pub struct YunpianConfig {
    pub api_key: String,
    /// Prepended to plain-text content, e.g. `【Relay】`.
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
/// Yunpian (`yunpian`): form POST authenticated with an API key.
pub struct YunpianGateway {
    api_key: String,
    signature: String,
    base_url: Option<String>,
}

impl YunpianGateway {
    pub fn new(
        api_key: impl Into<String>,
        signature: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            api_key: non_empty("api_key", api_key)?,
            signature: signature.into(),
            base_url: None,
        })
    }

    pub fn from_config(config: YunpianConfig) -> Result<Self, ValidationError> {
        let gateway = Self::new(config.api_key, config.signature)?;
        Ok(match config.endpoint {
            Some(endpoint) => gateway.endpoint(endpoint),
            None => gateway,
        })
    }

    /// Override the base URL (`https://sms.yunpian.com`); the `/v2/sms/<method>.json` path is
    /// appended to it.
    pub fn endpoint(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_owned());
        self
    }

    fn build_request(&self, to: &PhoneNumber, message: &ResolvedMessage) -> HttpRequest {
        let mut params = vec![
            ("apikey".to_owned(), self.api_key.clone()),
            ("mobile".to_owned(), to.universal_number()),
        ];

        let method = if message.has_template() {
            params.push(("tpl_id".to_owned(), message.template.clone()));
            params.push(("tpl_value".to_owned(), template_value(&message.data)));
            TPL_SINGLE_SEND
        } else {
            params.push(("text".to_owned(), self.signed_text(&message.content)));
            SINGLE_SEND
        };

        let url = match &self.base_url {
            Some(base_url) => format!("{base_url}/{VERSION}/{RESOURCE}/{method}.{FORMAT}"),
            None => build_endpoint(PRODUCT, RESOURCE, method),
        };
        HttpRequest::post(url).form(params)
    }

    fn signed_text(&self, content: &str) -> String {
        if content.starts_with(SIGNATURE_OPEN) {
            content.to_owned()
        } else {
            format!("{}{content}", self.signature)
        }
    }
}

/// `https://{product}.yunpian.com/{version}/{resource}/{method}.{format}`.
fn build_endpoint(product: &str, resource: &str, method: &str) -> String {
    format!("https://{product}.yunpian.com/{VERSION}/{resource}/{method}.{FORMAT}")
}

/// `#key#=value` pairs joined by `&`, in key order.
fn template_value(data: &TemplateData) -> String {
    data.iter()
        .map(|(key, value)| format!("#{key}#={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[derive(Debug, Deserialize)]
struct SendReply {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    sid: Option<i64>,
}

impl Gateway for YunpianGateway {
    fn name(&self) -> &str {
        NAME
    }

    fn send<'a>(
        &'a self,
        http: &'a dyn HttpTransport,
        to: &'a PhoneNumber,
        message: &'a ResolvedMessage,
    ) -> BoxFuture<'a, Result<String, GatewayError>> {
        Box::pin(async move {
            let response = execute(http, NAME, self.build_request(to, message)).await?;

            let reply: SendReply = decode_json(&response)?;
            if reply.code != 0 {
                let message = if reply.detail.is_empty() {
                    reply.msg
                } else {
                    format!("{}: {}", reply.msg, reply.detail)
                };
                return Err(GatewayError::vendor(NAME, reply.code.to_string(), message));
            }
            debug!(gateway = NAME, sid = reply.sid.unwrap_or_default(), "message accepted");
            Ok(response.body)
        })
    }
}
