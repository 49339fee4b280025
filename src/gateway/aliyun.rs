use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::{Gateway, GatewayError, decode_json, execute};
use crate::domain::{PhoneNumber, ResolvedMessage, ValidationError, non_empty};
use crate::signature::sign_query;
use crate::transport::{BoxFuture, HttpRequest, HttpTransport, Method};

const NAME: &str = "aliyun";
const DEFAULT_ENDPOINT: &str = "http://dysmsapi.aliyuncs.com";
const REGION_ID: &str = "cn-hangzhou";
const FORMAT: &str = "JSON";
const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const SIGNATURE_VERSION: &str = "1.0";
const ACTION: &str = "SendSms";
const VERSION: &str = "2017-05-25";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const OK_CODE: &str = "OK";

#[derive(Debug, Clone, Deserialize)]
/// Credentials for [`AliyunGateway`], as found in a config file.
pub struct AliyunConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub sign_name: String,
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
/// Alibaba Cloud SMS (`aliyun`): signed GET query, HMAC-SHA1.
pub struct AliyunGateway {
    access_key_id: String,
    access_key_secret: String,
    sign_name: String,
    endpoint: String,
}

impl AliyunGateway {
    pub fn new(
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        sign_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            access_key_id: non_empty("access_key_id", access_key_id)?,
            access_key_secret: non_empty("access_key_secret", access_key_secret)?,
            sign_name: non_empty("sign_name", sign_name)?,
            endpoint: DEFAULT_ENDPOINT.to_owned(),
        })
    }

    pub fn from_config(config: AliyunConfig) -> Result<Self, ValidationError> {
        let gateway = Self::new(
            config.access_key_id,
            config.access_key_secret,
            config.sign_name,
        )?;
        Ok(match config.endpoint {
            Some(endpoint) => gateway.endpoint(endpoint),
            None => gateway,
        })
    }

    /// Override the API endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_request(
        &self,
        to: &PhoneNumber,
        message: &ResolvedMessage,
        nonce: &str,
        at: DateTime<Utc>,
    ) -> Result<HttpRequest, GatewayError> {
        let template_param =
            serde_json::to_string(&message.data).map_err(GatewayError::RequestData)?;

        let mut params = [
            ("RegionId", REGION_ID.to_owned()),
            ("AccessKeyId", self.access_key_id.clone()),
            ("Format", FORMAT.to_owned()),
            ("SignatureMethod", SIGNATURE_METHOD.to_owned()),
            ("SignatureVersion", SIGNATURE_VERSION.to_owned()),
            ("SignatureNonce", nonce.to_owned()),
            ("Timestamp", at.format(TIMESTAMP_FORMAT).to_string()),
            ("Action", ACTION.to_owned()),
            ("Version", VERSION.to_owned()),
            ("PhoneNumbers", to.universal_number()),
            ("SignName", self.sign_name.clone()),
            ("TemplateCode", message.template.clone()),
            ("TemplateParam", template_param),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect::<Vec<_>>();

        let signature = sign_query(Method::Get, &params, &self.access_key_secret);
        params.push(("Signature".to_owned(), signature));

        Ok(HttpRequest::get(&self.endpoint).query(params))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendSmsReply {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    biz_id: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
}

impl Gateway for AliyunGateway {
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
            let nonce = Uuid::new_v4().to_string();
            let request = self.build_request(to, message, &nonce, Utc::now())?;
            let response = execute(http, NAME, request).await?;

            let reply: SendSmsReply = decode_json(&response)?;
            if reply.code != OK_CODE {
                return Err(GatewayError::vendor(NAME, reply.code, reply.message));
            }
            debug!(
                gateway = NAME,
                biz_id = reply.biz_id.as_deref().unwrap_or_default(),
                request_id = reply.request_id.as_deref().unwrap_or_default(),
                "message accepted"
            );
            Ok(response.body)
        })
    }
}
