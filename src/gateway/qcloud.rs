use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Gateway, GatewayError, decode_json, execute};
use crate::domain::{PhoneNumber, ResolvedMessage, ValidationError, non_empty};
use crate::signature::{CanonicalRequest, Tc3Signer};
use crate::transport::{BoxFuture, HttpRequest, HttpTransport, Method};

const NAME: &str = "qcloud";
const DEFAULT_ENDPOINT: &str = "https://sms.tencentcloudapi.com";
const HOST: &str = "sms.tencentcloudapi.com";
const SERVICE: &str = "sms";
const ACTION: &str = "SendSms";
const VERSION: &str = "2021-01-11";
const REGION: &str = "ap-guangzhou";
const CONTENT_TYPE: &str = "application/json; charset=utf-8";
const OK_CODE: &str = "Ok";

#[derive(Debug, Clone, Deserialize)]
/// Credentials for [`QcloudGateway`], as found in a config file.
pub struct QcloudConfig {
    pub sdk_app_id: String,
    pub secret_id: String,
    pub secret_key: String,
    pub sign_name: String,
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
/// Tencent Cloud SMS (`qcloud`): JSON POST signed with TC3-HMAC-SHA256.
///
/// Overriding the endpoint changes where requests go; the signed `Host` stays
/// `sms.tencentcloudapi.com`.
pub struct QcloudGateway {
    sdk_app_id: String,
    secret_id: String,
    secret_key: String,
    sign_name: String,
    endpoint: String,
}

impl QcloudGateway {
    pub fn new(
        sdk_app_id: impl Into<String>,
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
        sign_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            sdk_app_id: non_empty("sdk_app_id", sdk_app_id)?,
            secret_id: non_empty("secret_id", secret_id)?,
            secret_key: non_empty("secret_key", secret_key)?,
            sign_name: non_empty("sign_name", sign_name)?,
            endpoint: DEFAULT_ENDPOINT.to_owned(),
        })
    }

    pub fn from_config(config: QcloudConfig) -> Result<Self, ValidationError> {
        let gateway = Self::new(
            config.sdk_app_id,
            config.secret_id,
            config.secret_key,
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

    fn payload(&self, to: &PhoneNumber, message: &ResolvedMessage) -> SendSmsPayload {
        let phone = if to.idd_code() == 0 {
            to.number().to_string()
        } else {
            to.universal_number()
        };

        SendSmsPayload {
            phone_number_set: vec![phone],
            sms_sdk_app_id: self.sdk_app_id.clone(),
            template_id: message.template.clone(),
            sign_name: self.sign_name.clone(),
            template_param_set: message.data.values().cloned().collect(),
        }
    }

    fn build_request(
        &self,
        to: &PhoneNumber,
        message: &ResolvedMessage,
        at: DateTime<Utc>,
    ) -> Result<HttpRequest, GatewayError> {
        let payload = serde_json::to_string(&self.payload(to, message))
            .map_err(GatewayError::RequestData)?;

        let canonical = CanonicalRequest {
            method: Method::Post,
            uri: "/",
            query: "",
            content_type: CONTENT_TYPE,
            host: HOST,
            payload: &payload,
        };
        let authorization =
            Tc3Signer::new(&self.secret_id, &self.secret_key, SERVICE).authorization(&canonical, at);

        Ok(HttpRequest::post(&self.endpoint)
            .header("Authorization", authorization)
            .header("Host", HOST)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-TC-Action", ACTION)
            .header("X-TC-Region", REGION)
            .header("X-TC-Timestamp", at.timestamp().to_string())
            .header("X-TC-Version", VERSION)
            .json(payload))
    }
}

/// Field order is part of the signed payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendSmsPayload {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    phone_number_set: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    sms_sdk_app_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    template_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    sign_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    template_param_set: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendSmsEnvelope {
    response: SendSmsReply,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendSmsReply {
    #[serde(default)]
    error: Option<ReplyError>,
    #[serde(default)]
    send_status_set: Vec<SendStatus>,
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ReplyError {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendStatus {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    serial_no: Option<String>,
}

impl SendSmsReply {
    fn into_result(self) -> Result<Option<String>, GatewayError> {
        if let Some(error) = self.error {
            return Err(GatewayError::vendor(NAME, error.code, error.message));
        }
        if let Some(status) = self.send_status_set.iter().find(|s| s.code != OK_CODE) {
            return Err(GatewayError::vendor(
                NAME,
                status.code.clone(),
                status.message.clone(),
            ));
        }
        debug!(
            gateway = NAME,
            serial_no = self
                .send_status_set
                .first()
                .and_then(|s| s.serial_no.as_deref())
                .unwrap_or_default(),
            "message accepted"
        );
        Ok(self.request_id)
    }
}

impl Gateway for QcloudGateway {
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
            let request = self.build_request(to, message, Utc::now())?;
            let response = execute(http, NAME, request).await?;

            let envelope: SendSmsEnvelope = decode_json(&response)?;
            let request_id = envelope.response.into_result()?;
            debug!(
                gateway = NAME,
                request_id = request_id.as_deref().unwrap_or_default(),
                "vendor request completed"
            );
            Ok(response.body)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::transport::Body;
    use crate::transport::fake::FakeTransport;

    const PAYLOAD: &str = r#"{"PhoneNumberSet":["18888888888"],"SmsSdkAppId":"SdkAppId","TemplateId":"1111111","SignName":"gsms","TemplateParamSet":["521410","5"]}"#;

    fn gateway() -> QcloudGateway {
        QcloudGateway::new("SdkAppId", "SecretId", "SecretKey", "gsms").unwrap()
    }

    fn message() -> ResolvedMessage {
        ResolvedMessage {
            template: "1111111".to_owned(),
            data: [
                ("1".to_owned(), "521410".to_owned()),
                ("2".to_owned(), "5".to_owned()),
            ]
            .into(),
            ..ResolvedMessage::default()
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.timestamp_opt(1684225049, 0).unwrap()
    }

    #[test]
    fn payload_serializes_in_signed_field_order() {
        let payload = gateway().payload(&PhoneNumber::without_idd_code(18888888888), &message());
        assert_eq!(serde_json::to_string(&payload).unwrap(), PAYLOAD);
    }

    #[test]
    fn payload_uses_universal_number_when_code_is_known() {
        let phone = PhoneNumber::new(18888888888, "86").unwrap();
        let payload = gateway().payload(&phone, &ResolvedMessage::default());
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"PhoneNumberSet":["+8618888888888"],"SmsSdkAppId":"SdkAppId","SignName":"gsms"}"#
        );
    }

    #[test]
    fn build_request_carries_reference_authorization() {
        let request = gateway()
            .build_request(&PhoneNumber::without_idd_code(18888888888), &message(), at())
            .unwrap();

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "https://sms.tencentcloudapi.com");
        assert_eq!(
            request.header_value("Authorization"),
            Some(
                "TC3-HMAC-SHA256 Credential=SecretId/2023-05-16/sms/tc3_request, SignedHeaders=content-type;host, Signature=c339e750c3b92ca97783de2c8d00434b12cf8f22c45d421fa8b0609d64e51358"
            )
        );
        assert_eq!(request.header_value("host"), Some("sms.tencentcloudapi.com"));
        assert_eq!(
            request.header_value("content-type"),
            Some("application/json; charset=utf-8")
        );
        assert_eq!(request.header_value("X-TC-Action"), Some("SendSms"));
        assert_eq!(request.header_value("X-TC-Region"), Some("ap-guangzhou"));
        assert_eq!(request.header_value("X-TC-Timestamp"), Some("1684225049"));
        assert_eq!(request.header_value("X-TC-Version"), Some("2021-01-11"));
        assert_eq!(request.body, Some(Body::Json(PAYLOAD.to_owned())));
    }

    #[tokio::test]
    async fn send_accepts_all_ok_statuses() {
        let body = r#"{"Response":{"SendStatusSet":[{"SerialNo":"5000:1045710669157053657849499619","PhoneNumber":"+8618888888888","Fee":1,"SessionContext":"","Code":"Ok","Message":"send success","IsoCode":"CN"}],"RequestId":"a0aabda6-cf91-4f3e-a81f-9198114a2279"}}"#;
        let transport = FakeTransport::new().respond(200, body);
        let gateway = gateway().endpoint("https://example.invalid/qcloud");

        let raw = gateway
            .send(&transport, &PhoneNumber::new(18888888888, "+86").unwrap(), &message())
            .await
            .unwrap();
        assert_eq!(raw, body);
        assert_eq!(transport.last_request().url, "https://example.invalid/qcloud");
    }

    #[tokio::test]
    async fn send_maps_top_level_error() {
        let transport = FakeTransport::new().respond(
            200,
            r#"{"Response":{"Error":{"Code":"AuthFailure.SignatureFailure","Message":"The provided credentials could not be validated."},"RequestId":"x"}}"#,
        );

        let err = gateway()
            .send(&transport, &PhoneNumber::without_idd_code(1), &message())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "qcloud send failed: code AuthFailure.SignatureFailure: The provided credentials could not be validated."
        );
    }

    #[tokio::test]
    async fn send_maps_failed_recipient_status() {
        let transport = FakeTransport::new().respond(
            200,
            r#"{"Response":{"SendStatusSet":[{"Code":"LimitExceeded.PhoneNumberDailyLimit","Message":"daily limit reached"}],"RequestId":"x"}}"#,
        );

        let err = gateway()
            .send(&transport, &PhoneNumber::without_idd_code(1), &message())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Vendor { ref code, .. } if code == "LimitExceeded.PhoneNumberDailyLimit"
        ));
    }

    #[tokio::test]
    async fn send_rejects_unexpected_body() {
        let transport = FakeTransport::new().respond(200, r#"{"SendSmsResponse":{}}"#);
        let err = gateway()
            .send(&transport, &PhoneNumber::without_idd_code(1), &message())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Parse(_)));
    }
}
