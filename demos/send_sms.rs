use std::io;

use smsrelay::{
    AliyunGateway, Field, Message, PhoneNumber, QcloudGateway, SmsRelay, SmsRelayError,
    YunpianGateway,
};
use tracing_subscriber::EnvFilter;

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let phone_raw = env("SMSRELAY_PHONE").ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "SMSRELAY_PHONE environment variable is required (e.g. +8613800138000)",
        )
    })?;
    let code = env("SMSRELAY_CODE").unwrap_or_else(|| "6379".to_owned());

    let mut builder = SmsRelay::builder();
    if let (Some(id), Some(secret), Some(sign)) = (
        env("ALIYUN_ACCESS_KEY_ID"),
        env("ALIYUN_ACCESS_KEY_SECRET"),
        env("ALIYUN_SIGN_NAME"),
    ) {
        builder = builder.gateway(AliyunGateway::new(id, secret, sign)?);
    }
    if let (Some(app), Some(id), Some(key), Some(sign)) = (
        env("QCLOUD_SDK_APP_ID"),
        env("QCLOUD_SECRET_ID"),
        env("QCLOUD_SECRET_KEY"),
        env("QCLOUD_SIGN_NAME"),
    ) {
        builder = builder.gateway(QcloudGateway::new(app, id, key, sign)?);
    }
    if let Some(api_key) = env("YUNPIAN_API_KEY") {
        let signature = env("YUNPIAN_SIGNATURE").unwrap_or_default();
        builder = builder.gateway(YunpianGateway::new(api_key, signature)?);
    }
    if let Some(defaults) = env("SMSRELAY_GATEWAYS") {
        builder = builder.default_gateways(defaults.split(',').map(str::trim));
    }
    let relay = builder.build()?;

    let aliyun_template = env("ALIYUN_TEMPLATE").unwrap_or_default();
    let qcloud_template = env("QCLOUD_TEMPLATE").unwrap_or_default();
    let message = Message::new()
        .content(format!("Your verification code is {code}."))
        .template(Field::derived(move |gateway| match gateway.name() {
            "aliyun" => aliyun_template.clone(),
            "qcloud" => qcloud_template.clone(),
            _ => String::new(),
        }))
        .data([("code", code.as_str())]);

    match relay.send(PhoneNumber::parse(&phone_raw)?, &message).await {
        Ok(results) => {
            for result in &results {
                println!("{result}");
            }
        }
        Err(SmsRelayError::GatewaysFailed(results)) => {
            for result in &results {
                println!("{result}");
            }
            return Err("no gateway accepted the message".into());
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
