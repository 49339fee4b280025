//! SMS dispatch with ordered failover across vendor gateways.
//!
//! A [`SmsRelay`] holds a frozen registry of gateways. Each `send` picks candidate gateways
//! (explicit list, then the message's list, then the defaults), orders them with a
//! [`Strategy`] and tries them one at a time until a vendor accepts the message.
//!
//! The crate is split into a domain layer of plain types ([`PhoneNumber`], [`Message`],
//! [`SendResult`]), the vendor gateways with their request signing, a transport layer wrapping
//! the HTTP client, and the client layer holding the dispatch engine.
//!
//! ```rust,no_run
//! use smsrelay::{Field, Message, PhoneNumber, QcloudGateway, SmsRelay, YunpianGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), smsrelay::SmsRelayError> {
//!     let relay = SmsRelay::builder()
//!         .gateway(QcloudGateway::new("1400000000", "secret-id", "secret-key", "Relay")?)
//!         .gateway(YunpianGateway::new("api-key", "【Relay】")?)
//!         .build()?;
//!
//!     let message = Message::new()
//!         .content("your code is 6379")
//!         .template(Field::derived(|gateway| match gateway.name() {
//!             "qcloud" => "1111111".to_owned(),
//!             _ => String::new(),
//!         }))
//!         .data([("code", "6379")]);
//!
//!     let to = PhoneNumber::new(13800138000, "+86")?;
//!     for result in relay.send(to, &message).await? {
//!         println!("{result}");
//!     }
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod client;
pub mod domain;
pub mod gateway;
pub mod signature;
pub mod transport;

pub use client::{SmsRelay, SmsRelayBuilder, SmsRelayError};
pub use domain::{
    Destination, Field, Message, MessageError, OrderStrategy, PhoneNumber, RandomStrategy,
    ResolvedMessage, SendResult, Status, Strategy, TemplateData, ValidationError,
};
pub use gateway::{
    AliyunConfig, AliyunGateway, Gateway, GatewayError, QcloudConfig, QcloudGateway,
    YunpianConfig, YunpianGateway,
};
pub use transport::{HttpTransport, ReqwestTransport};
