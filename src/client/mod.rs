//! Client layer: the dispatch engine that picks gateways, attempts them in order and folds the
//! attempts into one outcome.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::{
    Destination, Message, OrderStrategy, PhoneNumber, SendResult, Strategy, ValidationError,
};
use crate::gateway::{Gateway, GatewayError};
use crate::transport::{BoxError, HttpTransport, ReqwestTransport};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
/// Errors returned by [`SmsRelay`].
///
/// Per-gateway failures never surface directly; they are collected into
/// [`SmsRelayError::GatewaysFailed`] when no gateway succeeds.
pub enum SmsRelayError {
    /// The destination could not be turned into a phone number.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The HTTP client could not be built.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// Every selected gateway failed; results are in attempt order.
    #[error("all gateways failed to send message: {}", join_results(.0))]
    GatewaysFailed(Vec<SendResult>),
}

impl SmsRelayError {
    /// Attempt results carried by [`SmsRelayError::GatewaysFailed`].
    pub fn results(&self) -> &[SendResult] {
        match self {
            Self::GatewaysFailed(results) => results,
            _ => &[],
        }
    }
}

fn join_results(results: &[SendResult]) -> String {
    if results.is_empty() {
        return "no gateway selected".to_owned();
    }
    results
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Clone)]
/// Builder for [`SmsRelay`].
///
/// Registers gateways and sets the default gateway list, ordering strategy, timeout and
/// user-agent. Without [`SmsRelayBuilder::default_gateways`] every registered gateway is a
/// default, in registration order.
pub struct SmsRelayBuilder {
    gateways: Vec<Arc<dyn Gateway>>,
    default_gateways: Vec<String>,
    strategy: Arc<dyn Strategy>,
    timeout: Duration,
    user_agent: Option<String>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl SmsRelayBuilder {
    /// Create a builder with no gateways, [`OrderStrategy`] and a 5 second timeout.
    pub fn new() -> Self {
        Self {
            gateways: Vec::new(),
            default_gateways: Vec::new(),
            strategy: Arc::new(OrderStrategy),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            transport: None,
        }
    }

    /// Register a gateway under [`Gateway::name`]. A later gateway with the same name replaces
    /// the earlier one.
    pub fn gateway(mut self, gateway: impl Gateway + 'static) -> Self {
        let gateway: Arc<dyn Gateway> = Arc::new(gateway);
        match self
            .gateways
            .iter()
            .position(|it| it.name() == gateway.name())
        {
            Some(index) => self.gateways[index] = gateway,
            None => self.gateways.push(gateway),
        }
        self
    }

    /// Gateways tried when neither the call nor the message names any.
    pub fn default_gateways<I, S>(mut self, gateways: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_gateways = gateways.into_iter().map(Into::into).collect();
        self
    }

    /// Ordering used when the message carries no strategy. Defaults to [`OrderStrategy`].
    pub fn strategy(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategy = Arc::new(strategy);
        self
    }

    /// Per-request timeout of the built-in HTTP client (default 5 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the HTTP `User-Agent` header of the built-in HTTP client.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Send through `transport` instead of the built-in `reqwest` client. Timeout and
    /// user-agent settings are then the transport's responsibility.
    pub fn transport(mut self, transport: impl HttpTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Build a [`SmsRelay`], freezing the gateway registry.
    ///
    /// Fails with [`SmsRelayError::Transport`] when the built-in HTTP client cannot be created.
    pub fn build(self) -> Result<SmsRelay, SmsRelayError> {
        let http: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => {
                let mut builder = reqwest::Client::builder().timeout(self.timeout);
                if let Some(user_agent) = self.user_agent {
                    builder = builder.user_agent(user_agent);
                }
                let client = builder
                    .build()
                    .map_err(|err| SmsRelayError::Transport(Box::new(err)))?;
                Arc::new(ReqwestTransport::new(client))
            }
        };

        let names = self
            .gateways
            .iter()
            .map(|gateway| gateway.name().to_owned())
            .collect::<Vec<_>>();
        let default_gateways = if self.default_gateways.is_empty() {
            names.clone()
        } else {
            self.default_gateways
        };
        let registry = self
            .gateways
            .into_iter()
            .map(|gateway| (gateway.name().to_owned(), gateway))
            .collect::<HashMap<_, _>>();

        Ok(SmsRelay {
            registry: Arc::new(registry),
            names: Arc::new(names),
            default_gateways: Arc::new(default_gateways),
            strategy: self.strategy,
            http,
        })
    }
}

impl Default for SmsRelayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SmsRelayBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsRelayBuilder")
            .field(
                "gateways",
                &self.gateways.iter().map(|it| it.name()).collect::<Vec<_>>(),
            )
            .field("default_gateways", &self.default_gateways)
            .field("strategy", &self.strategy)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
/// SMS dispatcher with ordered failover.
///
/// Gateways are tried one at a time until one accepts the message; at most one attempt is
/// made per gateway and call. The registry is frozen at [`SmsRelayBuilder::build`], so clones
/// are cheap and can be shared across tasks.
///
/// ```rust,no_run
/// use smsrelay::{AliyunGateway, Message, SmsRelay, YunpianGateway};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let relay = SmsRelay::builder()
///     .gateway(AliyunGateway::new("key-id", "key-secret", "Relay")?)
///     .gateway(YunpianGateway::new("api-key", "【Relay】")?)
///     .build()?;
///
/// let message = Message::new()
///     .content("your code is 6379")
///     .template("SMS_271311117")
///     .data([("code", "6379")]);
/// let results = relay.send(13800138000_u64, &message).await?;
/// println!("{}", results[results.len() - 1]);
/// # Ok(())
/// # }
/// ```
pub struct SmsRelay {
    registry: Arc<HashMap<String, Arc<dyn Gateway>>>,
    names: Arc<Vec<String>>,
    default_gateways: Arc<Vec<String>>,
    strategy: Arc<dyn Strategy>,
    http: Arc<dyn HttpTransport>,
}

impl SmsRelay {
    /// Start building a relay.
    pub fn builder() -> SmsRelayBuilder {
        SmsRelayBuilder::new()
    }

    /// Look up a registered gateway by exact name.
    pub fn gateway(&self, name: &str) -> Result<&dyn Gateway, GatewayError> {
        self.registry
            .get(name)
            .map(|gateway| gateway.as_ref())
            .ok_or_else(|| GatewayError::NotFound {
                name: name.to_owned(),
            })
    }

    /// Registered gateway names, in registration order.
    pub fn gateway_names(&self) -> &[String] {
        &self.names
    }

    /// Gateways tried when neither the call nor the message names any.
    pub fn default_gateways(&self) -> &[String] {
        &self.default_gateways
    }

    /// Send `message` to `to`, choosing gateways from the message or the defaults.
    ///
    /// `to` may be a [`PhoneNumber`], an unsigned or signed integer, or a numeric string.
    /// Integer literals beyond the `i32` range need a suffix (`13800138000_u64`).
    ///
    /// Returns every attempt up to and including the first success. When no gateway succeeds
    /// the attempts are returned inside [`SmsRelayError::GatewaysFailed`].
    pub async fn send(
        &self,
        to: impl Into<Destination>,
        message: &Message,
    ) -> Result<Vec<SendResult>, SmsRelayError> {
        self.send_via(to, message, &[]).await
    }

    /// Like [`SmsRelay::send`], but a non-empty `gateways` overrides the message's and the
    /// default gateway lists.
    pub async fn send_via(
        &self,
        to: impl Into<Destination>,
        message: &Message,
        gateways: &[&str],
    ) -> Result<Vec<SendResult>, SmsRelayError> {
        let to = to.into().into_phone_number()?;

        let candidates = self.candidates(message, gateways);
        let ordered = match message.preferred_strategy() {
            Some(strategy) => strategy.apply(candidates),
            None => self.strategy.apply(candidates),
        };
        info!(to = %to.masked(), gateways = ?ordered, "dispatching message");

        let mut results = Vec::with_capacity(ordered.len());
        for name in &ordered {
            let result = self.attempt(name, &to, message).await;
            let delivered = result.is_success();
            results.push(result);
            if delivered {
                return Ok(results);
            }
        }

        warn!(
            to = %to.masked(),
            attempts = results.len(),
            "all gateways failed to send message"
        );
        Err(SmsRelayError::GatewaysFailed(results))
    }

    fn candidates(&self, message: &Message, gateways: &[&str]) -> Vec<String> {
        if !gateways.is_empty() {
            gateways.iter().map(|name| (*name).to_owned()).collect()
        } else if !message.gateways().is_empty() {
            message.gateways().to_vec()
        } else {
            self.default_gateways.to_vec()
        }
    }

    async fn attempt(&self, name: &str, to: &PhoneNumber, message: &Message) -> SendResult {
        let gateway = match self.gateway(name) {
            Ok(gateway) => gateway,
            Err(err) => {
                warn!(gateway = name, "gateway not found");
                return SendResult::failure(name, String::new(), err);
            }
        };

        let resolved = match message.resolve(gateway) {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(gateway = name, error = %err, "message could not be resolved");
                return SendResult::failure(name, String::new(), err.into());
            }
        };

        info!(
            gateway = name,
            to = %to.masked(),
            template = %resolved.template,
            "sending message"
        );
        match gateway.send(self.http.as_ref(), to, &resolved).await {
            Ok(response) => {
                info!(gateway = name, "message sent");
                SendResult::success(name, resolved.template, response)
            }
            Err(err) => {
                warn!(gateway = name, error = %err, "gateway failed to send message");
                SendResult::failure(name, resolved.template, err)
            }
        }
    }
}

impl fmt::Debug for SmsRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsRelay")
            .field("gateways", &self.names)
            .field("default_gateways", &self.default_gateways)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}
