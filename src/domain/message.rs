use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::domain::strategy::Strategy;
use crate::gateway::Gateway;

/// Template parameters, keyed by parameter name.
pub type TemplateData = BTreeMap<String, String>;

type Resolver<T> =
    Arc<dyn Fn(&dyn Gateway) -> Result<T, Box<dyn StdError + Send + Sync>> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// A field holds a value of a shape the message cannot use.
    #[error("message field `{field}` must be {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    /// A derived field refused to produce a value for the gateway.
    #[error("message field `{field}` could not be resolved for gateway `{gateway}`: {source}")]
    Derive {
        field: &'static str,
        gateway: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// One message field: absent, a literal value, or a function of the gateway about to send it.
pub enum Field<T> {
    Absent,
    Literal(T),
    Derived(Resolver<T>),
}

impl<T> Field<T> {
    /// The same value for every gateway.
    pub fn literal(value: impl Into<T>) -> Self {
        Self::Literal(value.into())
    }

    /// Compute the value from the gateway, typically by matching on [`Gateway::name`].
    pub fn derived<F>(resolve: F) -> Self
    where
        F: Fn(&dyn Gateway) -> T + Send + Sync + 'static,
    {
        Self::Derived(Arc::new(move |gateway| Ok(resolve(gateway))))
    }

    /// Like [`Field::derived`], but the function may refuse a gateway.
    pub fn try_derived<F, E>(resolve: F) -> Self
    where
        F: Fn(&dyn Gateway) -> Result<T, E> + Send + Sync + 'static,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self::Derived(Arc::new(move |gateway| resolve(gateway).map_err(Into::into)))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl<T: Clone + Default> Field<T> {
    fn resolve(&self, field: &'static str, gateway: &dyn Gateway) -> Result<T, MessageError> {
        match self {
            Self::Absent => Ok(T::default()),
            Self::Literal(value) => Ok(value.clone()),
            Self::Derived(resolve) => resolve(gateway).map_err(|source| MessageError::Derive {
                field,
                gateway: gateway.name().to_owned(),
                source,
            }),
        }
    }
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T: Clone> Clone for Field<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Absent => Self::Absent,
            Self::Literal(value) => Self::Literal(value.clone()),
            Self::Derived(resolve) => Self::Derived(Arc::clone(resolve)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("Absent"),
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

impl From<&str> for Field<String> {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_owned())
    }
}

impl From<String> for Field<String> {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl From<TemplateData> for Field<TemplateData> {
    fn from(value: TemplateData) -> Self {
        Self::Literal(value)
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Field<TemplateData>
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(value: [(K, V); N]) -> Self {
        Self::Literal(
            value
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Default)]
/// Vendor-agnostic message definition.
///
/// Each of `content`, `template`, `data` and `type` is resolved separately for every gateway
/// the message is attempted on, so a single message can carry per-vendor template ids.
///
/// ```rust
/// use smsrelay::{Field, Message};
///
/// let message = Message::new()
///     .template(Field::derived(|gateway| match gateway.name() {
///         "aliyun" => "SMS_271311117".to_owned(),
///         _ => "5532011".to_owned(),
///     }))
///     .data([("code", "6379")]);
/// assert!(message.gateways().is_empty());
/// ```
pub struct Message {
    content: Field<String>,
    template: Field<String>,
    data: Field<TemplateData>,
    message_type: Field<String>,
    gateways: Vec<String>,
    strategy: Option<Arc<dyn Strategy>>,
}

impl Message {
    /// Plain text message type.
    pub const TEXT: &'static str = "text";
    /// Voice message type.
    pub const VOICE: &'static str = "voice";

    /// Empty message: every field absent, no gateway list, no strategy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain-text body, used by gateways that send free text.
    pub fn content(mut self, content: impl Into<Field<String>>) -> Self {
        self.content = content.into();
        self
    }

    /// Vendor template id, used by template-based gateways.
    pub fn template(mut self, template: impl Into<Field<String>>) -> Self {
        self.template = template.into();
        self
    }

    /// Template parameters.
    pub fn data(mut self, data: impl Into<Field<TemplateData>>) -> Self {
        self.data = data.into();
        self
    }

    /// Message type, e.g. [`Message::TEXT`] or [`Message::VOICE`].
    pub fn message_type(mut self, message_type: impl Into<Field<String>>) -> Self {
        self.message_type = message_type.into();
        self
    }

    /// Restrict this message to the given gateways instead of the dispatcher defaults.
    pub fn with_gateways<I, S>(mut self, gateways: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gateways = gateways.into_iter().map(Into::into).collect();
        self
    }

    /// Order gateways with `strategy` instead of the dispatcher strategy.
    pub fn strategy(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    /// Build a message from a JSON object.
    ///
    /// Recognized keys: `content`, `template`, `type` (strings), `data` (object of strings or
    /// numbers) and `gateways` (array of strings). `null` counts as absent.
    pub fn from_json(value: &Value) -> Result<Self, MessageError> {
        let object = value.as_object().ok_or(MessageError::TypeMismatch {
            field: "message",
            expected: "a JSON object",
        })?;

        let mut message = Self::new();
        message.content = json_string_field(object.get("content"), "content")?;
        message.template = json_string_field(object.get("template"), "template")?;
        message.message_type = json_string_field(object.get("type"), "type")?;

        match object.get("data") {
            None | Some(Value::Null) => {}
            Some(Value::Object(entries)) => {
                let data = entries
                    .iter()
                    .map(|(key, value)| match value {
                        Value::String(text) => Ok((key.clone(), text.clone())),
                        Value::Number(number) => Ok((key.clone(), number.to_string())),
                        _ => Err(MessageError::TypeMismatch {
                            field: "data",
                            expected: "an object of strings",
                        }),
                    })
                    .collect::<Result<TemplateData, MessageError>>()?;
                message.data = Field::Literal(data);
            }
            Some(_) => {
                return Err(MessageError::TypeMismatch {
                    field: "data",
                    expected: "an object of strings",
                });
            }
        }

        match object.get("gateways") {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                message.gateways = items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_owned)
                            .ok_or(MessageError::TypeMismatch {
                                field: "gateways",
                                expected: "an array of strings",
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
            }
            Some(_) => {
                return Err(MessageError::TypeMismatch {
                    field: "gateways",
                    expected: "an array of strings",
                });
            }
        }

        Ok(message)
    }

    /// Gateways this message asks for; empty means no preference.
    pub fn gateways(&self) -> &[String] {
        &self.gateways
    }

    pub fn preferred_strategy(&self) -> Option<&dyn Strategy> {
        self.strategy.as_deref()
    }

    pub fn resolve_content(&self, gateway: &dyn Gateway) -> Result<String, MessageError> {
        self.content.resolve("content", gateway)
    }

    pub fn resolve_template(&self, gateway: &dyn Gateway) -> Result<String, MessageError> {
        self.template.resolve("template", gateway)
    }

    pub fn resolve_data(&self, gateway: &dyn Gateway) -> Result<TemplateData, MessageError> {
        self.data.resolve("data", gateway)
    }

    pub fn resolve_type(&self, gateway: &dyn Gateway) -> Result<String, MessageError> {
        self.message_type.resolve("type", gateway)
    }

    /// Resolve every field for `gateway`, template first.
    pub fn resolve(&self, gateway: &dyn Gateway) -> Result<ResolvedMessage, MessageError> {
        Ok(ResolvedMessage {
            template: self.resolve_template(gateway)?,
            content: self.resolve_content(gateway)?,
            data: self.resolve_data(gateway)?,
            message_type: self.resolve_type(gateway)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// A [`Message`] with every field resolved for one gateway.
pub struct ResolvedMessage {
    pub content: String,
    pub template: String,
    pub data: TemplateData,
    pub message_type: String,
}

impl ResolvedMessage {
    pub fn has_template(&self) -> bool {
        !self.template.is_empty()
    }
}

fn json_string_field(
    value: Option<&Value>,
    field: &'static str,
) -> Result<Field<String>, MessageError> {
    match value {
        None | Some(Value::Null) => Ok(Field::Absent),
        Some(Value::String(text)) => Ok(Field::Literal(text.clone())),
        Some(_) => Err(MessageError::TypeMismatch {
            field,
            expected: "a string",
        }),
    }
}
