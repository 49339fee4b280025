//! Domain layer: destinations, messages, strategies and attempt results (no I/O).

mod message;
mod response;
mod strategy;
mod validation;
mod value;

pub use message::{Field, Message, MessageError, ResolvedMessage, TemplateData};
pub use response::{SendResult, Status};
pub use strategy::{OrderStrategy, RandomStrategy, Strategy};
pub use validation::ValidationError;
pub(crate) use validation::non_empty;
pub use value::{Destination, PhoneNumber};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_resolution_feeds_attempt_results() {
        struct Named;

        impl crate::gateway::Gateway for Named {
            fn name(&self) -> &str {
                "aliyun"
            }

            fn send<'a>(
                &'a self,
                _http: &'a dyn crate::transport::HttpTransport,
                _to: &'a PhoneNumber,
                _message: &'a ResolvedMessage,
            ) -> crate::transport::BoxFuture<'a, Result<String, crate::gateway::GatewayError>>
            {
                Box::pin(async { Ok(String::new()) })
            }
        }

        let resolved = Message::new().template("SMS_1").resolve(&Named).unwrap();
        let result = SendResult::success("aliyun", resolved.template, "{}".to_owned());
        assert_eq!(result.status(), Status::Success);
        assert_eq!(result.template, "SMS_1");
    }

    #[test]
    fn strategies_are_usable_as_trait_objects() {
        let strategies: [&dyn Strategy; 2] = [&OrderStrategy, &RandomStrategy];
        for strategy in strategies {
            let mut out = strategy.apply(vec!["b".to_owned(), "a".to_owned()]);
            out.sort();
            assert_eq!(out, ["a", "b"]);
        }
    }
}
