use std::fmt;

use crate::gateway::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Failure,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
/// Outcome of one gateway attempt.
pub struct SendResult {
    pub gateway: String,
    /// Template resolved for this gateway; empty when resolution failed or never ran.
    pub template: String,
    /// Raw vendor response body on success.
    pub outcome: Result<String, GatewayError>,
}

impl SendResult {
    pub(crate) fn success(gateway: &str, template: String, response: String) -> Self {
        Self {
            gateway: gateway.to_owned(),
            template,
            outcome: Ok(response),
        }
    }

    pub(crate) fn failure(gateway: &str, template: String, error: GatewayError) -> Self {
        Self {
            gateway: gateway.to_owned(),
            template,
            outcome: Err(error),
        }
    }

    pub fn status(&self) -> Status {
        match self.outcome {
            Ok(_) => Status::Success,
            Err(_) => Status::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn response(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn error(&self) -> Option<&GatewayError> {
        self.outcome.as_ref().err()
    }
}

impl fmt::Display for SendResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gateway: {}, status: {}, template: {}",
            self.gateway,
            self.status(),
            self.template
        )?;
        if let Err(err) = &self.outcome {
            write!(f, ", error: {err}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_exposes_response() {
        let result = SendResult::success("aliyun", "SMS_1".to_owned(), "{}".to_owned());
        assert_eq!(result.status(), Status::Success);
        assert!(result.is_success());
        assert_eq!(result.response(), Some("{}"));
        assert!(result.error().is_none());
        assert_eq!(
            result.to_string(),
            "gateway: aliyun, status: success, template: SMS_1"
        );
    }

    #[test]
    fn failure_display_includes_error() {
        let result = SendResult::failure(
            "submail",
            String::new(),
            GatewayError::NotFound {
                name: "submail".to_owned(),
            },
        );
        assert_eq!(result.status(), Status::Failure);
        assert_eq!(result.response(), None);
        assert_eq!(
            result.to_string(),
            "gateway: submail, status: failure, template: , error: gateway not found: submail"
        );
    }
}
