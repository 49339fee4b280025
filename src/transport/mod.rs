//! Transport layer: the HTTP collaborator gateways send their requests through.

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;

use url::Url;

/// Boxed future returned by object-safe async traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error raised by an [`HttpTransport`] (DNS, TLS, timeouts, invalid URLs, ...).
pub type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// `application/x-www-form-urlencoded` parameters.
    Form(Vec<(String, String)>),
    /// Pre-serialized JSON; the caller sets the `Content-Type` header.
    Json(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single outgoing vendor request.
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, params: Vec<(String, String)>) -> Self {
        self.query = params;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn form(mut self, params: Vec<(String, String)>) -> Self {
        self.body = Some(Body::Form(params));
        self
    }

    pub fn json(mut self, payload: impl Into<String>) -> Self {
        self.body = Some(Body::Json(payload.into()));
        self
    }

    /// Value of the first query parameter named `name`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        find_param(&self.query, name)
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Value of the first form parameter named `name`.
    pub fn form_param(&self, name: &str) -> Option<&str> {
        match &self.body {
            Some(Body::Form(params)) => find_param(params, name),
            _ => None,
        }
    }
}

fn find_param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Issues one request and returns the raw response. Implementations must not retry.
pub trait HttpTransport: Send + Sync {
    fn execute<'a>(&'a self, request: HttpRequest) -> BoxFuture<'a, Result<HttpResponse, BoxError>>;
}

#[derive(Debug, Clone)]
/// [`HttpTransport`] backed by a `reqwest` client; timeouts come from the client.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute<'a>(&'a self, request: HttpRequest) -> BoxFuture<'a, Result<HttpResponse, BoxError>> {
        Box::pin(async move {
            let url = if request.query.is_empty() {
                Url::parse(&request.url)?
            } else {
                Url::parse_with_params(&request.url, &request.query)?
            };

            let mut builder = match request.method {
                Method::Get => self.client.get(url),
                Method::Post => self.client.post(url),
            };
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder = match request.body {
                Some(Body::Form(params)) => builder.form(&params),
                Some(Body::Json(payload)) => builder.body(payload),
                None => builder,
            };

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(HttpResponse { status, body })
        })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records every request and replays canned responses in order.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct FakeTransport {
        state: Arc<Mutex<FakeTransportState>>,
    }

    #[derive(Debug, Default)]
    struct FakeTransportState {
        requests: Vec<HttpRequest>,
        responses: VecDeque<Result<HttpResponse, String>>,
    }

    impl FakeTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn respond(self, status: u16, body: impl Into<String>) -> Self {
            self.state
                .lock()
                .unwrap()
                .responses
                .push_back(Ok(HttpResponse {
                    status,
                    body: body.into(),
                }));
            self
        }

        pub(crate) fn fail(self, message: impl Into<String>) -> Self {
            self.state
                .lock()
                .unwrap()
                .responses
                .push_back(Err(message.into()));
            self
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.state.lock().unwrap().requests.clone()
        }

        pub(crate) fn last_request(&self) -> HttpRequest {
            self.requests().pop().expect("no request was sent")
        }
    }

    impl HttpTransport for FakeTransport {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> BoxFuture<'a, Result<HttpResponse, BoxError>> {
            Box::pin(async move {
                let next = {
                    let mut state = self.state.lock().unwrap();
                    state.requests.push(request);
                    state.responses.pop_front()
                };
                match next {
                    Some(Ok(response)) => Ok(response),
                    Some(Err(message)) => Err(message.into()),
                    None => Err("no canned response left".into()),
                }
            })
        }
    }
}
