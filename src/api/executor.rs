use std::time::{Duration, Instant};

use reqwest::{Client, Response, StatusCode, Url};
use storefront_api_types::ErrorBody;
use tracing::{debug, warn};

use super::endpoints::{EndpointSpec, RequestSpec};
use super::error::ApiError;
use super::resource::Resource;
use crate::session::SessionMirror;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Issues backend calls for registry endpoints.
///
/// Attaches the bearer token of whatever session the mirror holds at send
/// time and normalizes every failure into an [`ApiError`].
#[derive(Clone, Debug)]
pub struct RequestExecutor {
    client: Client,
    base: Url,
    session: SessionMirror,
}

impl RequestExecutor {
    pub fn new(base: Url, timeout: Duration, session: SessionMirror) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base: normalize_base(base),
            session,
        })
    }

    pub fn with_defaults(base: Url, session: SessionMirror) -> Result<Self, ApiError> {
        Self::new(base, DEFAULT_TIMEOUT, session)
    }

    pub fn user_agent() -> &'static str {
        concat!("storefront/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn session(&self) -> &SessionMirror {
        &self.session
    }

    /// Base URL plus the endpoint's segments, each percent-encoded on its
    /// own so `/`, `?` and dot segments inside an id stay literal.
    pub fn url(&self, spec: &RequestSpec) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                ApiError::network(format!("base url {} cannot carry a path", self.base))
            })?;
            path.pop_if_empty();
            for segment in &spec.segments {
                path.push(escape_dot_segment(segment));
            }
        }
        if !spec.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &spec.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    pub async fn execute<E>(&self, endpoint: &E) -> Result<Resource, ApiError>
    where
        E: EndpointSpec + ?Sized,
    {
        let spec = endpoint.request()?;
        let url = self.url(&spec)?;
        let started = Instant::now();

        let mut request = self.client.request(spec.method.clone(), url);
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| {
            warn!(
                endpoint = spec.name,
                error = %err,
                "Request failed before a response arrived"
            );
            ApiError::network(err.to_string())
        })?;

        let status = response.status();
        let result = Self::handle(&spec, response).await;
        debug!(
            endpoint = spec.name,
            method = %spec.method,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Request completed"
        );
        result
    }

    async fn handle(spec: &RequestSpec, response: Response) -> Result<Resource, ApiError> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::network(err.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .map(|body| body.message)
                .unwrap_or_else(|_| generic_message(status));
            return Err(if status == StatusCode::UNAUTHORIZED {
                ApiError::unauthorized(message)
            } else {
                ApiError::api(status.as_u16(), message)
            });
        }

        Resource::decode(spec.shape, &bytes).map_err(|err| {
            ApiError::decode(format!("unexpected {} response: {err}", spec.name))
        })
    }
}

fn generic_message(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("request failed with status {} {reason}", status.as_u16()),
        None => format!("request failed with status {}", status.as_u16()),
    }
}

/// `.` and `..` are dropped by the path setter; encode them so they reach
/// the backend as ordinary ids.
fn escape_dot_segment(segment: &str) -> &str {
    match segment {
        "." => "%2E",
        ".." => "%2E%2E",
        other => other,
    }
}

/// Keeps the base path a directory so endpoint segments land below it.
fn normalize_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Query;

    fn executor(base: &str) -> RequestExecutor {
        RequestExecutor::with_defaults(
            Url::parse(base).expect("valid url"),
            SessionMirror::default(),
        )
        .expect("client")
    }

    #[test]
    fn url_keeps_base_path_prefix() {
        let executor = executor("http://shop.local/backend");
        let spec = Query::product("42").request().expect("spec");
        assert_eq!(
            executor.url(&spec).expect("url").as_str(),
            "http://shop.local/backend/api/products/42"
        );
    }

    #[test]
    fn url_encodes_query_pairs() {
        let executor = executor("http://shop.local/");
        let spec = Query::list_products("red shoes", Some(1)).request().expect("spec");
        assert_eq!(
            executor.url(&spec).expect("url").as_str(),
            "http://shop.local/api/products?keyword=red+shoes&pageNumber=1"
        );
    }

    #[test]
    fn ids_cannot_escape_their_segment() {
        let executor = executor("http://shop.local/");

        let spec = Query::product("../users").request().expect("spec");
        let url = executor.url(&spec).expect("url");
        assert_eq!(url.path(), "/api/products/..%2Fusers");

        let spec = Query::order("a?b").request().expect("spec");
        let url = executor.url(&spec).expect("url");
        assert_eq!(url.path(), "/api/orders/a%3Fb");
        assert_eq!(url.query(), None);

        let spec = Query::product("..").request().expect("spec");
        let url = executor.url(&spec).expect("url");
        assert_ne!(url.path(), "/api/products");
        assert_eq!(url.path_segments().map(Iterator::count), Some(3));
    }

    #[test]
    fn user_agent_names_the_crate() {
        assert!(RequestExecutor::user_agent().starts_with("storefront/"));
    }

    #[test]
    fn generic_message_uses_reason_phrase() {
        assert_eq!(
            generic_message(StatusCode::INTERNAL_SERVER_ERROR),
            "request failed with status 500 Internal Server Error"
        );
    }
}
