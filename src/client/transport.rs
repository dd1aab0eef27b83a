use axum::body::{Body, Bytes};
use http::{HeaderMap, Method, Request, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use thiserror::Error;
use tower::{BoxError, Service, ServiceExt};

#[derive(Debug, Clone, Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

/// A buffered outbound request. Buffering lets the interceptor replay it.
#[derive(Debug, Clone)]
pub struct ClientRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ClientRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Bytes::from(serde_json::to_vec(body)?);
        self.headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        Ok(self)
    }

    /// Path without query string.
    pub fn route(&self) -> &str {
        self.path.split('?').next().unwrap_or(&self.path)
    }
}

impl ClientResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Something that can carry a request to the server and back.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        request: ClientRequest,
    ) -> impl Future<Output = Result<ClientResponse, TransportError>> + Send;
}

/// Any tower service, such as an axum `Router`, used in-process.
#[derive(Clone)]
pub struct ServiceTransport<S> {
    service: S,
}

impl<S> ServiceTransport<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

impl<S> Transport for ServiceTransport<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
{
    async fn send(&self, request: ClientRequest) -> Result<ClientResponse, TransportError> {
        let mut builder = Request::builder().method(request.method).uri(&request.path);
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers);
        }
        let http_request = builder
            .body(Body::from(request.body))
            .map_err(|e| TransportError(e.to_string()))?;

        let response = self
            .service
            .clone()
            .oneshot(http_request)
            .await
            .map_err(|e| TransportError(Into::<BoxError>::into(e).to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(ClientResponse {
            status,
            headers,
            body,
        })
    }
}

/// Real network transport against a base URL.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let base_url = reqwest::Url::parse(base_url).map_err(|e| TransportError(e.to_string()))?;
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(Self { client, base_url })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ClientRequest) -> Result<ClientResponse, TransportError> {
        let url = self
            .base_url
            .join(&request.path)
            .map_err(|e| TransportError(e.to_string()))?;

        let response = self
            .client
            .request(request.method, url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(ClientResponse {
            status,
            headers,
            body,
        })
    }
}
