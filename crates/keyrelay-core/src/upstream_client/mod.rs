use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use wreq::{Client, Method, Proxy};

use keyrelay_common::GlobalConfig;
use keyrelay_provider_core::{
    Headers, HttpMethod, UpstreamFailure, UpstreamHttpRequest, UpstreamHttpResponse,
    UpstreamTransportErrorKind,
};

/// Performs exactly one outbound call per request; no retries.
pub trait UpstreamClient: Send + Sync {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>;
}

#[derive(Debug, Clone)]
pub struct UpstreamClientConfig {
    pub proxy: Option<String>,
    pub connect_timeout: Duration,
    /// `None` leaves the total request time unbounded.
    pub request_timeout: Option<Duration>,
}

impl UpstreamClientConfig {
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            proxy: global.proxy.clone(),
            request_timeout: global.request_timeout_secs.map(Duration::from_secs),
            ..Self::default()
        }
    }
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
        }
    }
}

/// `wreq`-backed client; the whole body is buffered before returning.
#[derive(Clone)]
pub struct WreqUpstreamClient {
    client: Client,
}

impl WreqUpstreamClient {
    pub fn new(config: UpstreamClientConfig) -> Result<Self, wreq::Error> {
        let mut builder = Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(egress) = egress_proxy(config.proxy.as_deref()) {
            builder = builder.proxy(Proxy::all(egress)?);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn execute(&self, req: UpstreamHttpRequest) -> Result<UpstreamHttpResponse, wreq::Error> {
        let builder = req.headers.iter().fold(
            self.client.request(to_wreq_method(req.method), &req.url),
            |builder, (name, value)| builder.header(name.as_str(), value.as_str()),
        );
        let builder = match req.body {
            Some(body) => builder.body(body),
            None => builder,
        };

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let headers: Headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = resp.bytes().await?;
        Ok(UpstreamHttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn egress_proxy(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|item| !item.is_empty())
}

impl UpstreamClient for WreqUpstreamClient {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>
    {
        Box::pin(async move {
            self.execute(req).await.map_err(|err| UpstreamFailure {
                kind: transport_error_kind(&err),
                message: err.to_string(),
            })
        })
    }
}

fn to_wreq_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn transport_error_kind(err: &wreq::Error) -> UpstreamTransportErrorKind {
    if err.is_timeout() {
        return UpstreamTransportErrorKind::Timeout;
    }
    let text = err.to_string().to_ascii_lowercase();
    let mentions = |needles: &[&str]| needles.iter().any(|needle| text.contains(needle));
    if mentions(&["tls", "ssl", "certificate"]) {
        UpstreamTransportErrorKind::Tls
    } else if err.is_connect() && mentions(&["dns", "resolve"]) {
        UpstreamTransportErrorKind::Dns
    } else if err.is_connect() {
        UpstreamTransportErrorKind::Connect
    } else {
        UpstreamTransportErrorKind::Other
    }
}
