//! Request forwarding.
//!
//! # Responsibilities
//! - Resolve the request path against the current route table
//! - Rewrite the request for the upstream and send it once
//! - Report exactly one outcome per request to the stats tracker
//!
//! # Design Decisions
//! - No retries: a single upstream attempt per request
//! - The route store lock is released before the upstream call starts
//! - Any upstream response, whatever its status, counts as a success;
//!   only failures to obtain a response count as failures
//! - Bodies stream in both directions without buffering
//! - Routing and counters use the percent-decoded path, matching how route
//!   keys are written in the table

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{
        header::{CONNECTION, HOST},
        HeaderMap, HeaderName, HeaderValue, Version,
    },
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::http::request::request_id;
use crate::http::response::ProxyError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::{decode_path, parse_upstream, resolve, UpstreamTarget};
use crate::stats::Outcome;

/// Pooled HTTP/HTTPS client used for every upstream call.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Build the upstream client.
pub fn build_client(timeouts: &TimeoutConfig) -> Result<UpstreamClient, rustls::Error> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_nodelay(true);
    if timeouts.connect_secs > 0 {
        http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
    }

    let https = HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http);

    Ok(Client::builder(TokioExecutor::new()).build(https))
}

/// Catch-all handler: everything not served by the admin surface lands here.
pub async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = decode_path(request.uri().path()).into_owned();
    let request_id = request_id(&request);

    let (route, outcome) = forward(&state, request, &path).await;
    let stat_key = route.as_deref().unwrap_or(&path);
    let route_label = route.as_deref().unwrap_or(metrics::UNMATCHED);

    match outcome {
        Ok(response) => {
            let status = response.status().as_u16();
            state.stats.record(stat_key, Outcome::Success);
            metrics::record_request(method.as_str(), status, route_label, start);
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                route = %stat_key,
                status,
                duration_ms = start.elapsed().as_millis() as u64,
                "Proxied request"
            );
            response
        }
        Err(err) => {
            let status = err.status().as_u16();
            state.stats.record(stat_key, Outcome::Fail);
            metrics::record_request(method.as_str(), status, route_label, start);
            let duration_ms = start.elapsed().as_millis() as u64;
            match &err {
                ProxyError::NoRoute => tracing::warn!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    duration_ms,
                    "No route matched"
                ),
                _ => tracing::error!(
                    request_id = %request_id,
                    method = %method,
                    path = %path,
                    route = %stat_key,
                    error = %err,
                    duration_ms,
                    "Proxy request failed"
                ),
            }
            err.into_response()
        }
    }
}

/// Resolve and forward. Returns the matched route key (if any) with the result.
async fn forward(
    state: &AppState,
    request: Request,
    path: &str,
) -> (Option<String>, Result<Response, ProxyError>) {
    let table = match state.routes.current(state.reload).await {
        Ok(table) => table,
        Err(e) => return (None, Err(ProxyError::RoutesUnavailable(e))),
    };

    let (key, upstream, remainder) = match resolve(&table, path, state.match_mode) {
        Some(m) => (m.key.to_string(), m.upstream.to_string(), m.remainder.to_string()),
        None => return (None, Err(ProxyError::NoRoute)),
    };

    let result = dispatch(state, request, &upstream, &remainder).await;
    (Some(key), result)
}

async fn dispatch(
    state: &AppState,
    request: Request,
    upstream: &str,
    remainder: &str,
) -> Result<Response, ProxyError> {
    let invalid = || ProxyError::InvalidTarget(upstream.to_string());
    let url = parse_upstream(upstream).ok_or_else(invalid)?;
    let target = UpstreamTarget::new(&url, remainder, request.uri().query()).map_err(|_| invalid())?;

    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    let (mut parts, body) = request.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    if let Some(host) = target.host_header() {
        parts.headers.insert(HOST, host);
    }
    if let Some(ip) = client_ip {
        append_forwarded_for(&mut parts.headers, ip);
    }
    parts.uri = target.uri;
    parts.version = Version::HTTP_11;

    let call = state.client.request(Request::from_parts(parts, body));
    let response = match state.upstream_timeout {
        Some(deadline) => tokio::time::timeout(deadline, call)
            .await
            .map_err(|_| ProxyError::Timeout(deadline))?,
        None => call.await,
    }
    .map_err(ProxyError::Upstream)?;

    Ok(into_client_response(response))
}

fn into_client_response(response: axum::http::Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<String> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in HOP_BY_HOP.iter().copied().chain(named.iter().map(String::as_str)) {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) if !prior.trim().is_empty() => format!("{}, {}", prior, ip),
        _ => ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
