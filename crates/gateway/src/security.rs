//! CORS policy and the security-header response layer (spec §4.3).

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, Request};
use axum::middleware::Next;
use axum::response::Response;
use orch_ratelimit::RateLimiter;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::state::AppState;

/// Pull the client IP out of request headers per spec §4.2's extraction
/// order, falling back to the transport peer address.
pub fn extract_client_ip(headers: &HeaderMap, peer_ip: &str) -> String {
    let forwarded_for = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok());
    let real_ip = headers.get("x-real-ip").and_then(|v| v.to_str().ok());
    RateLimiter::extract_client_ip(forwarded_for, real_ip, peer_ip)
}

/// One configured CORS origin entry: either an exact match, or a
/// `host:*` wildcard-port match (e.g. `http://localhost:*`).
enum OriginRule {
    Exact(HeaderValue),
    WildcardPort(String),
}

impl OriginRule {
    fn parse(raw: &str) -> Option<Self> {
        match raw.strip_suffix('*') {
            Some(prefix) => Some(OriginRule::WildcardPort(prefix.to_string())),
            None => raw.parse::<HeaderValue>().ok().map(OriginRule::Exact),
        }
    }

    fn matches(&self, origin: &HeaderValue, origin_str: &str) -> bool {
        match self {
            OriginRule::Exact(allowed) => allowed.as_bytes() == origin.as_bytes(),
            OriginRule::WildcardPort(prefix) => origin_str
                .strip_prefix(prefix.as_str())
                .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())),
        }
    }
}

/// Build a [`CorsLayer`] from the configured allowed origins. Origins may
/// carry a trailing `:*` wildcard port; a literal `"*"` allows all origins
/// and disables credentialed CORS, since the two are mutually exclusive.
pub fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    use axum::http::header;

    if allowed_origins.len() == 1 && allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    let rules: Vec<OriginRule> = allowed_origins
        .iter()
        .filter_map(|raw| {
            let rule = OriginRule::parse(raw);
            if rule.is_none() {
                tracing::warn!(origin = %raw, "invalid CORS origin, skipping");
            }
            rule
        })
        .collect();

    let allow_origin = if rules.iter().any(|r| matches!(r, OriginRule::WildcardPort(_))) {
        AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            rules.iter().any(|rule| rule.matches(origin, origin_str))
        })
    } else {
        let exact = rules
            .into_iter()
            .map(|rule| match rule {
                OriginRule::Exact(hv) => hv,
                OriginRule::WildcardPort(_) => unreachable!("filtered out above"),
            })
            .collect::<Vec<_>>();
        AllowOrigin::list(exact)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// `axum::middleware::from_fn_with_state` layer: the generic request
/// checks from spec §4.3 (size, header count/size, query param count,
/// content type, user-agent blocklist), enforced once ahead of rate
/// limiting so a malformed request never consumes a rate-limit slot.
/// Per-field pattern scanning (SQL/XSS/path-traversal/command injection)
/// stays in each handler, since only the handler knows which fields
/// carry user-controlled text.
pub async fn validation_layer(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let validator = &state.validator;
    let path = request.uri().path().to_string();
    let client_ip = extract_client_ip(request.headers(), "unknown");

    let reject = |reason: orch_validate::RejectReason| -> Response {
        let message = validator.to_error(&client_ip, &path, reason).client_message().to_string();
        crate::api::error_response(reason.status_code(), message)
    };

    let header_count = request.headers().len();
    let max_header_value_len = request.headers().values().map(|v| v.len()).max().unwrap_or(0);
    if let Err(reason) = validator.check_headers(header_count, max_header_value_len) {
        return reject(reason);
    }

    let query_param_count = request
        .uri()
        .query()
        .map(|q| q.split('&').filter(|s| !s.is_empty()).count())
        .unwrap_or(0);
    if let Err(reason) = validator.check_query_params(query_param_count) {
        return reject(reason);
    }

    let user_agent = request.headers().get(axum::http::header::USER_AGENT).and_then(|v| v.to_str().ok());
    if let Err(reason) = validator.check_user_agent(user_agent) {
        return reject(reason);
    }

    let is_websocket_upgrade = request
        .headers()
        .get(axum::http::header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);

    if !is_websocket_upgrade {
        let content_type = request.headers().get(axum::http::header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
        if let Err(reason) = validator.check_content_type(content_type) {
            return reject(reason);
        }

        let body_len = request
            .headers()
            .get(axum::http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let is_json = content_type.map(|ct| ct.starts_with("application/json")).unwrap_or(false);
        if let Err(reason) = validator.check_size(body_len, is_json) {
            return reject(reason);
        }
    }

    next.run(request).await
}

/// `axum::middleware::from_fn_with_state` layer: stamps the spec §4.3
/// security header set onto every non-websocket response.
pub async fn security_headers_layer(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let is_websocket_upgrade = request
        .headers()
        .get(axum::http::header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);

    let is_tls = request
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("https"))
        .unwrap_or(false);

    let mut response = next.run(request).await;
    let headers = orch_validate::security_headers(
        &state.config.validation,
        is_tls,
        is_websocket_upgrade,
        true,
    );
    for header in headers {
        if let Ok(value) = HeaderValue::from_str(&header.value) {
            response.headers_mut().insert(header.name, value);
        }
    }
    response
}
