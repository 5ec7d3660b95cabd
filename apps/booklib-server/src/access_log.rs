use axum::extract::{MatchedPath, State};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use booklib_otel::{AccessLogConfig, ACCESS_TARGET};
use sha2::Digest as _;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn first_forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
    let ip = raw.split(',').next()?.trim();
    (!ip.is_empty()).then(|| ip.to_string())
}

fn user_agent(cfg: &AccessLogConfig, headers: &HeaderMap) -> Option<String> {
    if !(cfg.ua || cfg.ua_hash) {
        return None;
    }
    let ua = headers
        .get(axum::http::header::USER_AGENT)?
        .to_str()
        .ok()?;
    if cfg.ua_hash {
        let mut hasher = sha2::Sha256::new();
        hasher.update(ua.as_bytes());
        Some(hex::encode(hasher.finalize()))
    } else {
        Some(ua.to_string())
    }
}

/// One `http.access` event per sampled request when the access log is enabled.
pub async fn access_log_mw(
    State(cfg): State<Arc<AccessLogConfig>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if !cfg.enabled {
        return next.run(req).await;
    }
    let started = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let forwarded = if cfg.trust_forward {
        first_forwarded_ip(req.headers())
    } else {
        None
    };
    let remote = forwarded.or_else(|| {
        req.extensions()
            .get::<axum::extract::ConnectInfo<SocketAddr>>()
            .map(|c| c.0.ip().to_string())
    });
    let ua = user_agent(&cfg, req.headers());
    let res = next.run(req).await;
    let n = COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    if !cfg.sampled(n) {
        return res;
    }
    tracing::info!(
        target: ACCESS_TARGET,
        method = %method,
        path = %path,
        status = res.status().as_u16(),
        dur_ms = started.elapsed().as_millis() as u64,
        remote = remote.as_deref().unwrap_or("-"),
        ua = ua.as_deref().unwrap_or("-"),
        "request"
    );
    res
}
