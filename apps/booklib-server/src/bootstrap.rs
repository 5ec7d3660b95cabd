use std::path::{Path, PathBuf};
use std::sync::Arc;

use booklib_kernel::Kernel;
use booklib_otel::AccessLogConfig;

use crate::{access_log, router, AppState};

pub(crate) struct BootstrapOutput {
    pub router: axum::Router<AppState>,
    pub state: AppState,
}

/// Open the book store under `state_dir` and assemble routes and state.
/// Fails on unusable `BOOKLIB_SQLITE_*` values as well as I/O errors.
pub(crate) fn build(state_dir: &Path) -> anyhow::Result<BootstrapOutput> {
    let kernel = Kernel::open(state_dir)?;
    let (router, endpoints) = router::build_router();
    let state = AppState::new(kernel).with_endpoints(endpoints);
    Ok(BootstrapOutput { router, state })
}

pub(crate) fn attach_http_layers(
    router: axum::Router<()>,
    concurrency_limit: usize,
) -> axum::Router<()> {
    use tower::limit::ConcurrencyLimitLayer;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(concurrency_limit))
}

pub(crate) fn attach_global_layers(
    router: axum::Router<()>,
    access: AccessLogConfig,
) -> axum::Router<()> {
    router.layer(axum::middleware::from_fn_with_state(
        Arc::new(access),
        access_log::access_log_mw,
    ))
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum HttpConfigError {
    #[error("invalid BOOKLIB_HTTP_MAX_CONC: {0}")]
    InvalidConcurrency(String),
    #[error("invalid BOOKLIB_PORT: {0}")]
    InvalidPort(String),
    #[error("invalid BOOKLIB_BIND: {0}")]
    InvalidBind(String),
}

#[derive(Debug)]
pub(crate) struct HttpConfig {
    pub addr: std::net::SocketAddr,
    pub concurrency_limit: usize,
}

pub(crate) fn http_config_from_env() -> Result<HttpConfig, HttpConfigError> {
    let concurrency_limit = std::env::var("BOOKLIB_HTTP_MAX_CONC")
        .ok()
        .map(|raw| match raw.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(HttpConfigError::InvalidConcurrency(raw)),
        })
        .transpose()? // Option<Result> -> Result<Option>
        .unwrap_or(1024);

    let bind = std::env::var("BOOKLIB_BIND").unwrap_or_else(|_| "127.0.0.1".into());
    let port_raw = std::env::var("BOOKLIB_PORT").unwrap_or_else(|_| "8080".into());
    let port: u16 = port_raw
        .parse()
        .map_err(|_| HttpConfigError::InvalidPort(port_raw))?;

    let addr = format!("{}:{}", bind, port)
        .parse()
        .map_err(|_| HttpConfigError::InvalidBind(bind.clone()))?;

    Ok(HttpConfig {
        addr,
        concurrency_limit,
    })
}

pub(crate) fn state_dir_from_env() -> PathBuf {
    std::env::var("BOOKLIB_STATE_DIR")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("state"))
}
