use std::net::SocketAddr;
use tracing::{error, info};

mod access_log;
mod api;
mod app_state;
mod books;
mod bootstrap;
mod error;
mod openapi;
mod responses;
mod router;
#[cfg(test)]
mod test_support;

pub(crate) use app_state::AppState;
pub(crate) use error::BookError;

#[tokio::main]
async fn main() {
    let access = booklib_otel::AccessLogConfig::from_env();
    booklib_otel::init(&access);

    let http_cfg = match bootstrap::http_config_from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };
    let state_dir = bootstrap::state_dir_from_env();
    let bootstrap::BootstrapOutput { router, state } = match bootstrap::build(&state_dir) {
        Ok(out) => out,
        Err(err) => {
            eprintln!("error: failed to open book store in {}: {err:#}", state_dir.display());
            std::process::exit(2);
        }
    };

    let app = bootstrap::attach_global_layers(
        bootstrap::attach_http_layers(router.with_state::<()>(state), http_cfg.concurrency_limit),
        access,
    );

    let listener = match tokio::net::TcpListener::bind(http_cfg.addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("error: failed to bind {}: {err}", http_cfg.addr);
            std::process::exit(2);
        }
    };
    info!(addr = %http_cfg.addr, state_dir = %state_dir.display(), "booklib listening");

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    if let Err(err) = server.await {
        error!("http server exited with error: {err}");
    }
    info!("server stopped");
}

async fn shutdown_signal() {
    info!("shutdown signal listener active");
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {err}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
}
