use std::net::SocketAddr;

use wordsteacher_backend::config::Config;
use wordsteacher_backend::logging::{init_tracing, LogSettings};
use wordsteacher_backend::state::AppState;
use wordsteacher_backend::{build_app, open_store};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&LogSettings::from_env(&config.log_level));

    if config.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET is not set, authenticated routes will reject every request");
    }

    let store = match open_store().await {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(error = %err, "failed to open document store");
            std::process::exit(1);
        }
    };
    tracing::info!(backend = store.backend_name(), "document store ready");

    let addr = config.bind_addr();
    let app = build_app(AppState::new(config, store));

    tracing::info!(%addr, "wordsteacher backend listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind listener failed");

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
