//! Siphon HTTP front end.
//!
//! Run with an optional YAML config path:
//!
//! ```text
//! siphon-server [config.yaml]
//! ```
//!
//! Routes:
//! - `GET /?url=<target>` (also `/resolve`) - resolve a media page URL
//! - `GET /cache/<file>`                    - downloaded media artifacts
//! - `GET /health`                          - liveness probe

use std::net::SocketAddr;
use std::sync::Arc;

use siphon::{Config, Siphon};
use siphon_backend::{Backend, FileBackend};

mod envelope;
mod routes;

pub(crate) struct AppState {
    pub(crate) config: Config,
    pub(crate) siphon: Siphon,
}

#[tokio::main]
async fn main() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,siphon=debug".into()),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).expect("Failed to load configuration"),
        None => Config::default(),
    };

    // Cache entries and rate state share one durable store under the cache
    // directory, so bans and resolutions survive a restart.
    let backend: Arc<dyn Backend> = Arc::new(
        FileBackend::new(config.cache.dir.join("state"))
            .await
            .expect("Failed to open state directory"),
    );
    let siphon = Siphon::new(&config, backend).expect("Failed to assemble pipeline");

    let listen = config.listen.clone();
    let state = Arc::new(AppState { config, siphon });
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .expect("Failed to bind listen address");
    tracing::info!("listening on http://{listen}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
