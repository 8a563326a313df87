//! HTTP surface for dicomtree.
//!
//! | Route | Body | Response |
//! |---|---|---|
//! | `POST /api/parse` | `{ rootPaths, deep }` | chunked stream of record frames |
//! | `POST /api/dirs` | `{ paths }` | `{ folders, files }` |
//! | `POST /api/exists` | `{ path }` | `true` / `false` |
//! | `GET /file/*path?filename=` | | file bytes |

mod config;
mod error;
mod file;
mod routes;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::ServerError;
pub use routes::{AppState, router};

/// Bind `config.addr` and serve until `shutdown` resolves.
pub async fn serve<F>(config: ServerConfig, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.addr;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let app = router(AppState::new(config)?);

    info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)
}
