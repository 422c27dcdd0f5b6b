mod config;

mod app;
mod ctx;
mod db;
mod errors;
mod notes;
mod openapi;
mod shared;
mod state;
mod storage;

use std::net::SocketAddr;

use aide::axum::ApiRouter;
use app::AppParams;
pub use config::config;
pub use db::{init_db, DB};
pub use errors::{Error, Result};
use shared::tracing::{add_tracing_layer, setup_tracing};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> errors::Result<()> {
    let config = config();

    setup_tracing(config.log_json);

    let conn = init_db().await?;

    let (app, _api) = app::create(AppParams {
        db: conn,
        router: |state| ApiRouter::new().merge(notes::router(state.clone())).merge(storage::router(state)),
    })
    .await?;

    let app = add_tracing_layer(app);

    let port = config.port;
    let listener = TcpListener::bind(format!("127.0.0.1:{port}"))
        .await
        .map_err(|err| Error::Unexpected(format!("failed to bind port {port}: {err}")))?;

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("listening on http://{addr}");
    }

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|err| Error::Unexpected(err.to_string()))?;

    Ok(())
}

#[cfg(test)]
pub mod tests {
    use crate::{
        app::{create, AppParams},
        config::config_override,
        errors::{Error, Result},
        state::AppState,
        DB,
    };
    use aide::axum::ApiRouter;
    use axum_test::{TestServer, TestServerConfig};

    pub async fn test_server<R>(db: DB, router: R) -> Result<TestServer>
    where
        R: FnOnce(AppState) -> ApiRouter,
    {
        config_override(|config| config);

        let (app, _) = create(AppParams { db, router }).await?;

        let config = TestServer::builder().mock_transport().into_config();

        TestServer::new_with_config(app, config).map_err(|err| Error::Unexpected(err.to_string()))
    }
}
