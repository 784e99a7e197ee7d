use std::net::SocketAddr;
use std::sync::Arc;

use taskgate_api::app::build_app;
use taskgate_api::identity::InMemoryDirectory;
use taskgate_audit::MemoryAuditSink;
use taskgate_auth::AuthConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    taskgate_observability::init();

    let config = AuthConfig::from_env()?;
    let directory = Arc::new(InMemoryDirectory::new());
    let audit = Arc::new(MemoryAuditSink::new());

    let app = build_app(config, directory, audit);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
