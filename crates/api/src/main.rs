use std::sync::Arc;

use anyhow::Context;

use menugate_auth::PolicyEvaluator;
use menugate_infra::{AppConfig, InMemoryAuthStore, PostgresAuthStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    menugate_observability::init();

    let config = AppConfig::from_env()?;
    let signer = config.token_signer().context("invalid token configuration")?;
    let tracker = Arc::new(config.request_tracker());

    let authenticator: Arc<dyn menugate_api::middleware::Authenticator> = match &config.database_url {
        Some(url) => {
            let store = PostgresAuthStore::connect(url, 10)
                .await
                .context("failed to connect to Postgres")?;
            store.ensure_schema().await.context("failed to apply schema")?;
            Arc::new(PolicyEvaluator::new(store, signer))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(PolicyEvaluator::new(InMemoryAuthStore::new(), signer))
        }
    };

    let app = menugate_api::app::build_app(authenticator, tracker);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .context("failed to bind 0.0.0.0:8080")?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
