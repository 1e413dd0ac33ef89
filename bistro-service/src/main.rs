use std::sync::Arc;

use anyhow::Context;
use bistro_service::gateway::{PaymentGateway, StripeGateway, StubGateway};
use bistro_service::metrics::ServiceMetrics;
use bistro_service::store::{BistroStore, InMemoryStore, MongoStore};
use bistro_service::{build_router, AppState, ServiceConfig, StoreBackend};
use common_auth::{JwtVerifier, TokenIssuer};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env()?;

    let store: Arc<dyn BistroStore> = match &config.store {
        StoreBackend::Mongo { uri, database, transactions } => Arc::new(
            MongoStore::connect(uri, database, *transactions)
                .await
                .context("Failed to connect to MongoDB")?,
        ),
        StoreBackend::Memory => {
            warn!("using the in-memory store; data is lost on exit");
            Arc::new(InMemoryStore::new())
        }
    };

    let gateway: Arc<dyn PaymentGateway> = match &config.stripe_secret_key {
        Some(key) => Arc::new(
            StripeGateway::new(&config.stripe_api_base, key, config.gateway_timeout)
                .context("Failed to build payment gateway client")?,
        ),
        None => {
            warn!("STRIPE_SECRET_KEY not set; payment intents use the stub gateway");
            Arc::new(StubGateway::new())
        }
    };

    let state = AppState {
        store,
        jwt_verifier: Arc::new(JwtVerifier::new(config.jwt.clone())),
        token_issuer: Arc::new(TokenIssuer::new(config.jwt.clone())),
        gateway,
        metrics: Arc::new(ServiceMetrics::new().context("Failed to register metrics")?),
        currency: config.currency.clone(),
    };

    let app = build_router(state, &config.http);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "bistro-service listening");
    axum::serve(listener, app).await?;
    Ok(())
}
