//! services/journal/src/bin/journal.rs

use journal_lib::{
    adapters::{FileDismissalStore, SupabaseAuthAdapter, SupabaseClient, SupabaseStoriesAdapter},
    app::JournalApp,
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::Router;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Gateway Adapters ---
    info!("Using gateway at {}", config.supabase_url);
    let client = SupabaseClient::new(&config.supabase_url, &config.supabase_anon_key);
    let auth = Arc::new(SupabaseAuthAdapter::new(client.clone()));
    let stories = Arc::new(SupabaseStoriesAdapter::new(client));
    let dismissals = Arc::new(FileDismissalStore::new(config.dismissal_file()));

    // --- 3. Start the Page Session ---
    let app = Arc::new(JournalApp::new(auth, stories, dismissals));
    // Held for the life of the process so auth events keep flowing.
    let _auth_subscription = app.start().await;

    // --- 4. Build the Shared AppState & Router ---
    let app_state = Arc::new(AppState {
        app,
        config: config.clone(),
    });
    let app = Router::new()
        .merge(web::router(app_state)?)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
