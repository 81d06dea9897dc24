//! Kotoba server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use kotoba_api::middleware::AppState;
use kotoba_common::{Config, LocalStorage};
use kotoba_core::{
    AccountService, CommentService, FollowService, GroupService, MediaService, PostService,
    TokenService,
};
use kotoba_db::repositories::{
    CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kotoba=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting kotoba server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = kotoba_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    kotoba_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let group_repo = GroupRepository::new(Arc::clone(&db));
    let follow_repo = FollowRepository::new(Arc::clone(&db));

    // Initialize media storage
    let media_service = MediaService::new(Arc::new(LocalStorage::new(
        config.media.root.clone(),
        config.media.base_url.clone(),
    )));

    // Initialize services
    let account_service = AccountService::new(user_repo.clone());
    let post_service = PostService::new(
        post_repo.clone(),
        user_repo.clone(),
        group_repo.clone(),
        follow_repo.clone(),
        media_service,
    );
    let comment_service = CommentService::new(comment_repo, post_repo, user_repo.clone());
    let group_service = GroupService::new(group_repo);
    let follow_service = FollowService::new(follow_repo, user_repo);
    let token_service = TokenService::new(&config.auth);

    // Create app state
    let state = AppState {
        account_service,
        post_service,
        comment_service,
        group_service,
        follow_service,
        token_service,
    };

    // Build router: pages and API from the shared builder, uploaded media
    // served from disk, tracing and CORS outermost
    let app = kotoba_api::app(state, config.media.max_upload_bytes)
        .nest_service(&config.media.base_url, ServeDir::new(&config.media.root))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server with graceful shutdown
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
