//! Athlo server entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use athlo_api::{SseBroadcaster, SseEventPublisher, middleware::AppState, router as api_router};
use athlo_common::{Config, LocalStorage, StorageBackend};
use athlo_core::{
    CommentService, EngagementService, EventPublisherService, FollowService, MediaService,
    NotificationService, PostService, ProfileService, TagService,
};
use athlo_db::repositories::{
    CommentRepository, FollowRepository, LikeRepository, NotificationRepository, PostRepository,
    ProfileRepository, TagRepository,
};
use axum::middleware;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
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
                .unwrap_or_else(|_| "athlo=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting athlo server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = athlo_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    athlo_db::migrate(&db).await?;
    info!("Migrations completed");

    // Media storage backend
    let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(
        PathBuf::from(&config.storage.base_path),
        config.storage.base_url.clone(),
    ));

    // Initialize repositories
    let db = Arc::new(db);
    let profile_repo = ProfileRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let like_repo = LikeRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let follow_repo = FollowRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));
    let tag_repo = TagRepository::new(Arc::clone(&db));

    // Real-time streaming
    let sse_broadcaster = SseBroadcaster::new();
    let event_publisher: EventPublisherService =
        Arc::new(SseEventPublisher::new(sse_broadcaster.clone()));

    // Initialize services
    let profile_service = ProfileService::new(Arc::clone(&db), profile_repo.clone());

    let mut notification_service = NotificationService::new(notification_repo.clone());
    notification_service.set_event_publisher(event_publisher.clone());

    let mut post_service = PostService::new(
        Arc::clone(&db),
        post_repo.clone(),
        profile_repo.clone(),
    );
    post_service.set_notification_service(notification_service.clone());
    post_service.set_event_publisher(event_publisher.clone());

    let mut engagement_service = EngagementService::new(
        Arc::clone(&db),
        like_repo.clone(),
        post_repo.clone(),
    );
    engagement_service.set_event_publisher(event_publisher.clone());

    let mut comment_service = CommentService::new(
        Arc::clone(&db),
        comment_repo.clone(),
        post_repo.clone(),
    );
    comment_service.set_event_publisher(event_publisher.clone());

    let mut follow_service = FollowService::new(
        Arc::clone(&db),
        follow_repo.clone(),
        profile_repo.clone(),
    );
    follow_service.set_event_publisher(event_publisher.clone());

    let tag_service = TagService::new(tag_repo.clone());
    let media_service = MediaService::new(storage, config.storage.max_file_size);

    let state = AppState {
        profile_service,
        post_service,
        engagement_service,
        comment_service,
        follow_service,
        notification_service,
        tag_service,
        media_service,
        sse_broadcaster,
    };

    // Build the application
    let app = api_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            athlo_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Serve
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
