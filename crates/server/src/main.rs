//! Pickup server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use pickup_api::{AppState, router as api_router};
use pickup_common::Config;
use pickup_core::{FriendService, GameService, MessagingService, UserService};
use pickup_db::repositories::{
    FriendRepository, GameRepository, MessagingRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
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
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pickup=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting pickup server...");

    let config = Config::load()?;

    let db = pickup_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    pickup_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);

    let user_repo = UserRepository::new(Arc::clone(&db));
    let game_repo = GameRepository::new(Arc::clone(&db));
    let friend_repo = FriendRepository::new(Arc::clone(&db));
    let messaging_repo = MessagingRepository::new(Arc::clone(&db));

    let state = AppState {
        user_service: UserService::new(user_repo.clone(), game_repo.clone(), &config),
        game_service: GameService::new(game_repo, user_repo.clone(), &config),
        friend_service: FriendService::new(friend_repo.clone(), user_repo.clone()),
        messaging_service: MessagingService::new(
            messaging_repo,
            friend_repo,
            user_repo,
            config.social.require_friendship_for_messages,
        ),
    };

    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            pickup_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let ip: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((ip, config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
