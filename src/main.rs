//! Quiz Rally Back binary entrypoint wiring REST, WebSocket, and persistence layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quiz_rally_back::{
    config::AppConfig,
    dao::{
        leaderboard_store::{JsonFileStore, LeaderboardStore},
        question_bank,
    },
    routes,
    services::{persistence, session_service},
    state::{AppState, GlobalLeaderboard, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let questions = question_bank::load_questions(&config.questions_path)
        .context("loading question set")?;

    let store: Arc<dyn LeaderboardStore> = Arc::new(JsonFileStore::new(config.storage_dir.clone()));
    let leaderboard = match store.load().await {
        Ok(Some(persisted)) => {
            let board = persisted.into_leaderboard(config.leaderboard_top_n);
            info!(games = board.game_ids().len(), "leaderboard restored from disk");
            board
        }
        Ok(None) => {
            info!("no persisted leaderboard found; starting empty");
            GlobalLeaderboard::new(config.leaderboard_top_n)
        }
        Err(err) => {
            warn!(error = %err, "persisted leaderboard unreadable; starting empty");
            GlobalLeaderboard::new(config.leaderboard_top_n)
        }
    };

    let app_state = AppState::new(config, questions, leaderboard);

    tokio::spawn(persistence::run(app_state.clone(), store.clone()));
    tokio::spawn(session_service::run_room_housekeeping(app_state.clone()));

    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    // Flush whatever the debounce was still holding back.
    persistence::force_save(&app_state, store.as_ref()).await;
    info!("leaderboard flushed; shutting down");

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
