//! Pomodoro Keeper - a restart-safe Pomodoro timer daemon
//!
//! This is the main entry point for the pomodoro-keeper application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use pomodoro_keeper::{
    api::create_router,
    config::Config,
    engine::{SystemClock, TimerEngine},
    services::{CommandNotifier, LogNotifier, Notifier},
    state::{AppState, JsonFileBackend, MemoryBackend, ScheduleStore},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("pomodoro_keeper={},tower_http=info", config.log_level()))
        .init();

    info!("Starting pomodoro-keeper v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, tick={}ms",
          config.host, config.port, config.tick_ms);

    let store = if config.ephemeral {
        info!("Using in-memory state (--ephemeral)");
        ScheduleStore::open(MemoryBackend::new())?
    } else {
        let path = config.state_path()?;
        info!("State file: {}", path.display());
        ScheduleStore::open(JsonFileBackend::new(path))?
    };
    let store = Arc::new(store);

    let log = LogNotifier::default();
    let notifier: Arc<dyn Notifier> = match &config.alarm_command {
        Some(command) => {
            info!("Alarm command: {}", command);
            Arc::new(CommandNotifier::new(command.clone(), config.alarm_timeout(), log))
        }
        None => Arc::new(log),
    };

    let engine = Arc::new(TimerEngine::with_tick(
        Arc::clone(&store),
        notifier,
        Arc::new(SystemClock),
        config.tick(),
    ));

    // Resume a countdown left running by a previous process
    let snapshot = engine.recover().await;
    info!("Timer state: phase={}, round={}/{}",
          snapshot.phase.name(), snapshot.current_round, snapshot.config.total_rounds);

    let state = Arc::new(AppState::new(Arc::clone(&engine), config.port, config.host.clone()));
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /start   - Start or resume the timer");
    info!("  POST /pause   - Pause the running interval");
    info!("  POST /stop    - Stop and return to idle");
    info!("  POST /reset   - Reset the cycle, keeping configuration");
    info!("  PUT  /config  - Update focus/break minutes and rounds");
    info!("  GET  /status  - Current timer state");
    info!("  GET  /events  - Server-sent snapshot stream");
    info!("  GET  /health  - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    engine.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}
