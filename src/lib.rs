pub mod alerting; // Severity evaluation + alert reconciliation
pub mod api; // REST router, auth, server lifecycle
pub mod checkin; // Daily check-in reminders
pub mod client; // Typed HTTP client
pub mod config;
pub mod core_state;
pub mod db;
pub mod models;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::alerting::SystemClock;
use crate::api::ServerError;
use crate::config::ServerConfig;
use crate::core_state::CoreState;

/// Start the server from environment settings and serve until Ctrl-C.
pub fn run() -> Result<(), ServerError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = ServerConfig::from_env()?;
    let bind = settings.bind;
    let conn = db::open_database(&settings.db_path)?;
    tracing::info!(path = %settings.db_path.display(), "Database ready");

    let admin_token = match settings.admin_token {
        Some(token) => token,
        None => {
            let token = api::types::generate_token();
            let path = config::admin_token_path(&settings.db_path);
            config::write_admin_token(&path, &token)?;
            tracing::warn!(
                path = %path.display(),
                hint = config::token_hint(&token),
                "{} not set; generated admin token for this run",
                config::ENV_ADMIN_TOKEN
            );
            token
        }
    };

    let core = Arc::new(CoreState::new(conn, Arc::new(SystemClock), &admin_token));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let mut server = api::start_api_server_on(core, bind).await?;
        tracing::info!(addr = %server.session.server_addr, "Listening");

        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for shutdown signal: {e}");
        }

        server.shutdown();
        server.stopped().await;
        Ok::<(), ServerError>(())
    })
}
