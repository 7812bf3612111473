//! KTP user management server.
//!
//! Loads configuration from the environment (and `.env`), migrates the
//! database, optionally seeds an admin account and serves the REST API until
//! Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ktp_api::{AppState, config::ApiConfig};
use ktp_core::auth::service::{AuthService, AuthStores};
use ktp_core::clock::SystemClock;
use ktp_core::config::{AuthConfig, MailConfig};
use ktp_core::store::{PgRefreshTokenStore, PgUserStore};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// CLI arguments for the server. Every flag can also come from the
/// environment.
#[derive(Parser, Debug)]
#[command(name = "ktp_server", about = "KTP user management server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    bind: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/ktp"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// Seconds between sweeps of expired refresh tokens (0 disables).
    #[arg(long, env = "REFRESH_SWEEP_INTERVAL_SECS", default_value_t = 3600)]
    sweep_interval_secs: u64,

    /// Create this admin account at startup if no account has the email.
    #[arg(long, env = "SEED_ADMIN_EMAIL")]
    seed_admin_email: Option<String>,

    #[arg(long, env = "SEED_ADMIN_NAME", default_value = "Admin")]
    seed_admin_name: String,

    #[arg(long, env = "SEED_ADMIN_PASSWORD", hide_env_values = true)]
    seed_admin_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ktp_api=debug,ktp_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    let auth_config = AuthConfig::from_env()
        .inspect_err(|e| error!(error = %e, "invalid auth configuration"))?;
    let mail_config = MailConfig::from_env()
        .inspect_err(|e| error!(error = %e, "invalid mail configuration"))?;
    info!(app_env = ?auth_config.app_env, bind = %args.bind, "starting ktp_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    info!("running database migrations");
    ktp_core::store::migrate(&pool).await?;

    let mailer = ktp_core::mail::build_mailer(&mail_config, auth_config.app_env)?;
    let app_env = auth_config.app_env;
    let auth = Arc::new(AuthService::new(
        auth_config,
        AuthStores {
            users: Arc::new(PgUserStore::new(pool.clone())),
            refresh_tokens: Arc::new(PgRefreshTokenStore::new(pool.clone())),
        },
        mailer,
        mail_config.timeout,
        Arc::new(SystemClock),
    ));

    seed_admin(&auth, &args).await?;

    let shutdown = CancellationToken::new();
    let sweeper = (args.sweep_interval_secs > 0).then(|| {
        tokio::spawn(sweep_refresh_tokens(
            auth.clone(),
            Duration::from_secs(args.sweep_interval_secs),
            shutdown.clone(),
        ))
    });

    let state = AppState {
        auth,
        config: ApiConfig {
            bind_addr: args.bind,
            app_env,
        },
        pool: Some(pool),
    };
    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let app = ktp_api::router(state);
    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await;

    shutdown.cancel();
    if let Some(handle) = sweeper {
        let _ = handle.await;
    }

    serve_result?;
    Ok(())
}

async fn seed_admin(auth: &AuthService, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let Some(email) = &args.seed_admin_email else {
        return Ok(());
    };
    let Some(password) = &args.seed_admin_password else {
        return Err("SEED_ADMIN_EMAIL is set but SEED_ADMIN_PASSWORD is not".into());
    };
    match auth
        .ensure_admin(&args.seed_admin_name, email, password)
        .await?
    {
        Some(user) => info!(user_id = %user.id, "admin account created"),
        None => info!("admin account already present"),
    }
    Ok(())
}

async fn sweep_refresh_tokens(auth: Arc<AuthService>, every: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => match auth.refresh_tokens().purge_expired().await {
                Ok(0) => {}
                Ok(n) => info!(removed = n, "purged expired refresh tokens"),
                Err(e) => warn!(error = %e, "refresh token sweep failed"),
            },
        }
    }
}
