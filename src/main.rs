use axum_extra::extract::cookie::Key;
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &microblog::config::CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        listen_addr = %cfg.listen_addr,
        loglevel = %cfg.loglevel,
        per_page = cfg.per_page,
        insecure_cookie = cfg.insecure_cookie,
        cookie_secret_set = !cfg.cookie_secret.is_empty()
    );

    let key = if cfg.cookie_secret.is_empty() {
        warn!("no cookie secret configured; sessions will not survive a restart");
        Key::generate()
    } else {
        Key::try_from(cfg.cookie_secret.as_bytes())
            .map_err(|e| format!("cookie_secret must be at least 64 bytes: {e}"))?
    };

    let storage = microblog::db::connect(&cfg.database_url).await?;

    if let Some(email) = cfg.admin_email.as_deref() {
        let accounts = microblog::service::Accounts::new(storage.clone());
        match accounts.promote_admin(email).await {
            Ok(true) => info!(email, "admin account ready"),
            Ok(false) => warn!(email, "configured admin email has no account yet"),
            Err(e) => warn!(email, error = %e, "failed to promote admin"),
        }
    }

    // Build axum router and serve
    let state =
        microblog::MicroblogState::new(storage, key, cfg.insecure_cookie, cfg.per_page);
    let app = microblog::microblog_router(state);

    let listener = TcpListener::bind(cfg.listen_addr.as_str()).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
