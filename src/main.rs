use anyhow::Context;
use school_api::{api, db, seed, AppConfig, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let pool = db::connect(&config)
        .await
        .with_context(|| format!("cannot open database {}", config.database_url))?;
    let store = Store::new(pool);
    let state = api::AppState::new(&config, store.clone());

    if config.seed_demo_data {
        seed::seed_demo_data(&store).await.context("seeding demo data")?;
        let (user, admin) = seed::demo_tokens(&state.auth)?;
        log::info!("Demo token for {}: {}", seed::DEMO_USER, user);
        log::info!("Demo token for {}: {}", seed::DEMO_ADMIN, admin);
    }

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("cannot bind {}", config.bind_address()))?;
    log::info!(
        "school-api {} listening on http://{} (API version {})",
        school_api::VERSION,
        config.bind_address(),
        state.versioning.get_version()
    );

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
    log::info!("Shutting down");
}
