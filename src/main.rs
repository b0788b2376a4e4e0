/// FirmaSøk server binary
use firmasok::{
    config::{ServerConfig, DEFAULT_LOG_FILTER},
    jobs, server, AppContext, AppResult,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration (also reads .env)
    let config = ServerConfig::from_env()?;

    // Initialize logging
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    print_banner();

    let ctx = Arc::new(AppContext::new(config)?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    server::serve((*ctx).clone()).await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn print_banner() {
    println!(
        r#"
    _______                      _____      __
   / ____(_)________ ___  ____ _/ ___/____ / /__
  / /_  / / ___/ __ `__ \/ __ `/\__ \/ __ \/ //_/
 / __/ / / /  / / / / / / /_/ /___/ / /_/ / ,<
/_/   /_/_/  /_/ /_/ /_/\__,_//____/\____/_/|_|

        Company lookup with EHF capability v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
