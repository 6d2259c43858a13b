use anyhow::Context;
use ferrous_lifespan::{logging, AppConfig, Application};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    logging::init_logger(config.log_format).context("installing tracing subscriber")?;

    let addr = config.bind_addr();
    Application::new(config)
        .run()
        .await
        .with_context(|| format!("serving on {}", addr))
}
