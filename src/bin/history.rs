use anyhow::Result;
use topup_storefront::config;
use topup_storefront::mode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,topup_storefront=info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/history.toml".to_string());
    let history_cfg = config::HistoryConfig::load(&path)?;

    mode::history::run(history_cfg).await
}
