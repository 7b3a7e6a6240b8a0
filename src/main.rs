use anyhow::Result;
use cts2json::{cli::parse_args, run_conversion};

#[tokio::main]
async fn main() -> Result<()> {
    let config = parse_args()?;

    env_logger::Builder::new()
        .filter_level(config.log_level())
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    run_conversion(config).await?;
    Ok(())
}
