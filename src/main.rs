use anyhow::Result;
use log::{debug, error};

use soil_sensor_rtu::cli::{build_cli, handle_subcommands};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let default_level = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    debug!("🖥️  soil-sensor {}", soil_sensor_rtu::VERSION);

    if let Err(e) = handle_subcommands(&matches).await {
        error!("❌ {:#}", e);
        return Err(e);
    }

    Ok(())
}
