//! `churnguard serve` - Start the HTTP API server.

use std::path::Path;

use super::load_config;

pub async fn run(config_path: &Path, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("ChurnGuard Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {}", config.provider);
    println!("   Models:    {} / {}", config.churn.model, config.portfolio.model);

    churnguard_gateway::start(config).await?;

    Ok(())
}
