//! `churnguard doctor` - Diagnose configuration and connectivity.

use std::path::Path;

use churnguard_config::AppConfig;

use super::load_config;

pub async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("ChurnGuard Doctor");
    println!("=================\n");

    let mut issues = 0;

    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults (run `churnguard init`)");
    }

    let config = match load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            summary(issues + 1);
            return Ok(());
        }
    };

    println!("     Provider:  {}", config.provider);
    println!("     Churn:     {} (t={})", config.churn.model, config.churn.temperature);
    println!(
        "     Portfolio: {} (t={})",
        config.portfolio.model, config.portfolio.temperature
    );

    issues += check_provider(&config).await;
    summary(issues);
    Ok(())
}

async fn check_provider(config: &AppConfig) -> usize {
    if let Err(e) = config.require_api_key() {
        println!("  ❌ {e}");
        println!("     Set CHURNGUARD_API_KEY or GEMINI_API_KEY, or add api_key to the config file");
        return 1;
    }
    println!("  ✅ Credential present");

    let provider = match churnguard_providers::build_from_config(config) {
        Ok(provider) => provider,
        Err(e) => {
            println!("  ❌ Provider setup failed: {e}");
            return 1;
        }
    };

    match provider.health_check().await {
        Ok(true) => {
            println!("  ✅ {} reachable", provider.name());
            0
        }
        Ok(false) => {
            println!("  ❌ {} rejected the health check", provider.name());
            1
        }
        Err(e) => {
            println!("  ❌ {} unreachable: {e}", provider.name());
            1
        }
    }
}

fn summary(issues: usize) {
    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }
}
