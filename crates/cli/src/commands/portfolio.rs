//! `churnguard portfolio` - Generate the training script and README.

use std::path::Path;

use churnguard_core::PortfolioAssets;
use churnguard_pipeline::portfolio_pipeline;

use super::load_config;

pub async fn run(
    config_path: &Path,
    code_only: bool,
    docs_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let provider = churnguard_providers::build_from_config(&config)?;
    let pipeline = portfolio_pipeline(provider, &config);

    let assets = pipeline.run(()).await.into_result()?;
    print!("{}", render(&assets, code_only, docs_only));
    Ok(())
}

fn render(assets: &PortfolioAssets, code_only: bool, docs_only: bool) -> String {
    match (code_only, docs_only) {
        (true, _) => format!("{}\n", assets.source_code.trim_end()),
        (_, true) => format!("{}\n", assets.documentation.trim_end()),
        _ => format!(
            "# --- source ---\n{}\n\n# --- documentation ---\n{}\n",
            assets.source_code.trim_end(),
            assets.documentation.trim_end()
        ),
    }
}
