//! `churnguard init` - Write a default config file.

use std::path::Path;

use churnguard_config::AppConfig;

pub fn run(config_path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() && !force {
        println!("  Config already exists: {}", config_path.display());
        println!("  Use --force to overwrite it.");
        return Ok(());
    }

    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(config_path, AppConfig::default_toml())?;
    println!("Wrote {}", config_path.display());
    println!();
    println!("Next: export GEMINI_API_KEY=... then run `churnguard doctor`.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_loadable_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        run(&path, false).unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.provider, "gemini");
    }

    #[test]
    fn keeps_existing_file_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "currency = \"USD\"\n").unwrap();

        run(&path, false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "currency = \"USD\"\n");

        run(&path, true).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap().currency, "INR");
    }
}
