//! `vaultmind config` — Configuration management commands.

use vaultmind_config::AppConfig;

fn config_path() -> std::path::PathBuf {
    AppConfig::config_dir().join("config.toml")
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    config.llm.api_key = redact(&config.llm.api_key);
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", config_path().display());
    Ok(())
}

pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path();
    if path.exists() {
        println!("Config already exists at: {}", path.display());
        println!("   Edit it manually or delete it and re-run `vaultmind config init`.");
        return Ok(());
    }

    AppConfig::default().save_to(&path)?;
    println!("Created config.toml at: {}", path.display());
    println!();
    println!("Next steps:");
    println!("   1. Set notes_dir in {}", path.display());
    println!("   2. Run: vaultmind index");
    println!("   3. Run: vaultmind chat");
    Ok(())
}

/// Keep the last four characters of a key.
fn redact(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "***".into();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_valid() {
        let path = config_path();
        assert!(path.to_str().unwrap().ends_with("config.toml"));
        assert!(path.to_str().unwrap().contains(".vaultmind"));
    }

    #[test]
    fn redact_keeps_tail() {
        assert_eq!(redact("sk-abcdef1234"), "***1234");
        assert_eq!(redact("abc"), "***");
    }
}
