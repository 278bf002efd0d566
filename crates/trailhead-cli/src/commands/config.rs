use anyhow::{Context, Result};
use trailhead_models::{config, Config, Profile};

/// Show the current effective configuration.
pub fn show_config(profile: Option<Profile>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(profile) = profile {
        config.profile = profile;
    }

    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config::config_file_path().display());

    let exists = config::config_file_path().exists();
    println!("File exists: {}\n", if exists { "yes" } else { "no (using defaults)" });

    match config.resolve() {
        Ok(settings) => {
            println!("Settings:");
            println!("  profile: {}", settings.profile);
            println!("  database_path: {}", settings.database_path.display());
            println!("  index_path: {}", settings.index_path.display());
            println!("  search.score_threshold: {}", settings.resolver.threshold.value());
            println!("  search.collection: {}", settings.collection);
            println!(
                "  search.query_timeout_secs: {}",
                settings.resolver.query_timeout.as_secs()
            );
            println!("  search.call_timeout_secs: {}", settings.call_timeout.as_secs());
            println!("  search.max_retries: {}", settings.retry.max_retries);
            println!("  embedding.base_url: {}", settings.embedding.base_url);
            println!("  embedding.model: {}", settings.embedding.model);
            println!("  embedding.dimension: {}", settings.embedding.dimension);
            println!("  embedding.api_key: {}", mask(settings.embedding.api_key.as_deref()));
            println!("  generation.base_url: {}", settings.generation.base_url);
            println!("  generation.model: {}", settings.generation.model);
            println!("  generation.api_key: {}", mask(settings.generation.api_key.as_deref()));
        }
        Err(e) => {
            println!("Settings are invalid: {e}\n");
            println!("Raw values:");
            config.embedding.api_key = config.embedding.api_key.map(|k| mask(Some(&k)));
            config.generation.api_key = config.generation.api_key.map(|k| mask(Some(&k)));
            let raw = toml::to_string_pretty(&config).context("Failed to render config")?;
            for line in raw.lines() {
                println!("  {line}");
            }
        }
    }

    println!("\nPriority: CLI args > ENV vars (TRAIL_*) > Config file > Profile defaults");

    Ok(())
}

/// Get a specific config value.
pub fn get_config(key: Option<&str>) -> Result<()> {
    if let Some(key) = key {
        let settings = Config::load()?.resolve()?;

        let value = match key {
            "profile" => settings.profile.to_string(),
            "database_path" => settings.database_path.display().to_string(),
            "index_path" => settings.index_path.display().to_string(),
            "search.score_threshold" => settings.resolver.threshold.value().to_string(),
            "search.collection" => settings.collection,
            "search.system_prompt" => settings.resolver.system_prompt.to_string(),
            "embedding.base_url" => settings.embedding.base_url,
            "embedding.model" => settings.embedding.model,
            "embedding.dimension" => settings.embedding.dimension.to_string(),
            "generation.base_url" => settings.generation.base_url,
            "generation.model" => settings.generation.model,
            _ => {
                anyhow::bail!(
                    "Unknown config key: {}\n\nValid keys: profile, database_path, index_path, \
                     search.score_threshold, search.collection, search.system_prompt, \
                     embedding.base_url, embedding.model, embedding.dimension, \
                     generation.base_url, generation.model",
                    key
                );
            }
        };
        println!("{value}");
    } else {
        // No key provided, show entire config file contents
        let config_path = config::config_file_path();

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            print!("{}", contents);
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'trailhead config init' to create it.");
        }
    }

    Ok(())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    let config_path = config::config_file_path();
    println!("{}", config_path.display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure trailhead.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}

fn mask(key: Option<&str>) -> String {
    let Some(key) = key else {
        return "<not set>".to_string();
    };
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_hides_key_body() {
        assert_eq!(mask(None), "<not set>");
        assert_eq!(mask(Some("short")), "****");
        assert_eq!(mask(Some("sk-abcdefghijkl1234")), "sk-…1234");
    }
}
