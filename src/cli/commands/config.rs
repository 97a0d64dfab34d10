use colored::Colorize;

use crate::cli::args::{ConfigArgs, ConfigCommands, OutputFormat};
use crate::config::{Config, Paths};
use crate::error::Result;

/// Handle the config command
pub fn config(
    config: &mut Config,
    paths: &Paths,
    args: &ConfigArgs,
    format: OutputFormat,
) -> Result<String> {
    match &args.command {
        ConfigCommands::Show => config_show(config, format),
        ConfigCommands::Set { key, value } => config_set(config, paths, key, value, format),
        ConfigCommands::Path => config_path(paths, format),
        ConfigCommands::Init { base_url } => config_init(config, paths, base_url, format),
    }
}

fn not_set() -> String {
    "(not set)".dimmed().to_string()
}

/// Show current configuration
fn config_show(config: &Config, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => {
            let mut output = String::new();
            output.push_str(&format!("{}\n", "Configuration".bold()));
            output.push_str(&"─".repeat(40));
            output.push('\n');

            output.push_str(&format!("\n{}\n", "[api]".cyan()));
            output.push_str(&format!(
                "  base_url = {}\n",
                config.api.base_url.clone().unwrap_or_else(not_set)
            ));
            output.push_str(&format!("  timeout_secs = {}\n", config.api.timeout_secs));

            output.push_str(&format!("\n{}\n", "[cache]".cyan()));
            output.push_str(&format!("  keep_unused_for = {}\n", config.cache.keep_unused_for));
            output.push_str(&format!(
                "  refetch_after = {}\n",
                config.cache.refetch_after.clone().unwrap_or_else(not_set)
            ));

            output.push_str(&format!("\n{}\n", "[output]".cyan()));
            output.push_str(&format!("  format = {}\n", config.output.format));

            output.push_str(&format!("\n{}\n", "[log]".cyan()));
            output.push_str(&format!("  level = {}\n", config.log.level));

            Ok(output)
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(config)?),
    }
}

/// Set a configuration value
fn config_set(
    config: &mut Config,
    paths: &Paths,
    key: &str,
    value: &str,
    format: OutputFormat,
) -> Result<String> {
    config.set(key, value)?;
    config.save_to(paths)?;

    match format {
        OutputFormat::Pretty => Ok(format!("{} Set {} = {}", "✓".green(), key, value)),
        OutputFormat::Json => {
            let result = serde_json::json!({
                "success": true,
                "key": key,
                "value": value
            });
            Ok(serde_json::to_string_pretty(&result)?)
        }
    }
}

/// Show configuration file path
fn config_path(paths: &Paths, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => {
            let mut output = String::new();
            output.push_str(&format!("Config file: {}\n", paths.config_file.display()));
            output.push_str(&format!(
                "Exists: {}\n",
                if paths.config_exists() {
                    "yes".green()
                } else {
                    "no".yellow()
                }
            ));
            Ok(output)
        }
        OutputFormat::Json => {
            let result = serde_json::json!({
                "path": paths.config_file.display().to_string(),
                "exists": paths.config_exists()
            });
            Ok(serde_json::to_string_pretty(&result)?)
        }
    }
}

/// Point the configuration at an API and write it out
fn config_init(
    config: &mut Config,
    paths: &Paths,
    base_url: &str,
    format: OutputFormat,
) -> Result<String> {
    config.set("api.base_url", base_url)?;
    config.save_to(paths)?;

    match format {
        OutputFormat::Pretty => Ok(format!(
            "{} Configuration saved to: {}\n\nRun '{}' to see what's on.",
            "✓".green(),
            paths.config_file.display(),
            "punchline events --date today".cyan()
        )),
        OutputFormat::Json => {
            let result = serde_json::json!({
                "path": paths.config_file.display().to_string(),
                "base_url": base_url
            });
            Ok(serde_json::to_string_pretty(&result)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PunchlineError;
    use tempfile::TempDir;

    fn args(command: ConfigCommands) -> ConfigArgs {
        ConfigArgs { command }
    }

    #[test]
    fn test_init_writes_base_url() {
        let temp_dir = TempDir::new().unwrap();
        let paths = Paths::at(temp_dir.path());
        let mut cfg = Config::default();

        let init = args(ConfigCommands::Init {
            base_url: "https://api.example.com".to_string(),
        });
        config(&mut cfg, &paths, &init, OutputFormat::Json).unwrap();

        let loaded = Config::load_from(&paths).unwrap();
        assert_eq!(loaded.api.base_url.as_deref(), Some("https://api.example.com"));
    }

    #[test]
    fn test_set_rejects_unknown_key_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let paths = Paths::at(temp_dir.path());
        let mut cfg = Config::default();

        let set = args(ConfigCommands::Set {
            key: "api.token".to_string(),
            value: "secret".to_string(),
        });
        let err = config(&mut cfg, &paths, &set, OutputFormat::Pretty).unwrap_err();
        assert!(matches!(err, PunchlineError::InvalidArgument(_)));
        assert!(!paths.config_exists());
    }

    #[test]
    fn test_show_json_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let paths = Paths::at(temp_dir.path());
        let mut cfg = Config::default();
        cfg.cache.refetch_after = Some("5m".to_string());

        let out = config(&mut cfg, &paths, &args(ConfigCommands::Show), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["cache"]["refetch_after"], "5m");
        assert_eq!(value["cache"]["keep_unused_for"], "1m");
    }
}
