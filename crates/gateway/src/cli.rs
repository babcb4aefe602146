//! Command-line interface for `valetd`.

use clap::{Parser, Subcommand};

use valet_domain::config::Config;

#[derive(Debug, Parser)]
#[command(name = "valetd", about = "Valet personal-assistant backend", version)]
pub struct Cli {
    /// Path to the config file.
    #[arg(short, long, default_value = "valet.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the API server (the default).
    Serve,
    /// Apply pending database migrations and exit.
    Migrate,
    /// Config inspection.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the version and exit.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Validate the config file and report issues.
    Validate,
    /// Print the effective config (TOML, with defaults applied).
    Show,
}

/// Load the config file, falling back to defaults when it is absent.
pub fn load_config(path: &str) -> anyhow::Result<Config> {
    if !std::path::Path::new(path).exists() {
        tracing::info!(path, "config file not found — using defaults");
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
    let config: Config =
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))?;
    Ok(config)
}

/// `config validate`: print every issue, return whether startup would pass.
pub fn validate(config: &Config, path: &str) -> bool {
    let issues = config.validate();
    if issues.is_empty() {
        println!("{path}: OK");
        return true;
    }
    for issue in &issues {
        let tag = match issue.severity {
            valet_domain::config::ConfigSeverity::Warning => "warning",
            valet_domain::config::ConfigSeverity::Error => "error",
        };
        println!("{tag}: {issue}");
    }
    !issues
        .iter()
        .any(|i| i.severity == valet_domain::config::ConfigSeverity::Error)
}

/// `config show`: dump the effective config.
pub fn show(config: &Config) {
    match toml::to_string_pretty(config) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("failed to render config: {e}"),
    }
}
