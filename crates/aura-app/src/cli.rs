//! CLI argument definitions for the Aura binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Aura - a command-routing personal assistant.
#[derive(Parser, Debug)]
#[command(name = "aura", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub mode: Option<Mode>,

    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// HTTP port for `serve`.
    #[arg(short = 'p', long = "port", global = true)]
    pub port: Option<u16>,

    /// Data directory for the SQLite database.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Serve `POST /command` over HTTP (default).
    Serve,
    /// Read commands from stdin and print replies.
    Repl,
}

impl CliArgs {
    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or(Mode::Serve)
    }

    /// Priority: --config flag > AURA_CONFIG env var > ~/.aura/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.config_path_with(|name| std::env::var(name).ok())
    }

    /// Priority: --port flag > AURA_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        self.port_with(config_port, |name| std::env::var(name).ok())
    }

    /// `None` when the config value should stand.
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    /// `None` when the config value should stand.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }

    fn config_path_with<F>(&self, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = lookup("AURA_CONFIG").filter(|p| !p.trim().is_empty()) {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    fn port_with<F>(&self, config_port: u16, lookup: F) -> u16
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(p) = self.port {
            return p;
        }
        lookup("AURA_PORT")
            .and_then(|val| val.trim().parse::<u16>().ok())
            .unwrap_or(config_port)
    }
}

/// `~/.aura/config.toml`, or `config.toml` when there is no home directory.
fn default_config_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".aura").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

/// Expand a leading `~/` in a configured path.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_mode_defaults_to_serve() {
        assert_eq!(parse(&["aura"]).mode(), Mode::Serve);
        assert_eq!(parse(&["aura", "repl"]).mode(), Mode::Repl);
        assert_eq!(parse(&["aura", "serve", "--port", "8080"]).port, Some(8080));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["aura", "repl", "-l", "debug", "-d", "/tmp/aura"]);
        assert_eq!(args.resolve_log_level().as_deref(), Some("debug"));
        assert_eq!(args.resolve_data_dir().as_deref(), Some("/tmp/aura"));
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(CliArgs::try_parse_from(["aura", "dance"]).is_err());
    }

    // ---- precedence ----

    #[test]
    fn test_config_path_precedence() {
        let env = |name: &str| (name == "AURA_CONFIG").then(|| "/etc/aura.toml".to_string());

        let flagged = parse(&["aura", "--config", "/opt/aura.toml"]);
        assert_eq!(flagged.config_path_with(env), PathBuf::from("/opt/aura.toml"));

        let plain = parse(&["aura"]);
        assert_eq!(plain.config_path_with(env), PathBuf::from("/etc/aura.toml"));
        assert!(plain.config_path_with(|_| None).ends_with("config.toml"));
    }

    #[test]
    fn test_port_precedence() {
        let env = |name: &str| (name == "AURA_PORT").then(|| "6000".to_string());

        assert_eq!(parse(&["aura", "-p", "7000"]).port_with(5000, env), 7000);
        assert_eq!(parse(&["aura"]).port_with(5000, env), 6000);
        assert_eq!(parse(&["aura"]).port_with(5000, |_| None), 5000);
        assert_eq!(
            parse(&["aura"]).port_with(5000, |_| Some("not-a-port".to_string())),
            5000
        );
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/var/aura"), PathBuf::from("/var/aura"));
        assert_eq!(expand_home("data"), PathBuf::from("data"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/.aura/data"), home.join(".aura/data"));
        }
    }
}
