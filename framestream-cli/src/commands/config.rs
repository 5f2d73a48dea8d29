//! Configuration management CLI commands.
//!
//! Provides `config show`, `config path` and `config init`.

use std::path::Path;

use clap::Subcommand;
use framestream::config::{config_path, ConfigError, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_show(),
        ConfigCommands::Path => run_path(),
        ConfigCommands::Init { force } => {
            let path = config_path().ok_or(ConfigError::NoConfigDir)?;
            init_at(&path, force)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

/// Show all settings, including defaults for missing keys.
fn run_show() -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    print!("{}", render(&config));
    Ok(())
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    println!("{}", path.display());
    Ok(())
}

fn init_at(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        )));
    }
    ConfigFile::default().save_to(path)?;
    Ok(())
}

fn render(config: &ConfigFile) -> String {
    let mut out = String::new();
    for (section, properties) in config.to_ini().iter() {
        let Some(section) = section else { continue };
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("[{}]\n", section));
        for (key, value) in properties.iter() {
            out.push_str(&format!("  {} = {}\n", key, value));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_sections() {
        let text = render(&ConfigFile::default());
        assert!(text.starts_with("[pipeline]\n"));
        assert!(text.contains("  channel_capacity = 100\n"));
        assert!(text.contains("[output]\n  directory = reports\n"));
        assert!(text.contains("[logging]\n  level = warn\n"));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");

        init_at(&path, false).unwrap();
        assert_eq!(ConfigFile::load_from(&path).unwrap(), ConfigFile::default());

        assert!(matches!(init_at(&path, false), Err(CliError::Config(_))));
        init_at(&path, true).unwrap();
    }
}
