//! depotview command-line tool.
//!
//! Provides subcommands for inspecting and transforming a client view
//! (show, translate, includes, reverse, join), resolving a three-way merge
//! of one file, and generating / validating configuration files.

mod resolve;
mod style;
mod view;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use depotview_core::config::AppConfig;
use depotview_core::mapping::PathMapper;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// depotview command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "depotview",
    version,
    about = "Map depot paths through a client view and resolve three-way merges"
)]
struct Cli {
    /// Path to the TOML configuration file
    /// (default: ~/.config/depotview/config.toml, if present).
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// View file to use instead of the configured view.
    #[arg(long, global = true)]
    view: Option<PathBuf>,

    /// Extra view rule, appended after the configured view. Repeatable.
    #[arg(long = "rule", global = true)]
    rules: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect or transform the client view.
    View {
        #[command(subcommand)]
        action: view::ViewAction,
    },

    /// Resolve a three-way merge of one file.
    Resolve(resolve::ResolveArgs),

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./depotview.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

const DEFAULT_CONFIG_PATH: &str = "~/.config/depotview/config.toml";

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { output } = &cli.command {
        init_logging("warn");
        return cmd_init(output);
    }

    let config_path = cli.config.as_deref().map(expand_tilde);

    if let Commands::Validate = cli.command {
        init_logging("warn");
        let path = config_path.unwrap_or_else(|| expand_tilde(DEFAULT_CONFIG_PATH));
        return cmd_validate(&path);
    }

    let config = load_config(config_path.as_deref())?;
    init_logging(&config.logging.log_level);

    match cli.command {
        Commands::View { action } => {
            let mapper = build_mapper(&config, cli.view.as_deref(), &cli.rules)?;
            view::run_view(mapper, action)
        }
        Commands::Resolve(args) => resolve::run_resolve(&config, args),
        Commands::Init { .. } | Commands::Validate => Ok(()),
    }
}

/// Install the tracing subscriber. `RUST_LOG` overrides `level`.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// Load the configuration. Without an explicit path a missing default file
/// falls back to built-in defaults.
fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = expand_tilde(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                let mut config = AppConfig::default();
                config
                    .resolve_env_vars()
                    .context("failed to resolve environment variables")?;
                return Ok(config);
            }
            default
        }
    };

    AppConfig::load_and_resolve(&path)
        .with_context(|| format!("failed to load configuration file {}", path.display()))
}

/// The configured view, or `view_file` when given, followed by `rules`.
fn build_mapper(config: &AppConfig, view_file: Option<&Path>, rules: &[String]) -> Result<PathMapper> {
    let mut config = config.clone();
    if let Some(file) = view_file {
        config.view.file = Some(file.to_path_buf());
        config.view.lines.clear();
    }
    config.view.lines.extend(rules.iter().cloned());
    config.build_mapper().context("failed to build client view")
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(output: &Path) -> Result<()> {
    let default_config = r#"# depotview configuration

[logging]
log_level = "warn"

[view]
# file = "/path/to/view.txt"
lines = [
    "//depot/main/... //workspace/main/...",
    "-//depot/main/build/... //workspace/main/build/...",
]

[resolve]
force = false
interactive = true
tool_on_edit = true
# merge_tool = "p4merge"
merge_tool_env = "P4MERGE"
fallback_merge_tool_env = "MERGE"
diff_flags = ""
"#;

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, default_config).context("failed to write config file")?;

    println!(
        "{}",
        style::success(&format!("Default configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Edit the [view] rules to match your client view");
    println!("  2. Set merge_tool, or the P4MERGE / MERGE environment variables");
    println!(
        "  3. Validate with: depotview validate --config {}",
        output.display()
    );

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    println!("  [OK] Environment variable references processed");

    match config.validate() {
        Ok(()) => {
            println!("  [OK] All fields are valid");
        }
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    let mapper = config.build_mapper().context("failed to build client view")?;

    println!();
    println!("Configuration summary:");
    println!("  Log level     : {}", config.logging.log_level);
    println!(
        "  View file     : {}",
        config
            .view
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!("  View rules    : {}", mapper.count());
    println!("  Force         : {}", config.resolve.force);
    println!("  Interactive   : {}", config.resolve.interactive);
    println!(
        "  Merge tool    : {}",
        config.resolve.effective_merge_tool().unwrap_or("NOT SET")
    );
    println!();
    println!("Configuration is valid.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_translate() {
        let cli = Cli::try_parse_from([
            "depotview",
            "--rule",
            "//depot/a/... //ws/a/...",
            "view",
            "translate",
            "--reverse",
            "//ws/a/x.c",
        ])
        .unwrap();
        assert_eq!(cli.rules.len(), 1);
        assert!(matches!(
            cli.command,
            Commands::View {
                action: view::ViewAction::Translate { reverse: true, .. }
            }
        ));
    }

    #[test]
    fn test_build_mapper_view_file_replaces_lines() {
        let dir = tempfile::tempdir().unwrap();
        let view = dir.path().join("view.txt");
        std::fs::write(&view, "//depot/b/... //ws/b/...\n").unwrap();

        let mut config = AppConfig::default();
        config.view.lines = vec!["//depot/a/... //ws/a/...".into()];

        let extra = vec!["-//depot/b/tmp/... //ws/b/tmp/...".to_string()];
        let mapper = build_mapper(&config, Some(&view), &extra).unwrap();
        assert_eq!(mapper.count(), 2);
        assert_eq!(mapper.lhs(), vec!["//depot/b/...", "-//depot/b/tmp/..."]);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depotview.toml");
        cmd_init(&path).unwrap();
        let written = AppConfig::load_from_file(&path).unwrap();
        written.validate().unwrap();
        assert!(cmd_init(&path).is_err());
    }
}
