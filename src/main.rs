use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use treescribe::cli;

#[derive(Parser)]
#[command(name = "treescribe", version)]
#[command(about = "Generate a module description report for a project tree", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the directory tree and leaf summary without writing a report
    Analyze {
        /// Project path (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Path to config file (defaults to ./treescribe.toml or ~/.config/treescribe/config.toml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Generate or resume the module report
    Generate {
        /// Project path (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Labels written per report rewrite (default: from config)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Answer for an existing report: 1 rebuild, 2 unanalyzed, 3 new directories
        #[arg(long)]
        choice: Option<String>,

        #[arg(long)]
        config: Option<String>,
    },

    /// Fill any missing or placeholder descriptions in an existing report
    Validate {
        #[arg(default_value = ".")]
        path: String,

        #[arg(long)]
        config: Option<String>,
    },

    /// Print timezone, locale and OS details as JSON
    HostInfo,

    /// Query project release data (versions, changelog, features, faq)
    Fetch {
        query: String,

        #[arg(long)]
        config: Option<String>,

        /// Ignore and do not read the local cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Check a skill package directory for required structure
    CheckSkill {
        dir: String,

        #[arg(long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { path, config } => cli::analyze::run(&path, config)?,
        Commands::Generate {
            path,
            batch_size,
            choice,
            config,
        } => cli::generate::run(&path, batch_size, choice, config)?,
        Commands::Validate { path, config } => cli::validate::run(&path, config)?,
        Commands::HostInfo => cli::host_info::run()?,
        Commands::Fetch {
            query,
            config,
            no_cache,
        } => cli::fetch::run(&query, config, no_cache).await?,
        Commands::CheckSkill { dir, config } => cli::check_skill::run(&dir, config)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_generate_defaults() {
        let cli = Cli::try_parse_from(["treescribe", "generate"]).unwrap();
        match cli.command {
            Commands::Generate {
                path,
                batch_size,
                choice,
                config,
            } => {
                assert_eq!(path, ".");
                assert!(batch_size.is_none());
                assert!(choice.is_none());
                assert!(config.is_none());
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_parse_generate_with_all_args() {
        let cli = Cli::try_parse_from([
            "treescribe",
            "generate",
            "/tmp/project",
            "--batch-size",
            "10",
            "--choice",
            "2",
            "--config",
            "custom.toml",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate {
                path,
                batch_size,
                choice,
                config,
            } => {
                assert_eq!(path, "/tmp/project");
                assert_eq!(batch_size, Some(10));
                assert_eq!(choice.as_deref(), Some("2"));
                assert_eq!(config.as_deref(), Some("custom.toml"));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from(["treescribe", "fetch", "versions", "--no-cache"]).unwrap();
        match cli.command {
            Commands::Fetch {
                query, no_cache, ..
            } => {
                assert_eq!(query, "versions");
                assert!(no_cache);
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_parse_host_info_and_check_skill() {
        assert!(matches!(
            Cli::try_parse_from(["treescribe", "host-info"]).unwrap().command,
            Commands::HostInfo
        ));
        let cli = Cli::try_parse_from(["treescribe", "check-skill", "skills/demo"]).unwrap();
        match cli.command {
            Commands::CheckSkill { dir, .. } => assert_eq!(dir, "skills/demo"),
            _ => panic!("expected check-skill"),
        }
    }

    #[test]
    fn test_parse_fetch_requires_query() {
        assert!(Cli::try_parse_from(["treescribe", "fetch"]).is_err());
    }

    #[test]
    fn test_parse_missing_subcommand() {
        assert!(Cli::try_parse_from(["treescribe"]).is_err());
    }

    #[test]
    fn test_parse_unknown_subcommand() {
        assert!(Cli::try_parse_from(["treescribe", "foobar"]).is_err());
    }
}
