//! gopt - option parsing for CLI flags and mount-style `-o` groups.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gopt::{generate_error_output, generate_output, split_group, Args, Config};
use tracing_subscriber::EnvFilter;

/// Parse flags and `-o` option groups against a JSON option set.
#[derive(Parser, Debug)]
#[command(name = "gopt", version, about, disable_help_subcommand = true)]
struct Cli {
    /// Log parsing decisions to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse arguments and output a sourceable shell file
    Parse {
        /// JSON option set
        #[arg(long)]
        config: String,

        /// Environment variable prefix (overrides config)
        #[arg(long)]
        prefix: Option<String>,

        /// Arguments to parse
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Report whether any option in the set matches a token
    Match {
        /// JSON option set
        #[arg(long)]
        config: String,

        /// Token to look up, e.g. `uid=1000` or `--verbose`
        token: String,
    },

    /// Print the decoded fields of an `-o` option group, one per line
    Split {
        /// Text following `-o`
        group: String,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("gopt=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gopt=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Commands::Parse {
            config,
            prefix,
            args,
        } => {
            let cfg = Config::from_json(&config).context("failed to parse config JSON")?;
            let set = cfg.compile().context("invalid config")?;

            let effective_prefix = prefix.as_deref().unwrap_or_else(|| cfg.effective_prefix());

            let mut argv = Args::new();
            argv.add_arg(cfg.program_name())?;
            for arg in &args {
                argv.add_arg(arg)?;
            }

            let path = match set.parse(argv) {
                Ok((matches, out)) => generate_output(&matches, &out, effective_prefix)
                    .context("failed to generate output file")?,
                Err(err) => {
                    tracing::debug!(error = %err, "parse failed");
                    generate_error_output(&err.to_string())
                        .context("failed to generate error output file")?
                }
            };

            println!("{}", path.display());
        }
        Commands::Match { config, token } => {
            let cfg = Config::from_json(&config).context("failed to parse config JSON")?;
            let set = cfg.compile().context("invalid config")?;
            println!("{}", set.table().is_match(&token));
        }
        Commands::Split { group } => {
            for field in split_group(&group) {
                println!("{}", field.context("failed to decode option group")?);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_subcommand_parses_config() {
        let cli = Cli::try_parse_from(["gopt", "parse", "--config", r#"{"name":"mnt"}"#, "--"])
            .unwrap();

        match cli.command {
            Commands::Parse {
                config,
                prefix,
                args,
            } => {
                assert_eq!(config, r#"{"name":"mnt"}"#);
                assert!(prefix.is_none());
                assert!(args.is_empty());
            }
            _ => panic!("Expected Parse command"),
        }
    }

    #[test]
    fn test_parse_subcommand_parses_args() {
        let cli = Cli::try_parse_from([
            "gopt",
            "parse",
            "--config",
            "{}",
            "--",
            "-o",
            "ro,uid=1000",
            "/mnt",
        ])
        .unwrap();

        match cli.command {
            Commands::Parse { args, .. } => {
                assert_eq!(args, vec!["-o", "ro,uid=1000", "/mnt"]);
            }
            _ => panic!("Expected Parse command"),
        }
    }

    #[test]
    fn test_parse_subcommand_requires_config() {
        let result = Cli::try_parse_from(["gopt", "parse", "--"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_flag_is_global() {
        let cli = Cli::try_parse_from(["gopt", "split", "a,b", "--debug"]).unwrap();
        assert!(cli.debug);
    }

    #[test]
    fn test_match_subcommand() {
        let cli = Cli::try_parse_from(["gopt", "match", "--config", "{}", "uid=1"]).unwrap();

        match cli.command {
            Commands::Match { config, token } => {
                assert_eq!(config, "{}");
                assert_eq!(token, "uid=1");
            }
            _ => panic!("Expected Match command"),
        }
    }

    #[test]
    fn test_split_subcommand() {
        let cli = Cli::try_parse_from(["gopt", "split", r"a\,b,c"]).unwrap();

        match cli.command {
            Commands::Split { group } => assert_eq!(group, r"a\,b,c"),
            _ => panic!("Expected Split command"),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let result = Cli::try_parse_from(["gopt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_help() {
        // Verify the command can generate help without panicking
        Cli::command().debug_assert();
    }

    #[test]
    fn test_prefix_priority_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "gopt",
            "parse",
            "--config",
            r#"{"prefix":"CONFIG_"}"#,
            "--prefix",
            "CLI_",
            "--",
        ])
        .unwrap();

        match cli.command {
            Commands::Parse { config, prefix, .. } => {
                let cfg = Config::from_json(&config).unwrap();
                let effective = prefix.as_deref().unwrap_or_else(|| cfg.effective_prefix());
                assert_eq!(effective, "CLI_");
            }
            _ => panic!("Expected Parse command"),
        }
    }

    #[test]
    fn test_prefix_default_when_neither_set() {
        let cli = Cli::try_parse_from(["gopt", "parse", "--config", "{}", "--"]).unwrap();

        match cli.command {
            Commands::Parse { config, prefix, .. } => {
                let cfg = Config::from_json(&config).unwrap();
                let effective = prefix.as_deref().unwrap_or_else(|| cfg.effective_prefix());
                assert_eq!(effective, "GOPT_");
            }
            _ => panic!("Expected Parse command"),
        }
    }
}
