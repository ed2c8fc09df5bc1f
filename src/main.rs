//! devopscli - a DevOps assistant for the terminal.
//!
//! Sends questions and files to an OpenWebUI chat-completions endpoint and
//! renders the Markdown replies. Multi-turn conversations are kept in a local
//! JSON file so they can be continued, listed and deleted later.

mod client;
mod commands;
mod config;
mod logging;
mod protocol;
mod render;
mod store;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use commands::query::QueryAction;
use config::Config;

#[derive(Parser)]
#[command(name = "devopscli")]
#[command(author, version, about = "AI-powered DevOps assistant backed by OpenWebUI")]
#[command(long_about = "AI-powered DevOps assistant backed by OpenWebUI.\n\nRun `devopscli init` to create a starter config, then set your API key.")]
struct Cli {
    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Explain a DevOps command or concept
    Explain {
        /// What to explain
        #[arg(value_name = "QUERY")]
        query: String,
    },
    /// Ask a question, optionally continuing an earlier conversation
    Query {
        /// The question to ask
        #[arg(value_name = "MESSAGE")]
        message: Option<String>,

        /// Continue the conversation with this ID
        #[arg(short = 'c', long = "cid", value_name = "ID", value_parser = clap::value_parser!(u64).range(1..))]
        cid: Option<u64>,

        /// List previous conversations
        #[arg(short, long)]
        list: bool,

        /// Delete all conversations
        #[arg(long)]
        clear: bool,

        /// Delete the conversation with this ID
        #[arg(short, long, value_name = "ID", value_parser = clap::value_parser!(u64).range(1..))]
        delete: Option<u64>,
    },
    /// Suggest improvements for a code or configuration file
    Optimize {
        /// File to optimize
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
    },
    /// Render a Markdown file in the terminal
    Render {
        /// Markdown file to render
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
    },
    /// Verify the local environment
    Verify {
        #[command(subcommand)]
        target: VerifyTarget,
    },
    /// Show the CLI version
    Version,
    /// Write a starter config file
    Init,
}

#[derive(Subcommand)]
enum VerifyTarget {
    /// Check that the tools listed in the config are installed
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref());
    let debug = cli.debug || config.as_ref().map(|c| c.debug).unwrap_or(false);
    logging::init(debug)?;
    debug!("Debug mode is enabled");

    let Some(command) = cli.command else {
        println!("Run `devopscli help` for available commands");
        return Ok(());
    };

    match command {
        Commands::Init => commands::init::handle_init(cli.config.as_deref()),
        Commands::Explain { query } => {
            commands::explain::handle_explain(&ready(config, cli.debug)?, &query).await
        }
        Commands::Query {
            message,
            cid,
            list,
            clear,
            delete,
        } => {
            let config = ready(config, cli.debug)?;
            let action = QueryAction::from_flags(message, cid, list, clear, delete)?;
            commands::query::handle_query(&config, action).await
        }
        Commands::Optimize { file } => {
            commands::optimize::handle_optimize(&ready(config, cli.debug)?, &file).await
        }
        Commands::Render { file } => commands::render::handle_render(&file),
        Commands::Verify {
            target: VerifyTarget::Tools,
        } => commands::verify::handle_verify_tools(&ready(config, cli.debug)?),
        Commands::Version => {
            commands::version::handle_version(&ready(config, cli.debug)?);
            Ok(())
        }
    }
}

/// Unwrap the loaded config for commands that need one. `--debug` on the
/// command line wins over the file.
fn ready(config: Result<Config>, debug: bool) -> Result<Config> {
    let mut config = config?;
    config.debug |= debug;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_query_flags() {
        let cli = Cli::try_parse_from(["devopscli", "query", "hello", "-c", "3"]).unwrap();
        match cli.command {
            Some(Commands::Query { message, cid, .. }) => {
                assert_eq!(message.as_deref(), Some("hello"));
                assert_eq!(cid, Some(3));
            }
            _ => panic!("expected query"),
        }
    }

    #[test]
    fn test_zero_id_rejected() {
        assert!(Cli::try_parse_from(["devopscli", "query", "-d", "0"]).is_err());
        assert!(Cli::try_parse_from(["devopscli", "query", "x", "--cid", "0"]).is_err());
    }

    #[test]
    fn test_optimize_requires_file() {
        assert!(Cli::try_parse_from(["devopscli", "optimize"]).is_err());
    }

    #[test]
    fn test_ready_applies_debug_flag() {
        let config = ready(Ok(Config::default()), true).unwrap();
        assert!(config.debug);

        let config = ready(Ok(Config::default()), false).unwrap();
        assert!(!config.debug);

        assert!(ready(Err(anyhow::anyhow!("bad yaml")), false).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["devopscli", "version", "--debug", "--config", "c.yaml"])
            .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
    }
}
