use mortar_cli::{commands, config, logging};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mortar",
    about = "Compose plugin servers from declarative manifests",
    version
)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Compose a manifest and print what the server consists of
    ///
    /// The manifest may be JSON or TOML (chosen by extension). Relative
    /// plugin and cache specifiers resolve against the manifest's directory.
    ///
    /// Examples:
    ///   mortar compose app.toml
    ///   mortar compose app.json --json
    Compose {
        /// Path to the manifest file
        manifest: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compose a manifest and serve its routes over HTTP
    ///
    /// Host and port come from the manifest's `server` table unless
    /// overridden here. Stop with Ctrl+C.
    ///
    /// Examples:
    ///   mortar serve app.toml
    ///   mortar serve app.toml --port 8080
    Serve {
        /// Path to the manifest file
        manifest: PathBuf,

        /// Host to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides server.port)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Manage module aliases
    Alias {
        #[command(subcommand)]
        command: AliasCommand,
    },
}

#[derive(Parser)]
enum AliasCommand {
    /// Add or update an alias
    ///
    /// Aliases can reference:
    /// - Route tables: ./plugins/hello.toml
    /// - Built-in modules: mortar/status
    /// - Other aliases (resolved recursively)
    ///
    /// Examples:
    ///   mortar alias add hello ./plugins/hello.toml
    ///   mortar alias add stats mortar/status
    Add {
        /// Alias name (e.g., "hello")
        alias: String,

        /// Module specifier (path, built-in, or another alias)
        spec: String,
    },

    /// Remove an alias
    Remove {
        /// Alias name to remove
        alias: String,
    },

    /// List registered aliases
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config().context("Failed to load config")?;
    let _guard = logging::init(cli.verbose, cfg.log_dir.as_deref())?;

    match cli.command {
        Command::Compose { manifest, json } => commands::compose::run(&manifest, json, cfg).await,

        Command::Serve {
            manifest,
            host,
            port,
        } => {
            let overrides = commands::serve::ServeOverrides { host, port };
            commands::serve::run(&manifest, overrides, cfg).await
        }

        Command::Alias { command } => match command {
            AliasCommand::Add { alias, spec } => commands::alias::add(&alias, &spec),
            AliasCommand::Remove { alias } => commands::alias::remove(&alias),
            AliasCommand::List => commands::alias::list(),
        },
    }
}
