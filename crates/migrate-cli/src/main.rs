mod cmd;
mod output;
mod scripts;

use clap::{Parser, Subcommand};
use cmd::{ConfigArgs, RunExit, Selection, StackArgs};
use migrate_core::retry::MAX_RETRY;

#[derive(Parser)]
#[command(
    name = "csmig",
    about = "Run content-type migration scripts against a stack",
    version,
    propagate_version = true
)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log task progress (RUST_LOG still applies)
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the bundled migration scripts
    List,

    /// Run scripts against the stack
    Run {
        #[command(flatten)]
        selection: Selection,

        #[command(flatten)]
        stack: StackArgs,

        #[command(flatten)]
        config: ConfigArgs,

        /// Attempts per remote call before a task group fails
        #[arg(long, default_value_t = MAX_RETRY)]
        max_attempts: u32,
    },

    /// Check scripts without calling the stack
    Validate {
        #[command(flatten)]
        selection: Selection,

        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let catalog = scripts::catalog();

    let result = match cli.command {
        Commands::List => cmd::list::run(&catalog, cli.json),
        Commands::Run {
            selection,
            stack,
            config,
            max_attempts,
        } => cmd::run::run(&catalog, &selection, &stack, &config, max_attempts, cli.json),
        Commands::Validate { selection, config } => {
            cmd::validate::run(&catalog, &selection, &config, cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        let code = e.downcast_ref::<RunExit>().map_or(1, RunExit::exit_code);
        std::process::exit(code);
    }
}
