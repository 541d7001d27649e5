mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::Context;
use tracing_subscriber::prelude::*;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let ctx = Context::new(&cli)?;

    match cli.command {
        Commands::Scan { dir } => {
            commands::scan::run(&ctx, &dir)?;
        }
        Commands::List { json, tree } => {
            commands::list::run(&ctx, json, tree)?;
        }
        Commands::Show {
            author,
            title,
            json,
        } => {
            commands::show::run(&ctx, &author, &title, json)?;
        }
        Commands::Remove { author, title } => {
            commands::remove::run(&ctx, &author, &title)?;
        }
        Commands::Rename {
            author,
            title,
            new_author,
            new_title,
        } => {
            commands::rename::run(&ctx, &author, &title, &new_author, &new_title)?;
        }
        Commands::Seek {
            author,
            title,
            by,
            fraction,
            track,
            next,
            previous,
            resume,
        } => {
            let target = commands::seek::SeekTarget::from_args(
                by, fraction, track, next, previous, resume,
            )?;
            commands::seek::run(&ctx, &author, &title, target)?;
        }
        Commands::Reset { yes } => {
            commands::reset::run(&ctx, yes)?;
        }
    }

    Ok(())
}

/// Logs go to stderr; RUST_LOG wins over the verbosity flags
fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "audioshelf=debug"
    } else if quiet {
        "audioshelf=warn"
    } else {
        "audioshelf=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
