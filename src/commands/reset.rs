use anyhow::{Context as _, Result};
use colored::Colorize;
use std::io::{self, Write};

use super::Context;

pub fn run(ctx: &Context, yes: bool) -> Result<()> {
    let mut store = ctx.open_store()?;
    let count = store.audiobooks().len();

    if !yes {
        print!(
            "Delete the catalog at {} ({} audiobooks)? [y/N] ",
            store.data_dir().display(),
            count
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    store.wipe().context("Failed to wipe library")?;
    println!("{} {} audiobooks", "Deleted".green(), count);
    Ok(())
}
