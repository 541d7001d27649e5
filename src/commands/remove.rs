use anyhow::{Context as _, Result};
use colored::Colorize;

use super::Context;

pub fn run(ctx: &Context, author: &str, title: &str) -> Result<()> {
    let mut store = ctx.open_store()?;
    let book = store
        .delete_audiobook(author, title)
        .with_context(|| format!("Failed to remove {} / {}", author, title))?;

    println!(
        "{} {} / {} ({} tracks)",
        "Removed".green(),
        book.author(),
        book.title(),
        book.tracks().len()
    );
    Ok(())
}
