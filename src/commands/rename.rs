use anyhow::{Context as _, Result};
use colored::Colorize;

use super::Context;

pub fn run(ctx: &Context, author: &str, title: &str, new_author: &str, new_title: &str) -> Result<()> {
    let mut store = ctx.open_store()?;
    store
        .rename_audiobook(author, title, new_author, new_title)
        .with_context(|| format!("Failed to rename {} / {}", author, title))?;

    println!(
        "{} {} / {} → {} / {}",
        "Renamed".green(),
        author,
        title,
        new_author.trim(),
        new_title.trim()
    );
    Ok(())
}
