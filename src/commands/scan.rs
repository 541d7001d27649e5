//! Scan command - walk a directory and merge its audiobooks into the catalog

use anyhow::{Context as _, Result};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use audioshelf::catalog;
use audioshelf::extract::{DecoderProcess, FifoChannel};
use audioshelf::media::LoftyMedia;
use audioshelf::scan::Scanner;

use super::Context;

pub fn run(ctx: &Context, dir: &Path) -> Result<()> {
    let root = dir
        .canonicalize()
        .with_context(|| format!("Cannot scan {:?}", dir))?;

    let mut store = ctx.open_store()?;
    let fifo = ctx.fifo()?;

    let decoder = if ctx.config.decoder.command.is_empty() {
        None
    } else {
        Some(
            DecoderProcess::launch(&ctx.config.decoder.command, &fifo)
                .context("Failed to start tag decoder")?,
        )
    };
    let mut channel = FifoChannel::connect(&fifo, ctx.config.fifo_timeout())
        .context("Tag decoder is not available")?;
    if let Some(decoder) = &decoder {
        channel = channel.watching(decoder.watch());
    }

    if !ctx.quiet {
        println!("Scanning {}...", root.display());
    }

    let scanner = Scanner::new(Arc::new(LoftyMedia), ctx.config.scan_settings());
    let scanned = scanner
        .scan_directory(&root, Box::new(channel), decoder)
        .with_context(|| format!("Scan of {:?} failed, library left unchanged", root))?;
    let found = catalog::book_count(&scanned);

    let report = store.merge(scanned).context("Failed to save library")?;

    println!(
        "{} {} audiobooks ({} new, {} replaced)",
        "Found".green(),
        found,
        report.added,
        report.replaced
    );
    if report.removed_invalid > 0 {
        println!(
            "{} {} invalid audiobooks",
            "Removed".yellow(),
            report.removed_invalid
        );
    }
    if !ctx.quiet {
        println!(
            "Library now has {} audiobooks ({} with cover art)",
            store.audiobooks().len(),
            report.covers
        );
    }

    Ok(())
}
