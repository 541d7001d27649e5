use anyhow::{bail, Result};
use colored::Colorize;
use serde::Serialize;

use audioshelf::catalog::Audiobook;
use audioshelf::playback::format::{self, format_hms};
use audioshelf::playback::PlaybackPosition;

use super::Context;

#[derive(Debug, Serialize)]
struct ChapterView {
    num: i32,
    chapter: String,
    length_ms: i64,
    uri: String,
}

#[derive(Debug, Serialize)]
struct BookView {
    author: String,
    title: String,
    length_ms: i64,
    current_track: usize,
    position_ms: i64,
    remaining_ms: i64,
    multiple_disks: bool,
    cover: Option<String>,
    chapters: Vec<ChapterView>,
}

pub fn run(ctx: &Context, author: &str, title: &str, json: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let Some(book) = store.get(author, title) else {
        bail!("Audiobook not found: {} / {}", author, title);
    };

    if json {
        print_json(book)?;
    } else {
        print_pretty(book, ctx.quiet);
    }

    Ok(())
}

fn print_json(book: &Audiobook) -> Result<()> {
    let position = PlaybackPosition::from_book(book);
    let view = BookView {
        author: book.author().to_string(),
        title: book.title().to_string(),
        length_ms: position.total_length_ms(),
        current_track: position.track(),
        position_ms: position.offset_ms(),
        remaining_ms: position.remaining_ms(),
        multiple_disks: book.multiple_disks(),
        cover: book.cover_art().map(|p| p.display().to_string()),
        chapters: book
            .tracks()
            .iter()
            .map(|t| ChapterView {
                num: t.num,
                chapter: t.chapter_str().to_string(),
                length_ms: t.length_ms,
                uri: t
                    .uri
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn print_pretty(book: &Audiobook, quiet: bool) {
    let position = PlaybackPosition::from_book(book);

    if !quiet {
        println!("{}", format!("{} / {}", book.author(), book.title()).bold());
        println!("{}", "─".repeat(40));
    }

    print_field("Author", Some(book.author()));
    print_field("Title", Some(book.title()));
    print_field("Tracks", Some(&book.tracks().len().to_string()));
    print_field("Length", Some(&format_hms(position.total_length_ms())));
    print_field(
        "Position",
        Some(&format!(
            "track {} at {} of {}",
            position.track() + 1,
            format::current_position(&position),
            format::current_track_length(&position)
        )),
    );
    print_field("Remaining", Some(&format::remaining(&position)));
    if book.multiple_disks() {
        print_field("Disks", Some("multiple"));
    }
    print_field(
        "Cover",
        book.cover_art().map(|p| p.display().to_string()).as_deref(),
    );

    println!();
    println!("{}", "Chapters:".cyan());
    for (i, track) in book.tracks().iter().enumerate() {
        let marker = if i == position.track() { "▶" } else { " " };
        println!(
            "  {} {:>3}. {} ({})",
            marker,
            track.num,
            track.chapter_str(),
            format_hms(track.length_ms)
        );
    }
}

fn print_field(label: &str, value: Option<&str>) {
    if let Some(v) = value {
        println!("{:>12}: {}", label.cyan(), v);
    }
}
