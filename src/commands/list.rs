//! List command - show every audiobook in the catalog

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use audioshelf::catalog::Audiobook;
use audioshelf::playback::format::format_hms;
use audioshelf::playback::PlaybackPosition;

use super::Context;

/// One catalog entry as printed by `list --json`
#[derive(Debug, Serialize)]
pub struct BookSummary {
    pub author: String,
    pub title: String,
    pub tracks: usize,
    pub length_ms: i64,
    pub current_track: usize,
    pub position_ms: i64,
    pub elapsed_ms: i64,
    pub multiple_disks: bool,
    pub cover: Option<String>,
}

impl BookSummary {
    pub fn new(book: &Audiobook) -> Self {
        let position = PlaybackPosition::from_book(book);
        Self {
            author: book.author().to_string(),
            title: book.title().to_string(),
            tracks: book.tracks().len(),
            length_ms: position.total_length_ms(),
            current_track: position.track(),
            position_ms: position.offset_ms(),
            elapsed_ms: position.elapsed_ms(),
            multiple_disks: book.multiple_disks(),
            cover: book.cover_art().map(|p| p.display().to_string()),
        }
    }

    fn progress_percent(&self) -> i64 {
        if self.length_ms <= 0 {
            return 0;
        }
        self.elapsed_ms * 100 / self.length_ms
    }

    fn details(&self) -> String {
        format!(
            "{} tracks, {}, {}%",
            self.tracks,
            format_hms(self.length_ms),
            self.progress_percent()
        )
    }
}

pub fn run(ctx: &Context, json: bool, tree: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let books: Vec<BookSummary> = store.audiobooks().into_iter().map(BookSummary::new).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&books)?);
        return Ok(());
    }

    if books.is_empty() {
        if !ctx.quiet {
            println!("No audiobooks in catalog");
        }
        return Ok(());
    }

    if tree {
        print!("{}", render_tree(&books, store.data_dir()));
        return Ok(());
    }

    for book in &books {
        println!(
            "{} {} {}",
            book.author.cyan(),
            "/".dimmed(),
            book.title.bold()
        );
        println!("    {}", book.details());
    }

    if !ctx.quiet {
        println!();
        println!("{} audiobooks", books.len());
    }
    Ok(())
}

/// Render the catalog as an author/title tree
pub fn render_tree(books: &[BookSummary], root: &Path) -> String {
    let mut output = String::new();
    output.push_str(&format!("{}/\n", root.display()));

    let mut authors: BTreeMap<&str, Vec<&BookSummary>> = BTreeMap::new();
    for book in books {
        authors.entry(book.author.as_str()).or_default().push(book);
    }

    let count = authors.len();
    for (i, (author, titles)) in authors.iter().enumerate() {
        let is_last = i == count - 1;
        let connector = if is_last { "└── " } else { "├── " };
        let child_prefix = if is_last { "    " } else { "│   " };
        output.push_str(&format!("{}{}/\n", connector, author));

        let title_count = titles.len();
        for (j, book) in titles.iter().enumerate() {
            let connector = if j == title_count - 1 {
                "└── "
            } else {
                "├── "
            };
            output.push_str(&format!(
                "{}{}{} ({})\n",
                child_prefix,
                connector,
                book.title,
                book.details()
            ));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(author: &str, title: &str) -> BookSummary {
        BookSummary {
            author: author.to_string(),
            title: title.to_string(),
            tracks: 2,
            length_ms: 4000,
            current_track: 1,
            position_ms: 1000,
            elapsed_ms: 3000,
            multiple_disks: false,
            cover: None,
        }
    }

    #[test]
    fn test_render_tree() {
        let books = vec![
            summary("Author A", "Title 1"),
            summary("Author A", "Title 2"),
            summary("Author B", "Title 3"),
        ];

        let tree = render_tree(&books, Path::new("/data"));

        assert!(tree.starts_with("/data/\n"));
        assert!(tree.contains("├── Author A/\n"));
        assert!(tree.contains("│   ├── Title 1 (2 tracks, 0h:0m:4s, 75%)\n"));
        assert!(tree.contains("│   └── Title 2"));
        assert!(tree.contains("└── Author B/\n"));
        assert!(tree.contains("    └── Title 3"));
    }

    #[test]
    fn test_progress_of_unknown_length() {
        let mut book = summary("A", "T");
        book.length_ms = 0;
        assert_eq!(book.progress_percent(), 0);
    }
}
