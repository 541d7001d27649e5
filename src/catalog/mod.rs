//! In-memory catalog model: tracks, audiobooks and the author/title hierarchy

mod audiobook;
mod track;

use std::collections::BTreeMap;

pub use audiobook::Audiobook;
pub use track::{TrackInfo, UNKNOWN};

/// Author name to title to audiobook, ordered for stable listing and layout
pub type Catalog = BTreeMap<String, BTreeMap<String, Audiobook>>;

/// Get or create the book for an (author, title) pair
pub fn book_entry<'a>(catalog: &'a mut Catalog, author: &str, title: &str) -> &'a mut Audiobook {
    catalog
        .entry(author.to_string())
        .or_default()
        .entry(title.to_string())
        .or_insert_with(|| Audiobook::new(author, title))
}

/// Remove a book, dropping the author key once it has no titles left
pub fn remove_book(catalog: &mut Catalog, author: &str, title: &str) -> Option<Audiobook> {
    let books = catalog.get_mut(author)?;
    let removed = books.remove(title);
    if books.is_empty() {
        catalog.remove(author);
    }
    removed
}

/// Number of books across all authors
pub fn book_count(catalog: &Catalog) -> usize {
    catalog.values().map(BTreeMap::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_entry_creates_once() {
        let mut catalog = Catalog::new();
        book_entry(&mut catalog, "Author", "Book").set_current_track(2);
        assert_eq!(book_entry(&mut catalog, "Author", "Book").current_track(), 2);
        assert_eq!(book_count(&catalog), 1);
    }

    #[test]
    fn test_remove_book_drops_empty_author() {
        let mut catalog = Catalog::new();
        book_entry(&mut catalog, "Author", "One");
        book_entry(&mut catalog, "Author", "Two");

        assert!(remove_book(&mut catalog, "Author", "One").is_some());
        assert!(catalog.contains_key("Author"));

        assert!(remove_book(&mut catalog, "Author", "Two").is_some());
        assert!(!catalog.contains_key("Author"));

        assert!(remove_book(&mut catalog, "Author", "Two").is_none());
    }
}
