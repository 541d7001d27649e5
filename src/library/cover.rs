use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::{debug, warn};

use crate::catalog::Audiobook;
use crate::error::StoreError;
use crate::media::MediaServices;

use super::persist::COVER_FILE_NAME;

/// Find artwork for a book and store it as `cover.jpg` in its directory.
///
/// Embedded art of the first track wins; otherwise the first image file next
/// to that track is used. Returns the written path, or `None` when the book
/// has no artwork anywhere. Only writing the cover can fail.
pub fn resolve_cover_art(
    book: &Audiobook,
    book_dir: &Path,
    media: &dyn MediaServices,
) -> Result<Option<PathBuf>, StoreError> {
    if let Some(existing) = book.cover_art() {
        return Ok(Some(existing.to_path_buf()));
    }

    let Some(first) = book.first_track() else {
        return Ok(None);
    };

    let embedded = first
        .uri
        .as_deref()
        .and_then(|uri| media.embedded_cover_art(uri))
        .and_then(|bytes| media.decode_image(&bytes));

    let image = match embedded {
        Some(image) => Some(image),
        None => first
            .containing_dir()
            .and_then(|dir| sibling_image(dir, media)),
    };

    let Some(image) = image else {
        debug!("No cover art for {} / {}", book.author(), book.title());
        return Ok(None);
    };

    let dest = book_dir.join(COVER_FILE_NAME);
    write_jpeg(&image, &dest)?;
    Ok(Some(dest))
}

/// First image in `dir` by file name that decodes
fn sibling_image(dir: &Path, media: &dyn MediaServices) -> Option<DynamicImage> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not list {:?} for cover art: {}", dir, e);
            return None;
        }
    };

    let mut images: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && media.is_image(p))
        .collect();
    images.sort();

    let path = images.into_iter().next()?;
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Could not read cover art {:?}: {}", path, e);
            return None;
        }
    };
    media.decode_image(&bytes)
}

fn write_jpeg(image: &DynamicImage, dest: &Path) -> Result<(), StoreError> {
    let file = File::create(dest).map_err(|e| StoreError::io(dest, e))?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, 100)
        .encode_image(&image.to_rgb8())
        .map_err(|source| StoreError::Image {
            path: dest.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TrackInfo;
    use image::{ImageFormat, RgbImage};

    struct FakeMedia {
        embedded: Option<Vec<u8>>,
    }

    impl MediaServices for FakeMedia {
        fn probe_duration_ms(&self, _: &Path) -> Option<i64> {
            Some(1)
        }

        fn embedded_cover_art(&self, _: &Path) -> Option<Vec<u8>> {
            self.embedded.clone()
        }
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = std::io::Cursor::new(Vec::new());
        RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10]))
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    fn book_in(dir: &Path) -> Audiobook {
        let uri = dir.join("01.mp3");
        fs::write(&uri, b"x").unwrap();
        let mut track = TrackInfo::new(uri, Some(dir.to_path_buf()));
        track.num = 1;
        track.chapter = Some("One".to_string());
        let mut book = Audiobook::new("Author", "Book");
        book.add_track(track);
        book
    }

    #[test]
    fn test_embedded_art_written_as_jpeg() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let book = book_in(temp.path());
        let media = FakeMedia {
            embedded: Some(png_bytes()),
        };

        let cover = resolve_cover_art(&book, &out, &media).unwrap().unwrap();
        assert_eq!(cover, out.join(COVER_FILE_NAME));
        assert_eq!(image::open(&cover).unwrap().width(), 4);
    }

    #[test]
    fn test_falls_back_to_sibling_image() {
        let temp = tempfile::tempdir().unwrap();
        let out = temp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        let book = book_in(temp.path());
        fs::write(temp.path().join("b.png"), png_bytes()).unwrap();
        fs::write(temp.path().join("a.jpg"), b"not an image").unwrap();
        let media = FakeMedia { embedded: None };

        // a.jpg sorts first but doesn't decode, so there is no cover
        assert!(resolve_cover_art(&book, &out, &media).unwrap().is_none());

        fs::remove_file(temp.path().join("a.jpg")).unwrap();
        assert!(resolve_cover_art(&book, &out, &media).unwrap().is_some());
    }

    #[test]
    fn test_no_art_anywhere() {
        let temp = tempfile::tempdir().unwrap();
        let book = book_in(temp.path());
        let media = FakeMedia { embedded: None };
        assert!(resolve_cover_art(&book, temp.path(), &media)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_write_failure_surfaces() {
        let temp = tempfile::tempdir().unwrap();
        let book = book_in(temp.path());
        let media = FakeMedia {
            embedded: Some(png_bytes()),
        };
        let missing = temp.path().join("missing");
        assert!(resolve_cover_art(&book, &missing, &media).is_err());
    }
}
