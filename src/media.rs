//! Media capabilities the catalog consumes but does not implement itself:
//! opening files, probing decoded length, pulling embedded cover art and
//! decoding images.

use std::fs::File;
use std::io;
use std::path::Path;

use image::DynamicImage;
use lofty::picture::PictureType;
use lofty::prelude::*;
use tracing::debug;

pub trait MediaServices: Send + Sync {
    /// Open a readable handle for a locator
    fn open(&self, locator: &Path) -> io::Result<File> {
        File::open(locator)
    }

    /// Decoded duration in milliseconds, `None` if the file can't be decoded
    fn probe_duration_ms(&self, locator: &Path) -> Option<i64>;

    /// Raw bytes of the picture embedded in the file's tags
    fn embedded_cover_art(&self, locator: &Path) -> Option<Vec<u8>>;

    /// Decode an image byte stream into a bitmap
    fn decode_image(&self, bytes: &[u8]) -> Option<DynamicImage> {
        image::load_from_memory(bytes).ok()
    }

    /// Whether a file looks like an image by its type
    fn is_image(&self, path: &Path) -> bool {
        mime_guess::from_path(path)
            .first()
            .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE)
    }
}

/// Media services backed by lofty's tag and property readers
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyMedia;

impl MediaServices for LoftyMedia {
    fn probe_duration_ms(&self, locator: &Path) -> Option<i64> {
        match lofty::read_from_path(locator) {
            Ok(tagged) => Some(tagged.properties().duration().as_millis() as i64),
            Err(e) => {
                debug!("Could not probe duration of {:?}: {}", locator, e);
                None
            }
        }
    }

    fn embedded_cover_art(&self, locator: &Path) -> Option<Vec<u8>> {
        let tagged = lofty::read_from_path(locator).ok()?;
        let tag = tagged.primary_tag().or_else(|| tagged.first_tag())?;
        let pictures = tag.pictures();
        pictures
            .iter()
            .find(|p| p.pic_type() == PictureType::CoverFront)
            .or_else(|| pictures.first())
            .map(|p| p.data().to_vec())
    }
}
