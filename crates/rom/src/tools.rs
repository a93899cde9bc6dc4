use crate::header::{self, romname};
use crate::name::filename_to_romname;
use cartflash::{ImageSource, ImageTools};
use tracing::trace;

/// Size of `rom` once the trailing run of its final byte is cut down to one copy.
pub fn trim(rom: &[u8]) -> usize {
    let Some(&last) = rom.last() else {
        return 0;
    };
    if rom.len() < 2 {
        return rom.len();
    }
    let mut keep = rom.len() - 2;
    while keep > 0 && rom[keep] == last {
        keep -= 1;
    }
    keep + 2
}

/// GBA image handling: padding trim, header correction and title-based naming.
#[derive(Debug, Clone, Copy)]
pub struct GbaImages {
    pub trim_allowed: bool,
}

impl Default for GbaImages {
    fn default() -> Self {
        Self { trim_allowed: true }
    }
}

impl ImageTools for GbaImages {
    fn trim(&self, image: &[u8]) -> usize {
        if self.trim_allowed {
            trim(image)
        } else {
            image.len()
        }
    }

    fn correct_header(&self, image: &mut [u8], name: &str, force_name: bool) {
        trace!(name, force_name, "updating header");
        header::correct_header(image, name, force_name);
    }

    fn image_name(&self, image: &[u8], source: &ImageSource) -> String {
        let title = romname(image);
        if !title.is_empty() {
            return title;
        }
        filename_to_romname(&source.label())
    }
}
