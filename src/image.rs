// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Images requested for insertion and the collaborators that prepare them.

use crate::config::CartGeometry;
use crate::error::{MapError, Result};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where an image's bytes come from. Content is loaded twice: once to size
/// it, once more at burn time.
#[derive(Clone)]
pub enum ImageSource {
    File(PathBuf),
    Memory { label: String, data: Vec<u8> },
}

impl ImageSource {
    pub fn memory(label: impl Into<String>, data: Vec<u8>) -> Self {
        Self::Memory {
            label: label.into(),
            data,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Memory { label, .. } => label.clone(),
        }
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Memory { label, data } => f
                .debug_struct("Memory")
                .field("label", label)
                .field("len", &data.len())
                .finish(),
        }
    }
}

/// Image handling the engine delegates: loading, trimming, naming and header fix-ups.
///
/// The defaults treat images as opaque bytes.
pub trait ImageTools {
    fn load_image(&self, source: &ImageSource) -> io::Result<Vec<u8>> {
        match source {
            ImageSource::File(path) => std::fs::read(path),
            ImageSource::Memory { data, .. } => Ok(data.clone()),
        }
    }

    /// Usable size of `image` once trailing padding is dropped.
    fn trim(&self, image: &[u8]) -> usize {
        image.len()
    }

    /// Normalises embedded metadata in place before the image is burned.
    fn correct_header(&self, _image: &mut [u8], _name: &str, _force_name: bool) {}

    /// Name to record in the map when the user gave none.
    fn image_name(&self, _image: &[u8], source: &ImageSource) -> String {
        match source {
            ImageSource::File(path) => file_stem(path),
            ImageSource::Memory { label, .. } => label.clone(),
        }
    }
}

/// Opaque images: no trimming, no header correction.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainImages;

impl ImageTools for PlainImages {}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub(crate) fn load_with<T: ImageTools + ?Sized>(tools: &T, source: &ImageSource, name: &str) -> Result<Vec<u8>> {
    let data = tools.load_image(source).map_err(|source| MapError::Image {
        name: name.to_string(),
        source,
    })?;
    if data.is_empty() {
        return Err(MapError::Image {
            name: name.to_string(),
            source: io::Error::new(io::ErrorKind::InvalidData, "image is empty"),
        });
    }
    u32::try_from(data.len()).map_err(|_| MapError::Image {
        name: name.to_string(),
        source: io::Error::new(io::ErrorKind::InvalidData, "image exceeds the 32-bit address space"),
    })?;
    Ok(data)
}

/// One image waiting to be placed.
#[derive(Debug, Clone)]
pub struct PendingImage {
    pub source: ImageSource,
    /// Name recorded in the map.
    pub name: String,
    /// Set when the user chose the name; it then also overrides the embedded title.
    pub user_name: Option<String>,
    /// File size before trimming.
    pub original_size: u32,
    /// Trimmed size rounded up to the rom block.
    pub size: u32,
}

impl PendingImage {
    pub fn prepare<T: ImageTools + ?Sized>(
        source: ImageSource,
        user_name: Option<String>,
        tools: &T,
        geometry: &CartGeometry,
    ) -> Result<Self> {
        let label = source.label();
        let data = load_with(tools, &source, &label)?;
        let original_size = data.len() as u32;
        let trimmed = tools.trim(&data).clamp(1, data.len()) as u32;
        let size = geometry.align_rom(trimmed);
        let name = match &user_name {
            Some(name) => name.clone(),
            None => tools.image_name(&data, &source),
        };
        debug!(
            file = %label,
            name = %name,
            original_size,
            size = format_args!("{size:#x}"),
            "image prepared"
        );
        Ok(Self {
            source,
            name,
            user_name,
            original_size,
            size,
        })
    }

    /// Sized directly, for callers that already know the padded size.
    pub fn with_size(name: impl Into<String>, source: ImageSource, original_size: u32, size: u32) -> Self {
        Self {
            source,
            name: name.into(),
            user_name: None,
            original_size,
            size,
        }
    }

    pub fn header_name(&self) -> &str {
        self.user_name.as_deref().unwrap_or(&self.name)
    }
}

/// A replacement loader, held in memory until the map chunk is burned.
#[derive(Debug, Clone)]
pub struct LoaderImage {
    pub name: String,
    pub data: Vec<u8>,
    pub trimmed_size: u32,
}

impl LoaderImage {
    pub fn prepare<T: ImageTools + ?Sized>(source: ImageSource, tools: &T) -> Result<Self> {
        let name = source.label();
        let data = load_with(tools, &source, &name)?;
        let trimmed_size = tools.trim(&data).clamp(1, data.len()) as u32;
        debug!(loader = %name, size = data.len(), trimmed_size, "loader prepared");
        Ok(Self {
            name,
            data,
            trimmed_size,
        })
    }

    pub fn trimmed(&self) -> &[u8] {
        &self.data[..self.trimmed_size as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DropTrailingZeros;

    impl ImageTools for DropTrailingZeros {
        fn trim(&self, image: &[u8]) -> usize {
            image.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1)
        }
    }

    #[test]
    fn test_prepare_aligns_trimmed_size() {
        let geometry = CartGeometry::default();
        let mut data = vec![0x42u8; 40_000];
        data.extend(vec![0u8; 100_000]);
        let image = PendingImage::prepare(ImageSource::memory("demo", data), None, &DropTrailingZeros, &geometry).unwrap();
        assert_eq!(image.original_size, 140_000);
        assert_eq!(image.size, 64 << 10);
        assert_eq!(image.name, "demo");
        assert_eq!(image.header_name(), "demo");
    }

    #[test]
    fn test_user_name_wins() {
        let geometry = CartGeometry::default();
        let image = PendingImage::prepare(
            ImageSource::memory("demo", vec![1; 10]),
            Some("Renamed".to_string()),
            &PlainImages,
            &geometry,
        )
        .unwrap();
        assert_eq!(image.name, "Renamed");
        assert_eq!(image.size, 32 << 10);
    }

    #[test]
    fn test_empty_image_rejected() {
        let geometry = CartGeometry::default();
        let result = PendingImage::prepare(ImageSource::memory("void", Vec::new()), None, &PlainImages, &geometry);
        assert!(matches!(result, Err(MapError::Image { .. })));
    }

    #[test]
    fn test_missing_file_reports_name() {
        let geometry = CartGeometry::default();
        let source = ImageSource::File(PathBuf::from("/nonexistent/game.gba"));
        match PendingImage::prepare(source, None, &PlainImages, &geometry) {
            Err(MapError::Image { name, .. }) => assert!(name.contains("game.gba")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
