// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! cartflash: map and allocation engine for linear flash carts.
//!
//! A cart starts with a loader followed by a map table that lists the images
//! stored behind it. An operation loads that map, frees the images marked for
//! removal, places new images into the free holes, plans the new layout and
//! burns only the chunks that change.

pub mod burn;
pub mod config;
pub mod device;
pub mod error;
pub mod hole;
pub mod image;
pub mod map;
pub mod placement;
pub mod plan;
pub mod session;

mod buffer;

pub use config::{BurnOrder, CartGeometry, EngineConfig};
pub use device::{BlockDevice, DeviceError, FileCart, MemoryCart};
pub use error::{MapError, Result};
pub use image::{ImageSource, ImageTools, LoaderImage, PendingImage, PlainImages};
pub use session::{MapSession, Outcome};

#[cfg(test)]
pub mod tests;
