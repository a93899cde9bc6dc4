// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Cart fixtures shared by the stage tests.

use crate::config::CartGeometry;
use crate::device::MemoryCart;
use crate::image::{ImageSource, PendingImage};
use crate::map::{encode_table, Locator, MapEntry, MapRegion};

pub const KIB: u32 = 1 << 10;
pub const MIB: u32 = 1 << 20;

/// Byte the fake loader is made of.
pub const LOADER_BYTE: u8 = 0x4C;

/// 32 MiB cart, 32 KiB rom block, 256 KiB write block.
pub fn big_geometry() -> CartGeometry {
    CartGeometry::default()
}

/// 1 MiB cart, 32 KiB rom block, 64 KiB write block.
pub fn small_geometry() -> CartGeometry {
    CartGeometry::new(MIB, 32 * KIB, 64 * KIB, KIB).unwrap()
}

/// Region of `size` bytes whose table of `capacity` records ends right before the locator.
pub fn region(size: u32, capacity: u16) -> MapRegion {
    MapRegion {
        size,
        table_location: size - Locator::SIZE as u32 - capacity as u32 * MapEntry::SIZE as u32,
        capacity,
    }
}

/// Content byte stored in the `index`-th fixture entry.
pub fn entry_byte(index: usize) -> u8 {
    0x10 + index as u8
}

/// Lays out a loader, a map table and the entries' content directly in the cart.
pub fn format_cart(cart: &mut MemoryCart, region: MapRegion, entries: &[MapEntry]) {
    let bytes = cart.bytes_mut();
    bytes[..KIB as usize].fill(LOADER_BYTE);
    let table = encode_table(entries, region.capacity);
    let location = region.table_location as usize;
    bytes[location..location + table.len()].copy_from_slice(&table);
    let locator = region.locator_offset() as usize;
    bytes[locator..locator + Locator::SIZE].copy_from_slice(&region.locator().to_bytes());
    for (index, entry) in entries.iter().enumerate() {
        bytes[entry.offset as usize..entry.end() as usize].fill(entry_byte(index));
    }
}

pub fn formatted_cart(geometry: CartGeometry, region: MapRegion, entries: &[MapEntry]) -> MemoryCart {
    let mut cart = MemoryCart::new(geometry);
    format_cart(&mut cart, region, entries);
    cart.clear_log();
    cart
}

/// An image whose content is `size` copies of `fill`, already padded.
pub fn image(name: &str, size: u32, fill: u8) -> PendingImage {
    PendingImage::with_size(name, ImageSource::memory(name, vec![fill; size as usize]), size, size)
}

/// An image sized only, for placement tests that never burn.
pub fn sized(name: &str, size: u32) -> PendingImage {
    PendingImage::with_size(name, ImageSource::memory(name, Vec::new()), size, size)
}
