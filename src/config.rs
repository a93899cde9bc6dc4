// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Cart geometry, engine settings and map format constants.

use crate::error::{MapError, Result};
use std::ops::Range;

/// Magic value of the map locator (map format "1F2A-0002").
pub const MAP_MAGIC: u32 = 0x1F2A_0002;

/// Width of the name field of a persisted map entry.
pub const MAP_NAME_LEN: usize = 32;

/// A map table must be able to hold at least this many entries.
pub const MAP_MINIMUM_ENTRIES: usize = 2;

/// Capacity of the synthetic map used when initialising a blank cart.
pub const EMPTY_MAP_CAPACITY: u16 = 8;

/// Size of the window read at the end of each rom block while looking for the locator.
pub const LOCATOR_WINDOW_SIZE: u32 = 1024;

/// Upper bound of a single device write call.
pub const MAX_WRITE_SPAN: u32 = 8 << 20;

/// Byte value of erased flash, used to fill burn buffers.
pub const ERASED_BYTE: u8 = 0xFF;

/// Physical layout constraints of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartGeometry {
    /// Addressable bytes.
    pub size: u32,
    /// Alignment of image start offsets; the loader scans at this stride.
    pub rom_block_size: u32,
    /// Smallest aligned unit the device erases and rewrites.
    pub write_block_size: u32,
    /// Alignment of every read request.
    pub read_block_size: u32,
}

impl Default for CartGeometry {
    fn default() -> Self {
        Self {
            size: 32 << 20,
            rom_block_size: 32 << 10,
            write_block_size: 256 << 10,
            read_block_size: 1 << 10,
        }
    }
}

impl CartGeometry {
    pub fn new(size: u32, rom_block_size: u32, write_block_size: u32, read_block_size: u32) -> Result<Self> {
        let geometry = Self {
            size,
            rom_block_size,
            write_block_size,
            read_block_size,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Geometry from a size expressed in megabits, the unit carts are sold in.
    pub fn from_mbits(size_mbits: u32, rom_block_size: u32, write_block_size: u32) -> Result<Self> {
        let size = size_mbits
            .checked_mul(1 << 17)
            .ok_or_else(|| MapError::Layout(format!("cart size of {size_mbits} Mbit does not fit a u32")))?;
        Self::new(size, rom_block_size, write_block_size, LOCATOR_WINDOW_SIZE)
    }

    pub fn validate(&self) -> Result<()> {
        for (what, value) in [
            ("rom block size", self.rom_block_size),
            ("write block size", self.write_block_size),
            ("read block size", self.read_block_size),
        ] {
            if !value.is_power_of_two() {
                return Err(MapError::Layout(format!("{what} {value:#x} is not a power of two")));
            }
        }
        if self.rom_block_size < self.read_block_size || self.rom_block_size < LOCATOR_WINDOW_SIZE {
            return Err(MapError::Layout(format!(
                "rom block size {:#x} is smaller than the read block or the locator window",
                self.rom_block_size
            )));
        }
        if self.write_block_size < self.read_block_size {
            return Err(MapError::Layout(format!(
                "write block size {:#x} is smaller than the read block size {:#x}",
                self.write_block_size, self.read_block_size
            )));
        }
        if self.size == 0 || self.size % self.rom_block_size != 0 {
            return Err(MapError::Layout(format!(
                "cart size {:#x} is not a non-zero multiple of the rom block size",
                self.size
            )));
        }
        if self.size % self.write_block_size != 0 {
            return Err(MapError::Layout(format!(
                "cart size {:#x} is not a multiple of the write block size {:#x}",
                self.size, self.write_block_size
            )));
        }
        Ok(())
    }

    /// Rounds an image size up to the rom block size.
    pub fn align_rom(&self, size: u32) -> u32 {
        align_up(size, self.rom_block_size)
    }

    /// Expands `span` outward to write block boundaries.
    pub fn burn_window(&self, span: Range<u32>) -> Range<u32> {
        expand(span, self.write_block_size)
    }

    /// Expands `span` outward to read block boundaries.
    pub fn read_window(&self, span: Range<u32>) -> Range<u32> {
        expand(span, self.read_block_size)
    }
}

/// Order in which burn chunks are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BurnOrder {
    /// Loader and map chunk first, then content chunks in address order.
    #[default]
    MapFirst,
    /// Content chunks first; the map is only rewritten once they all succeeded.
    MapLast,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub geometry: CartGeometry,
    /// Placement search refuses more simultaneous images than this.
    pub max_search_images: usize,
    /// A single device write never crosses a multiple of this span.
    pub max_write_span: u32,
    /// Read every written piece back and compare checksums.
    pub verify_writes: bool,
    pub burn_order: BurnOrder,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            geometry: CartGeometry::default(),
            max_search_images: 32,
            max_write_span: MAX_WRITE_SPAN,
            verify_writes: false,
            burn_order: BurnOrder::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_geometry(geometry: CartGeometry) -> Self {
        Self {
            geometry,
            ..Self::default()
        }
    }
}

pub(crate) fn align_up(value: u32, block: u32) -> u32 {
    let mask = block - 1;
    if value & mask == 0 {
        value
    } else {
        (value | mask).saturating_add(1)
    }
}

pub(crate) fn align_down(value: u32, block: u32) -> u32 {
    value & !(block - 1)
}

fn expand(span: Range<u32>, block: u32) -> Range<u32> {
    align_down(span.start, block)..align_up(span.end, block)
}
