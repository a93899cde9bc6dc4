// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use super::{CartMap, Locator, MapEntry, MapRegion};
use crate::buffer::ChunkBuffer;
use crate::config::{ERASED_BYTE, LOCATOR_WINDOW_SIZE};
use crate::device::BlockDevice;
use crate::error::{MapError, Result};
use std::io::Cursor;
use tracing::{debug, info};

/// Finds the locator by reading the tail of every rom block and loads the table it points at.
pub fn load<D: BlockDevice + ?Sized>(device: &mut D) -> Result<CartMap> {
    let geometry = device.geometry();
    debug!("searching for map locator");

    let mut scanned = 0;
    let mut block_end = geometry.rom_block_size;
    while block_end <= geometry.size {
        scanned += 1;
        let tail = geometry.read_window(block_end - LOCATOR_WINDOW_SIZE..block_end);
        let mut buf = ChunkBuffer::new(tail.clone(), ERASED_BYTE)?;
        buf.load(device, tail)?;
        let raw = buf.slice(block_end - Locator::SIZE as u32..block_end)?;
        let locator = Locator::read_from(raw).map_err(|e| MapError::CorruptMap(e.to_string()))?;

        if locator.is_valid() {
            let region = MapRegion {
                size: block_end,
                table_location: locator.location,
                capacity: locator.number_of_entries,
            };
            info!(
                location = format_args!("{:#x}", region.table_location),
                region_size = format_args!("{:#x}", region.size),
                capacity = region.capacity,
                "map locator found"
            );
            return read_table(device, region);
        }
        block_end += geometry.rom_block_size;
    }
    Err(MapError::NotFound { scanned })
}

fn read_table<D: BlockDevice + ?Sized>(device: &mut D, region: MapRegion) -> Result<CartMap> {
    let geometry = device.geometry();
    // the table must end exactly where the locator starts
    let locator_at = region.size - Locator::SIZE as u32;
    let table_end = region
        .table_location
        .checked_add(region.table_size())
        .filter(|&end| end == locator_at)
        .ok_or_else(|| {
            MapError::CorruptMap(format!(
                "table at {:#x} with {} records does not end at the locator at {locator_at:#x}",
                region.table_location, region.capacity
            ))
        })?;
    let span = region.table_location..table_end;
    let window = geometry.read_window(span.clone());
    let mut buf = ChunkBuffer::new(window.clone(), ERASED_BYTE)?;
    buf.load(device, window)?;

    let mut cursor = Cursor::new(buf.slice(span)?);
    let mut entries = Vec::new();
    for _ in 0..region.capacity {
        let entry = MapEntry::read_from(&mut cursor).map_err(|e| MapError::CorruptMap(e.to_string()))?;
        if entry.is_terminator() {
            break;
        }
        entries.push(entry);
    }
    debug!(live = entries.len(), "map table loaded");
    CartMap::from_entries(entries, region, &geometry)
}

/// Synthesises a blank map; the scan is skipped entirely.
pub fn create_empty() -> CartMap {
    CartMap::empty()
}
