// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Free space derived from the map, with room made for a resized loader region.

use crate::config::{CartGeometry, MAP_MINIMUM_ENTRIES};
use crate::error::{MapError, Result};
use crate::map::{CartMap, Locator, MapEntry, MapRegion};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hole {
    pub offset: u32,
    pub size: u32,
}

impl Hole {
    pub fn end(&self) -> u32 {
        self.offset + self.size
    }
}

/// Holes in ascending order plus the loader region they were computed against.
#[derive(Debug, Clone)]
pub struct HoleReport {
    holes: Vec<Hole>,
    old_region: MapRegion,
    region: MapRegion,
    loader_replaced: bool,
}

impl HoleReport {
    pub fn holes(&self) -> &[Hole] {
        &self.holes
    }

    /// Region as currently on the cart.
    pub fn old_region(&self) -> MapRegion {
        self.old_region
    }

    /// Region after the operation; differs from the old one only when the loader is replaced.
    pub fn region(&self) -> MapRegion {
        self.region
    }

    pub fn loader_replaced(&self) -> bool {
        self.loader_replaced
    }

    pub fn free_bytes(&self) -> u64 {
        self.holes.iter().map(|hole| hole.size as u64).sum()
    }
}

/// Walks the map, folding removed entries into free space.
///
/// With `new_loader_size` (the trimmed size of a replacement loader) the
/// loader region is resized to host the loader plus a table large enough for
/// the current entries, and the first hole is adjusted to match.
pub fn build_holes(map: &CartMap, geometry: &CartGeometry, new_loader_size: Option<u32>) -> Result<HoleReport> {
    let old_region = map.region();
    if map.is_fresh() && new_loader_size.is_none() {
        return Err(MapError::LoaderRequired);
    }

    let mut holes = Vec::new();
    let mut cursor = old_region.size;
    for slot in map.slots().iter().filter(|slot| !slot.removed) {
        let entry = &slot.entry;
        if entry.offset < cursor {
            return Err(MapError::CorruptMap(format!(
                "entry '{}' at {:#x} starts before {cursor:#x}",
                entry.name, entry.offset
            )));
        }
        if entry.offset > cursor {
            holes.push(Hole {
                offset: cursor,
                size: entry.offset - cursor,
            });
        }
        cursor = entry.end();
    }
    if cursor < geometry.size {
        holes.push(Hole {
            offset: cursor,
            size: geometry.size - cursor,
        });
    }

    let Some(loader_size) = new_loader_size else {
        return Ok(HoleReport {
            holes,
            old_region,
            region: old_region,
            loader_replaced: false,
        });
    };

    let region = fit_loader(map, geometry, loader_size, &holes)?;
    if region.size != old_region.size {
        resize_first_hole(&mut holes, old_region.size, region.size);
    }

    Ok(HoleReport {
        holes,
        old_region,
        region,
        loader_replaced: true,
    })
}

fn fit_loader(map: &CartMap, geometry: &CartGeometry, loader_size: u32, holes: &[Hole]) -> Result<MapRegion> {
    let old_size = map.region().size;
    let mut available = old_size;
    if let Some(first) = holes.first().filter(|hole| hole.offset == old_size) {
        available += first.size;
    }

    let wanted = map.live_count().max(MAP_MINIMUM_ENTRIES) as u32;
    let record = MapEntry::SIZE as u32;
    let locator = Locator::SIZE as u32;

    let mut size = geometry.align_rom(loader_size.max(1));
    let mut capacity = (size - loader_size).saturating_sub(locator) / record;
    while capacity < wanted && size < geometry.size {
        size += geometry.rom_block_size;
        capacity = (size - loader_size).saturating_sub(locator) / record;
    }
    let capacity = capacity.min(u16::MAX as u32);

    if size > available || capacity < wanted {
        return Err(MapError::LoaderCapacity {
            needed: size,
            available,
            shortfall: size.saturating_sub(available),
        });
    }

    let region = MapRegion {
        size,
        table_location: size - locator - capacity * record,
        capacity: capacity as u16,
    };
    info!(
        loader_size,
        region_size = format_args!("{size:#x}"),
        capacity = region.capacity,
        "new loader fits"
    );
    Ok(region)
}

fn resize_first_hole(holes: &mut Vec<Hole>, old_size: u32, new_size: u32) {
    match holes.first_mut() {
        Some(first) if first.offset == old_size => {
            debug!("adjusting first hole");
            if new_size > old_size {
                let grown = new_size - old_size;
                first.offset += grown;
                first.size -= grown;
            } else {
                let shrunk = old_size - new_size;
                first.offset -= shrunk;
                first.size += shrunk;
            }
            if first.size == 0 {
                holes.remove(0);
            }
        }
        _ => {
            debug!("inserting a new first hole");
            holes.insert(
                0,
                Hole {
                    offset: new_size,
                    size: old_size - new_size,
                },
            );
        }
    }
}
