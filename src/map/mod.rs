// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-memory map table and its persisted records.

mod entry;
mod loader;
mod locator;

pub use entry::{EntryName, MapEntry};
pub use loader::{create_empty, load};
pub use locator::Locator;

use crate::config::{CartGeometry, EMPTY_MAP_CAPACITY, MAP_MINIMUM_ENTRIES};
use crate::error::{MapError, Result};
use tracing::warn;

/// The loader plus map region at the start of the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapRegion {
    /// Bytes from address 0 to the end of the locator's rom block.
    pub size: u32,
    /// Address of the first table record.
    pub table_location: u32,
    /// Number of table records, terminator included.
    pub capacity: u16,
}

impl MapRegion {
    pub fn table_size(&self) -> u32 {
        self.capacity as u32 * MapEntry::SIZE as u32
    }

    pub fn locator_offset(&self) -> u32 {
        self.table_location + self.table_size()
    }

    pub fn locator(&self) -> Locator {
        Locator::new(self.table_location, self.capacity)
    }
}

/// A live entry plus its removal mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapSlot {
    pub entry: MapEntry,
    pub removed: bool,
}

#[derive(Debug, Clone)]
pub struct CartMap {
    slots: Vec<MapSlot>,
    region: MapRegion,
    fresh: bool,
}

impl CartMap {
    /// Builds a map from live entries, checking ordering and bounds.
    pub fn from_entries(entries: Vec<MapEntry>, region: MapRegion, geometry: &CartGeometry) -> Result<Self> {
        let cart_size = geometry.size;
        if (region.capacity as usize) < MAP_MINIMUM_ENTRIES {
            return Err(MapError::CorruptMap(format!(
                "table capacity {} is below the minimum of {MAP_MINIMUM_ENTRIES}",
                region.capacity
            )));
        }
        if entries.len() > region.capacity as usize {
            return Err(MapError::CorruptMap(format!(
                "{} entries exceed table capacity {}",
                entries.len(),
                region.capacity
            )));
        }
        let mut cursor = region.size;
        for entry in &entries {
            if entry.is_terminator() {
                return Err(MapError::CorruptMap(format!("zero-size entry '{}' inside table", entry.name)));
            }
            if entry.offset % geometry.rom_block_size != 0 {
                return Err(MapError::CorruptMap(format!(
                    "entry '{}' at {:#x} is not aligned to the {:#x} byte rom block",
                    entry.name, entry.offset, geometry.rom_block_size
                )));
            }
            if entry.offset < cursor {
                return Err(MapError::CorruptMap(format!(
                    "entry '{}' at {:#x} overlaps previous data ending at {cursor:#x}",
                    entry.name, entry.offset
                )));
            }
            cursor = entry.offset.checked_add(entry.size).filter(|&end| end <= cart_size).ok_or_else(|| {
                MapError::CorruptMap(format!(
                    "entry '{}' at {:#x} size {:#x} runs past the cart end {cart_size:#x}",
                    entry.name, entry.offset, entry.size
                ))
            })?;
        }
        Ok(Self {
            slots: entries
                .into_iter()
                .map(|entry| MapSlot { entry, removed: false })
                .collect(),
            region,
            fresh: false,
        })
    }

    /// A map with no entries and no loader, for initialising a blank cart.
    pub fn empty() -> Self {
        let capacity = EMPTY_MAP_CAPACITY;
        Self {
            slots: Vec::new(),
            region: MapRegion {
                size: capacity as u32 * MapEntry::SIZE as u32,
                table_location: 0,
                capacity,
            },
            fresh: true,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &MapEntry> + '_ {
        self.slots.iter().map(|slot| &slot.entry)
    }

    pub fn slots(&self) -> &[MapSlot] {
        &self.slots
    }

    pub fn live_count(&self) -> usize {
        self.slots.len()
    }

    pub fn region(&self) -> MapRegion {
        self.region
    }

    /// True for a map synthesised by [`CartMap::empty`]; such a map needs a loader.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn find(&self, name: &str) -> Option<&MapEntry> {
        self.entries().find(|entry| entry.name.matches(name))
    }

    pub fn has_removals(&self) -> bool {
        self.slots.iter().any(|slot| slot.removed)
    }

    /// Marks every entry whose name matches one of `names`.
    ///
    /// Returns the requested names that matched nothing.
    pub fn mark_for_removal<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let mut unmatched = Vec::new();
        for name in names {
            let name = name.as_ref();
            let mut found = false;
            for slot in self.slots.iter_mut().filter(|slot| slot.entry.name.matches(name)) {
                slot.removed = true;
                found = true;
            }
            if !found {
                warn!(name, "image not found in map");
                unmatched.push(name.to_string());
            }
        }
        unmatched
    }

    /// The table as persisted: entries, then zeroed records up to capacity.
    pub fn table_bytes(&self) -> Vec<u8> {
        let kept: Vec<MapEntry> = self
            .slots
            .iter()
            .filter(|slot| !slot.removed)
            .map(|slot| slot.entry)
            .collect();
        encode_table(&kept, self.region.capacity)
    }
}

/// Encodes `entries` into a table of `capacity` records.
pub fn encode_table(entries: &[MapEntry], capacity: u16) -> Vec<u8> {
    let mut table = Vec::with_capacity(capacity as usize * MapEntry::SIZE);
    for entry in entries.iter().take(capacity as usize) {
        table.extend_from_slice(&entry.to_bytes());
    }
    table.resize(capacity as usize * MapEntry::SIZE, 0);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> MapRegion {
        MapRegion {
            size: 0x10000,
            table_location: 0xFB46,
            capacity: 30,
        }
    }

    #[test]
    fn test_rejects_overlapping_entries() {
        let entries = vec![
            MapEntry::new("a", 0x10000, 0x20000),
            MapEntry::new("b", 0x18000, 0x8000),
        ];
        assert!(matches!(
            CartMap::from_entries(entries, region(), &CartGeometry::default()),
            Err(MapError::CorruptMap(_))
        ));
    }

    #[test]
    fn test_rejects_entry_inside_loader_region() {
        let entries = vec![MapEntry::new("a", 0x8000, 0x8000)];
        assert!(CartMap::from_entries(entries, region(), &CartGeometry::default()).is_err());
    }

    #[test]
    fn test_rejects_entry_off_rom_block() {
        let entries = vec![MapEntry::new("a", 0x10000 + 0x400, 0x8000)];
        match CartMap::from_entries(entries, region(), &CartGeometry::default()) {
            Err(MapError::CorruptMap(reason)) => assert!(reason.contains("not aligned")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_mark_for_removal_reports_unmatched() {
        let entries = vec![
            MapEntry::new("a", 0x10000, 0x8000),
            MapEntry::new("b", 0x18000, 0x8000),
            MapEntry::new("a", 0x20000, 0x8000),
        ];
        let mut map = CartMap::from_entries(entries, region(), &CartGeometry::default()).unwrap();
        let unmatched = map.mark_for_removal(&["a", "zelda"]);
        assert_eq!(unmatched, vec!["zelda".to_string()]);
        let removed: Vec<bool> = map.slots().iter().map(|slot| slot.removed).collect();
        assert_eq!(removed, vec![true, false, true]);
        assert!(map.has_removals());
    }

    #[test]
    fn test_encode_table_pads_with_terminators() {
        let table = encode_table(&[MapEntry::new("a", 0x10000, 0x8000)], 3);
        assert_eq!(table.len(), 3 * MapEntry::SIZE);
        assert!(table[MapEntry::SIZE..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_map() {
        let map = CartMap::empty();
        assert!(map.is_fresh());
        assert_eq!(map.live_count(), 0);
        assert_eq!(map.region().size, 8 * 40);
    }
}
