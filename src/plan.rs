// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Merge of the original map, holes and placement into one ordered action list.

use crate::error::{MapError, Result};
use crate::hole::HoleReport;
use crate::image::PendingImage;
use crate::map::{CartMap, MapEntry, MapRegion};
use crate::placement::Placement;
use std::fmt;
use tracing::{debug, info};

/// Name given to the loader and map pseudo-entry at offset 0.
pub const LOADER_ACTION_NAME: &str = "Loader+map";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Keep,
    Remove,
    Add,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Keep => "keep",
            Self::Remove => "remove",
            Self::Add => "add",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeAction {
    pub kind: ActionKind,
    pub name: String,
    pub offset: u32,
    pub size: u32,
    /// Index of the pending image an `Add` burns.
    pub image: Option<usize>,
}

impl ChangeAction {
    pub fn end(&self) -> u32 {
        self.offset + self.size
    }
}

/// The complete new cart layout.
#[derive(Debug, Clone)]
pub struct Plan {
    actions: Vec<ChangeAction>,
    new_map: Vec<MapEntry>,
    old_region: MapRegion,
    region: MapRegion,
    loader_replaced: bool,
}

impl Plan {
    /// Actions in address order; index 0 is always the loader and map region.
    pub fn actions(&self) -> &[ChangeAction] {
        &self.actions
    }

    /// Entries of the table to persist, loader excluded.
    pub fn new_map(&self) -> &[MapEntry] {
        &self.new_map
    }

    pub fn old_region(&self) -> MapRegion {
        self.old_region
    }

    pub fn region(&self) -> MapRegion {
        self.region
    }

    pub fn loader_replaced(&self) -> bool {
        self.loader_replaced
    }

    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|action| action.kind == kind).count()
    }
}

/// Walks map entries and holes together in address order.
///
/// A hole is consumed when it starts before the next entry, or at the offset
/// of a removed entry; its images are laid out back to back from its start.
/// A removed entry yields `Remove` only if no added image already covers its
/// start.
pub fn build_plan(map: &CartMap, holes: &HoleReport, images: &[PendingImage], placement: &Placement) -> Result<Plan> {
    let region = holes.region();
    let slots = map.slots();
    let hole_list = holes.holes();

    let mut actions = Vec::with_capacity(1 + slots.len() + images.len());
    actions.push(ChangeAction {
        kind: ActionKind::Keep,
        name: LOADER_ACTION_NAME.to_string(),
        offset: 0,
        size: region.size,
        image: None,
    });

    let mut next_slot = 0;
    let mut next_hole = 0;
    let mut add_cursor: Option<u32> = None;

    while next_slot < slots.len() || next_hole < hole_list.len() {
        let slot = slots.get(next_slot);
        let hole_first = match (hole_list.get(next_hole), slot) {
            (Some(_), None) => true,
            (Some(hole), Some(slot)) => {
                hole.offset < slot.entry.offset || (hole.offset == slot.entry.offset && slot.removed)
            }
            (None, _) => false,
        };

        if hole_first {
            let hole = hole_list[next_hole];
            let mut offset = hole.offset;
            for (index, image) in images.iter().enumerate() {
                if placement.hole_of(index) != Some(next_hole) {
                    continue;
                }
                actions.push(ChangeAction {
                    kind: ActionKind::Add,
                    name: image.name.clone(),
                    offset,
                    size: image.size,
                    image: Some(index),
                });
                offset += image.size;
            }
            if offset > hole.end() {
                return Err(MapError::Layout(format!(
                    "images placed in hole {next_hole} end at {offset:#x}, past the hole end {:#x}",
                    hole.end()
                )));
            }
            add_cursor = Some(offset);
            next_hole += 1;
        } else if let Some(slot) = slot {
            let entry = &slot.entry;
            if !slot.removed {
                actions.push(ChangeAction {
                    kind: ActionKind::Keep,
                    name: entry.name.to_string(),
                    offset: entry.offset,
                    size: entry.size,
                    image: None,
                });
            } else if add_cursor.map_or(true, |cursor| cursor <= entry.offset) {
                actions.push(ChangeAction {
                    kind: ActionKind::Remove,
                    name: entry.name.to_string(),
                    offset: entry.offset,
                    size: entry.size,
                    image: None,
                });
            } else {
                debug!(name = %entry.name, "removed entry already overwritten");
            }
            next_slot += 1;
        }
    }

    let new_map: Vec<MapEntry> = actions[1..]
        .iter()
        .filter(|action| action.kind != ActionKind::Remove)
        .map(|action| MapEntry::new(action.name.as_str(), action.offset, action.size))
        .collect();
    if new_map.len() > region.capacity as usize {
        return Err(MapError::TableCapacity {
            entries: new_map.len(),
            capacity: region.capacity as usize,
        });
    }

    for action in &actions {
        debug!(
            action = %action.kind,
            name = %action.name,
            offset = format_args!("{:#x}", action.offset),
            size = format_args!("{:#x}", action.size),
            "planned"
        );
    }
    let plan = Plan {
        actions,
        new_map,
        old_region: holes.old_region(),
        region,
        loader_replaced: holes.loader_replaced(),
    };
    info!(
        keep = plan.count(ActionKind::Keep) - 1,
        add = plan.count(ActionKind::Add),
        remove = plan.count(ActionKind::Remove),
        "change plan built"
    );
    Ok(plan)
}
