//! Serializable views of engine state and their table rendering.

use cartflash::burn::BurnReport;
use cartflash::hole::{Hole, HoleReport};
use cartflash::map::{CartMap, MapEntry, MapRegion};
use cartflash::plan::Plan;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RegionView {
    pub size: u32,
    pub table_location: u32,
    pub capacity: u16,
}

impl From<MapRegion> for RegionView {
    fn from(region: MapRegion) -> Self {
        Self {
            size: region.size,
            table_location: region.table_location,
            capacity: region.capacity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EntryView {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

impl From<&MapEntry> for EntryView {
    fn from(entry: &MapEntry) -> Self {
        Self {
            name: entry.name.to_string(),
            offset: entry.offset,
            size: entry.size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HoleView {
    pub offset: u32,
    pub size: u32,
}

impl From<&Hole> for HoleView {
    fn from(hole: &Hole) -> Self {
        Self {
            offset: hole.offset,
            size: hole.size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MapView {
    pub region: RegionView,
    pub entries: Vec<EntryView>,
    pub gaps: Vec<HoleView>,
}

impl MapView {
    pub fn new(map: &CartMap, gaps: &[Hole]) -> Self {
        Self {
            region: map.region().into(),
            entries: map.entries().map(EntryView::from).collect(),
            gaps: gaps.iter().map(HoleView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HolesView {
    pub region: RegionView,
    pub loader_replaced: bool,
    pub free_bytes: u64,
    pub holes: Vec<HoleView>,
}

impl From<&HoleReport> for HolesView {
    fn from(report: &HoleReport) -> Self {
        Self {
            region: report.region().into(),
            loader_replaced: report.loader_replaced(),
            free_bytes: report.free_bytes(),
            holes: report.holes().iter().map(HoleView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActionView {
    pub action: String,
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Serialize)]
pub struct PlanView {
    pub region: RegionView,
    pub actions: Vec<ActionView>,
    pub new_map: Vec<EntryView>,
    pub burned: bool,
    pub writes: usize,
    pub bytes_written: u64,
}

impl PlanView {
    pub fn new(plan: &Plan, burn: Option<&BurnReport>) -> Self {
        Self {
            region: plan.region().into(),
            actions: plan
                .actions()
                .iter()
                .map(|action| ActionView {
                    action: action.kind.to_string(),
                    name: action.name.clone(),
                    offset: action.offset,
                    size: action.size,
                })
                .collect(),
            new_map: plan.new_map().iter().map(EntryView::from).collect(),
            burned: burn.is_some(),
            writes: burn.map_or(0, |report| report.writes),
            bytes_written: burn.map_or(0, |report| report.bytes_written),
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn hex(value: u32) -> String {
    format!("{value:#010x}")
}

fn region_line(region: &RegionView) -> String {
    format!(
        "Loader+map region: {} bytes, table at {} with {} slots",
        hex(region.size),
        hex(region.table_location),
        region.capacity
    )
}

pub fn print_map(view: &MapView) {
    println!("\nCart Map");
    println!("--------");
    println!("{}", region_line(&view.region));

    let mut entries = table(vec!["Name", "Offset", "Size", "End"]);
    for entry in &view.entries {
        entries.add_row(vec![
            entry.name.clone(),
            hex(entry.offset),
            hex(entry.size),
            hex(entry.offset + entry.size),
        ]);
    }
    println!("{entries}\n");

    if view.gaps.is_empty() {
        println!("No free space.\n");
    } else {
        print_hole_table(&view.gaps);
    }
}

pub fn print_holes(view: &HolesView) {
    println!("\nHoles");
    println!("-----");
    println!("{}", region_line(&view.region));
    if view.loader_replaced {
        println!("Loader region resized for the replacement loader.");
    }
    print_hole_table(&view.holes);
    println!("Free: {} bytes\n", view.free_bytes);
}

fn print_hole_table(holes: &[HoleView]) {
    let mut table = table(vec!["Offset", "Size", "End"]);
    for hole in holes {
        table.add_row(vec![hex(hole.offset), hex(hole.size), hex(hole.offset + hole.size)]);
    }
    println!("{table}\n");
}

pub fn print_plan(view: &PlanView) {
    println!("\nChange Plan");
    println!("-----------");
    println!("{}", region_line(&view.region));

    let mut actions = table(vec!["Action", "Name", "Offset", "Size"]);
    for action in &view.actions {
        actions.add_row(vec![
            action.action.clone(),
            action.name.clone(),
            hex(action.offset),
            hex(action.size),
        ]);
    }
    println!("{actions}\n");

    if view.burned {
        println!("Burned {} bytes in {} writes.\n", view.bytes_written, view.writes);
    } else {
        println!("Dry run: cart not modified.\n");
    }
}
