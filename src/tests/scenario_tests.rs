// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! 256 Mbit cart: loader and map in the first 64 KiB, one 4 MiB image behind it.

use super::support::*;
use crate::burn::burn_chunks;
use crate::config::EngineConfig;
use crate::hole::Hole;
use crate::image::PlainImages;
use crate::map::MapEntry;
use crate::plan::ActionKind;
use crate::session::{MapSession, Outcome};

#[test]
fn test_add_one_image_behind_existing_entry() {
    let geometry = big_geometry();
    let config = EngineConfig::with_geometry(geometry);
    let mut cart = formatted_cart(geometry, region(64 * KIB, 40), &[MapEntry::new("Big", 64 * KIB, 4 * MIB)]);

    let mut session = MapSession::load(&mut cart, PlainImages, config.clone()).unwrap();
    session.add_image(image("New", MIB, 0x5E));

    let holes = session.build_holes().unwrap();
    assert_eq!(
        holes.holes(),
        &[Hole {
            offset: 4 * MIB + 64 * KIB,
            size: 28 * MIB - 64 * KIB,
        }]
    );

    assert_eq!(session.place().unwrap().assignment(), &[0]);

    let plan = session.build_plan().unwrap().clone();
    let actions: Vec<(ActionKind, u32, u32)> = plan.actions().iter().map(|a| (a.kind, a.offset, a.size)).collect();
    assert_eq!(
        actions,
        vec![
            (ActionKind::Keep, 0, 64 * KIB),
            (ActionKind::Keep, 64 * KIB, 4 * MIB),
            (ActionKind::Add, 4 * MIB + 64 * KIB, MIB),
        ]
    );

    let chunks = burn_chunks(&plan, &config).unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].window, 0..256 * KIB);
    assert_eq!(chunks[1].window, 4 * MIB..5 * MIB + 256 * KIB);

    let Outcome::Burned(report) = session.execute_plan().unwrap() else {
        panic!("expected a burn");
    };
    assert_eq!(report.writes, 2);
    drop(session);

    assert_eq!(cart.writes(), &[0..256 * KIB, 4 * MIB..5 * MIB + 256 * KIB]);
    let bytes = cart.bytes();
    let new_at = (4 * MIB + 64 * KIB) as usize;
    assert_eq!(bytes[new_at - 1], entry_byte(0), "tail of the 4 MiB image survives");
    assert_eq!(bytes[new_at], 0x5E);
    assert_eq!(bytes[new_at + MIB as usize - 1], 0x5E);
    assert_eq!(bytes[new_at + MIB as usize], 0xFF);
    assert_eq!(bytes[64 * KIB as usize], entry_byte(0), "head of the 4 MiB image kept as a border");

    let session = MapSession::load(&mut cart, PlainImages, config).unwrap();
    let entries: Vec<MapEntry> = session.map().entries().copied().collect();
    assert_eq!(
        entries,
        vec![
            MapEntry::new("Big", 64 * KIB, 4 * MIB),
            MapEntry::new("New", 4 * MIB + 64 * KIB, MIB),
        ]
    );
}

#[test]
fn test_image_across_write_span_boundary_is_split() {
    let geometry = big_geometry();
    let config = EngineConfig::with_geometry(geometry);
    let mut cart = formatted_cart(geometry, region(64 * KIB, 40), &[MapEntry::new("Big", 64 * KIB, 6 * MIB)]);

    let mut session = MapSession::load(&mut cart, PlainImages, config).unwrap();
    session.add_image(image("Wide", 4 * MIB, 0x31));
    session.execute_plan().unwrap();
    drop(session);

    let start = 6 * MIB + 64 * KIB;
    assert_eq!(
        cart.writes(),
        &[0..256 * KIB, 6 * MIB..8 * MIB, 8 * MIB..10 * MIB + 256 * KIB]
    );
    assert_eq!(cart.bytes()[start as usize], 0x31);
}
