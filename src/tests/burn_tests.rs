// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use super::support::*;
use crate::burn::{burn_chunks, execute};
use crate::config::{BurnOrder, CartGeometry, EngineConfig};
use crate::device::{BlockDevice, DeviceError, DeviceResult, MemoryCart};
use crate::error::MapError;
use crate::hole::build_holes;
use crate::image::{ImageSource, ImageTools, LoaderImage, PendingImage, PlainImages};
use crate::map::{self, MapEntry};
use crate::placement::place;
use crate::plan::{build_plan, Plan};

fn config() -> EngineConfig {
    EngineConfig::with_geometry(small_geometry())
}

fn plan_on(cart: &mut MemoryCart, removals: &[&str], images: &[PendingImage], loader: Option<&LoaderImage>) -> Plan {
    let mut loaded = map::load(cart).unwrap();
    loaded.mark_for_removal(removals);
    let holes = build_holes(&loaded, &cart.geometry(), loader.map(|l| l.trimmed_size)).unwrap();
    let placement = place(images, holes.holes(), 32).unwrap();
    let plan = build_plan(&loaded, &holes, images, &placement).unwrap();
    cart.clear_log();
    plan
}

/// a at 64K..128K, b at 160K..192K, one 32K hole between them.
fn two_entry_cart() -> MemoryCart {
    formatted_cart(
        small_geometry(),
        region(64 * KIB, 20),
        &[
            MapEntry::new("a", 64 * KIB, 64 * KIB),
            MapEntry::new("b", 160 * KIB, 32 * KIB),
        ],
    )
}

#[test]
fn test_map_and_content_burn_separately() {
    let mut cart = two_entry_cart();
    let images = [image("x", 32 * KIB, 0x77)];
    let plan = plan_on(&mut cart, &[], &images, None);

    let chunks = burn_chunks(&plan, &config()).unwrap();
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].includes_map());
    assert_eq!(chunks[0].span.start, plan.region().table_location);
    assert_eq!(chunks[0].window, 0..64 * KIB);
    assert_eq!(chunks[1].span, 128 * KIB..160 * KIB);
    assert_eq!(chunks[1].window, 128 * KIB..192 * KIB);

    let report = execute(&mut cart, &plan, &images, None, &PlainImages, &config()).unwrap();
    assert_eq!(report.writes, 2);
    assert_eq!(cart.writes(), &[0..64 * KIB, 128 * KIB..192 * KIB]);

    let bytes = cart.bytes();
    assert!(bytes[..KIB as usize].iter().all(|&b| b == LOADER_BYTE), "loader preserved");
    assert!(bytes[(128 * KIB) as usize..(160 * KIB) as usize].iter().all(|&b| b == 0x77));
    assert!(
        bytes[(160 * KIB) as usize..(192 * KIB) as usize].iter().all(|&b| b == entry_byte(1)),
        "neighbour preserved"
    );

    let reloaded = map::load(&mut cart).unwrap();
    let names: Vec<String> = reloaded.entries().map(|e| e.name.to_string()).collect();
    assert_eq!(names, vec!["a", "x", "b"]);
}

#[test]
fn test_adds_right_after_loader_join_map_chunk() {
    let mut cart = formatted_cart(
        small_geometry(),
        region(64 * KIB, 20),
        &[MapEntry::new("a", 128 * KIB, 64 * KIB)],
    );
    let images = [image("x", 32 * KIB, 0x21)];
    let plan = plan_on(&mut cart, &[], &images, None);
    assert_eq!(plan.actions()[1].offset, 64 * KIB);

    let chunks = burn_chunks(&plan, &config()).unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].actions, 0..=1);
    assert_eq!(chunks[0].window, 0..128 * KIB);

    execute(&mut cart, &plan, &images, None, &PlainImages, &config()).unwrap();
    assert_eq!(cart.writes(), &[0..128 * KIB]);
    assert_eq!(cart.bytes()[(64 * KIB) as usize], 0x21);
    assert_eq!(cart.bytes()[0], LOADER_BYTE);
}

#[test]
fn test_map_only_burn_for_removal() {
    let mut cart = two_entry_cart();
    let plan = plan_on(&mut cart, &["b"], &[], None);
    execute(&mut cart, &plan, &[], None, &PlainImages, &config()).unwrap();
    assert_eq!(cart.writes(), &[0..64 * KIB]);
    // removed content is not rewritten
    assert_eq!(cart.bytes()[(160 * KIB) as usize], entry_byte(1));

    let reloaded = map::load(&mut cart).unwrap();
    assert_eq!(reloaded.live_count(), 1);
    assert!(reloaded.find("b").is_none());
}

#[test]
fn test_short_image_padded_with_last_byte() {
    let geometry = small_geometry();
    let mut cart = two_entry_cart();
    let mut data = vec![0x33u8; 20_000];
    data[19_999] = 0xAB;
    let images = [PendingImage::prepare(ImageSource::memory("pad", data), None, &PlainImages, &geometry).unwrap()];
    assert_eq!(images[0].size, 32 * KIB);
    let plan = plan_on(&mut cart, &[], &images, None);

    execute(&mut cart, &plan, &images, None, &PlainImages, &config()).unwrap();
    let base = (128 * KIB) as usize;
    let bytes = cart.bytes();
    assert_eq!(bytes[base + 19_998], 0x33);
    assert!(bytes[base + 19_999..base + (32 * KIB) as usize].iter().all(|&b| b == 0xAB));
}

struct StampingTools;

impl ImageTools for StampingTools {
    fn correct_header(&self, image: &mut [u8], name: &str, force_name: bool) {
        image[..name.len()].copy_from_slice(name.as_bytes());
        image[name.len()] = force_name as u8;
    }
}

#[test]
fn test_header_correction_receives_name_and_force_flag() {
    let geometry = small_geometry();
    let mut cart = two_entry_cart();
    let images = [
        PendingImage::prepare(ImageSource::memory("auto", vec![0x55; 1000]), None, &StampingTools, &geometry).unwrap(),
        PendingImage::prepare(
            ImageSource::memory("forced", vec![0x55; 1000]),
            Some("Chosen".to_string()),
            &StampingTools,
            &geometry,
        )
        .unwrap(),
    ];
    let mut loaded = map::load(&mut cart).unwrap();
    loaded.mark_for_removal(&["b"]);
    let holes = build_holes(&loaded, &geometry, None).unwrap();
    let placement = place(&images, holes.holes(), 32).unwrap();
    let plan = build_plan(&loaded, &holes, &images, &placement).unwrap();

    execute(&mut cart, &plan, &images, None, &StampingTools, &config()).unwrap();
    for action in plan.actions().iter().filter(|a| a.image.is_some()) {
        let at = action.offset as usize;
        let bytes = cart.bytes();
        match action.name.as_str() {
            "auto" => assert_eq!(&bytes[at..at + 5], b"auto\0"),
            "Chosen" => assert_eq!(&bytes[at..at + 7], b"Chosen\x01"),
            other => panic!("unexpected add {other}"),
        }
    }
}

#[test]
fn test_map_last_order() {
    let mut cart = two_entry_cart();
    let images = [image("x", 32 * KIB, 0x77)];
    let plan = plan_on(&mut cart, &[], &images, None);
    let config = EngineConfig {
        burn_order: BurnOrder::MapLast,
        ..config()
    };
    execute(&mut cart, &plan, &images, None, &PlainImages, &config).unwrap();
    assert_eq!(cart.writes(), &[128 * KIB..192 * KIB, 0..64 * KIB]);
}

#[test]
fn test_writes_split_at_span_boundaries() {
    let mut cart = formatted_cart(
        small_geometry(),
        region(64 * KIB, 20),
        &[MapEntry::new("a", 64 * KIB, 64 * KIB)],
    );
    let images = [image("big", 192 * KIB, 0x42)];
    let plan = plan_on(&mut cart, &[], &images, None);
    let config = EngineConfig {
        max_write_span: 128 * KIB,
        ..config()
    };
    let report = execute(&mut cart, &plan, &images, None, &PlainImages, &config).unwrap();
    assert_eq!(
        cart.writes(),
        &[0..64 * KIB, 128 * KIB..256 * KIB, 256 * KIB..320 * KIB]
    );
    assert_eq!(report.writes, 3);
    assert_eq!(report.bytes_written, (64 + 192) as u64 * KIB as u64);
}

#[test]
fn test_rejects_bad_write_span() {
    let mut cart = two_entry_cart();
    let plan = plan_on(&mut cart, &["b"], &[], None);
    let config = EngineConfig {
        max_write_span: 48 * KIB,
        ..config()
    };
    assert!(matches!(
        execute(&mut cart, &plan, &[], None, &PlainImages, &config),
        Err(MapError::Layout(_))
    ));
    assert!(cart.writes().is_empty());
}

#[test]
fn test_failure_leaves_earlier_chunks_burned() {
    let mut cart = two_entry_cart();
    let images = [image("x", 32 * KIB, 0x77)];
    let plan = plan_on(&mut cart, &[], &images, None);
    cart.fail_write_at(1);

    let result = execute(&mut cart, &plan, &images, None, &PlainImages, &config());
    assert!(matches!(result, Err(MapError::Device(DeviceError::Failed { .. }))));
    assert_eq!(cart.writes(), &[0..64 * KIB]);
    assert_eq!(cart.bytes()[(128 * KIB) as usize], 0xFF);
}

/// Flips the first byte of every write.
struct CorruptingCart(MemoryCart);

impl BlockDevice for CorruptingCart {
    fn geometry(&self) -> CartGeometry {
        self.0.geometry()
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> DeviceResult<()> {
        self.0.read(address, buf)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> DeviceResult<()> {
        let mut data = data.to_vec();
        data[0] ^= 0xFF;
        self.0.write(address, &data)
    }
}

#[test]
fn test_verify_detects_corruption() {
    let mut cart = two_entry_cart();
    let plan = plan_on(&mut cart, &["b"], &[], None);
    let config = EngineConfig {
        verify_writes: true,
        ..config()
    };

    let mut good = cart.clone();
    execute(&mut good, &plan, &[], None, &PlainImages, &config).unwrap();

    let mut bad = CorruptingCart(cart);
    match execute(&mut bad, &plan, &[], None, &PlainImages, &config) {
        Err(MapError::VerifyMismatch { address, expected, found }) => {
            assert_eq!(address, 0);
            assert_ne!(expected, found);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_new_loader_written_at_start() {
    let mut cart = two_entry_cart();
    let loader = LoaderImage::prepare(ImageSource::memory("loader", vec![0x99; 3000]), &PlainImages).unwrap();
    let plan = plan_on(&mut cart, &[], &[], Some(&loader));
    assert_eq!(plan.region().size, 32 * KIB);

    execute(&mut cart, &plan, &[], Some(&loader), &PlainImages, &config()).unwrap();
    assert_eq!(cart.writes(), &[0..64 * KIB]);
    assert!(cart.bytes()[..3000].iter().all(|&b| b == 0x99));

    let reloaded = map::load(&mut cart).unwrap();
    assert_eq!(reloaded.region(), plan.region());
    assert_eq!(reloaded.live_count(), 2);
}

#[test]
fn test_missing_loader_is_an_error() {
    let mut cart = two_entry_cart();
    let loader = LoaderImage::prepare(ImageSource::memory("loader", vec![0x99; 3000]), &PlainImages).unwrap();
    let plan = plan_on(&mut cart, &[], &[], Some(&loader));
    assert!(matches!(
        execute(&mut cart, &plan, &[], None, &PlainImages, &config()),
        Err(MapError::LoaderRequired)
    ));
}

/// 96 KiB cart whose end is not on a 64 KiB write block; a at 32K..64K.
fn ragged_cart() -> (MemoryCart, EngineConfig) {
    let geometry = CartGeometry {
        size: 96 * KIB,
        ..small_geometry()
    };
    let cart = formatted_cart(geometry, region(32 * KIB, 4), &[MapEntry::new("a", 32 * KIB, 32 * KIB)]);
    (cart, EngineConfig::with_geometry(geometry))
}

#[test]
fn test_window_past_cart_end_fails_before_any_write() {
    let (mut cart, config) = ragged_cart();
    let images = [image("tail", 32 * KIB, 0x3C)];
    let plan = plan_on(&mut cart, &[], &images, None);
    assert!(matches!(burn_chunks(&plan, &config), Err(MapError::Layout(_))));

    let result = execute(&mut cart, &plan, &images, None, &PlainImages, &config);
    assert!(matches!(result, Err(MapError::Layout(_))));
    assert!(cart.writes().is_empty(), "map must not list an unburned image");

    let reloaded = map::load(&mut cart).unwrap();
    let names: Vec<String> = reloaded.entries().map(|e| e.name.to_string()).collect();
    assert_eq!(names, vec!["a"]);
}
