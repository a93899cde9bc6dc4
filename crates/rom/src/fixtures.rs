use crate::error::Result;
use crate::header::correct_header;
use crate::tools::GbaImages;
use cartflash::{CartGeometry, EngineConfig, FileCart, ImageSource, MapSession};

use std::fs;
use std::path::{Path, PathBuf};

/// 32 Mbit cart with 32 KiB rom blocks and 64 KiB write blocks.
pub fn fixture_geometry() -> CartGeometry {
    CartGeometry {
        size: 4 << 20,
        rom_block_size: 32 << 10,
        write_block_size: 64 << 10,
        read_block_size: 1 << 10,
    }
}

pub struct TestPaths {
    pub cart: PathBuf,
    pub loader: PathBuf,
    /// Images already burned, in the order they were added.
    pub roms: Vec<PathBuf>,
    /// An image that is not on the cart yet.
    pub spare: PathBuf,
}

/// Non-uniform payload followed by erased padding, with a valid header.
pub fn make_rom(title: &str, payload: usize, padding: usize) -> Vec<u8> {
    let mut rom: Vec<u8> = (0..payload).map(|i| (i % 251) as u8).collect();
    rom.resize(payload + padding, 0xFF);
    correct_header(&mut rom, title, true);
    rom
}

pub fn generate_test_scenario(dir: &Path) -> Result<TestPaths> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    // 1. Loader and image files
    let loader_path = dir.join("loader.bin");
    let loader: Vec<u8> = (0..6000).map(|i| (i % 13) as u8 + 1).collect();
    fs::write(&loader_path, &loader)?;

    let alpha = dir.join("alpha.gba");
    fs::write(&alpha, make_rom("ALPHA", 100_000, 28_000))?;
    let beta = dir.join("beta.gba");
    fs::write(&beta, make_rom("BETA", 40_000, 0))?;
    let spare = dir.join("gamma.gba");
    fs::write(&spare, make_rom("GAMMA", 70_000, 60_000))?;

    // 2. Blank cart dump, initialised with the loader and the first two images
    let cart_path = dir.join("cart.bin");
    let geometry = fixture_geometry();
    let cart = FileCart::create(&cart_path, geometry)?;
    let mut session = MapSession::create_empty(cart, GbaImages::default(), EngineConfig::with_geometry(geometry))?;
    session.replace_loader_from(ImageSource::File(loader_path.clone()))?;
    session.add_image_from(ImageSource::File(alpha.clone()), None)?;
    session.add_image_from(ImageSource::File(beta.clone()), None)?;
    session.execute_plan()?;

    Ok(TestPaths {
        cart: cart_path,
        loader: loader_path,
        roms: vec![alpha, beta],
        spare,
    })
}
