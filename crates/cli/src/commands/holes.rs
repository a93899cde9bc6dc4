use crate::args::CartOptions;
use crate::report::{print_holes, print_json, HolesView};
use anyhow::{Context, Result};
use cartflash::{EngineConfig, ImageSource, MapSession};
use cartflash_rom::GbaImages;
use std::path::PathBuf;

pub fn run(opts: &CartOptions, remove: &[String], loader: Option<PathBuf>) -> Result<()> {
    let cart = opts.open()?;
    let mut session = MapSession::load(cart, GbaImages::default(), EngineConfig::with_geometry(opts.geometry))
        .context("Failed to load cart map")?;

    session.mark_for_removal(remove);
    if let Some(path) = loader {
        session
            .replace_loader_from(ImageSource::File(path.clone()))
            .with_context(|| format!("Failed to read loader {}", path.display()))?;
    }

    let view = HolesView::from(session.build_holes()?);
    if opts.json {
        print_json(&view)
    } else {
        print_holes(&view);
        Ok(())
    }
}
