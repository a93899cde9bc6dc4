use crate::args::CartOptions;
use crate::report::{print_json, print_map, MapView};
use anyhow::{Context, Result};
use cartflash::{EngineConfig, MapSession, PlainImages};

pub fn run(opts: &CartOptions) -> Result<()> {
    let cart = opts.open()?;
    let mut session = MapSession::load(cart, PlainImages, EngineConfig::with_geometry(opts.geometry))
        .context("Failed to load cart map")?;

    // with nothing requested, the holes are exactly the gaps between entries
    let gaps = session.build_holes()?.holes().to_vec();
    let view = MapView::new(session.map(), &gaps);

    if opts.json {
        print_json(&view)
    } else {
        print_map(&view);
        Ok(())
    }
}
