use super::apply::{self, ChangeRequest};
use crate::args::CartOptions;
use anyhow::{bail, Context, Result};
use cartflash::MapSession;

/// Writes a brand-new map around `request.loader`, discarding whatever map the cart held.
pub fn run(opts: &CartOptions, request: &ChangeRequest) -> Result<()> {
    if request.loader.is_none() {
        bail!("init needs a loader");
    }
    if !request.remove.is_empty() {
        bail!("a new map has nothing to remove");
    }

    let cart = opts.open_or_create()?;
    let session = MapSession::create_empty(cart, request.tools(), request.engine_config(opts.geometry))
        .context("Failed to start a new map")?;
    apply::execute(session, opts, request)
}
