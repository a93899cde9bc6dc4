// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! One map operation from load to burn.

use crate::burn::{self, BurnReport};
use crate::config::EngineConfig;
use crate::device::BlockDevice;
use crate::error::{MapError, Result};
use crate::hole::{build_holes, HoleReport};
use crate::image::{ImageSource, ImageTools, LoaderImage, PendingImage};
use crate::map::{self, CartMap};
use crate::placement::{place, Placement};
use crate::plan::{build_plan, Plan};
use tracing::info;

#[derive(Debug)]
pub enum Outcome {
    /// No removal matched, no loader and no image was supplied; the cart was not touched.
    NothingToDo,
    Burned(BurnReport),
}

/// Owns every piece of state for a single operation.
///
/// Stages run in order and each one consumes the previous stage's result:
/// holes, placement, plan, burn. Requesting a later stage runs the missing
/// earlier ones. Changing the request (removals, loader, images) discards
/// anything already derived from it.
pub struct MapSession<D, T> {
    device: D,
    tools: T,
    config: EngineConfig,
    map: CartMap,
    loader: Option<LoaderImage>,
    images: Vec<PendingImage>,
    something_to_do: bool,
    holes: Option<HoleReport>,
    placement: Option<Placement>,
    plan: Option<Plan>,
}

impl<D: BlockDevice, T: ImageTools> MapSession<D, T> {
    /// Loads the map currently on the cart.
    pub fn load(mut device: D, tools: T, config: EngineConfig) -> Result<Self> {
        config.geometry.validate()?;
        device.connect()?;
        let map = map::load(&mut device)?;
        Ok(Self::with_map(device, tools, config, map))
    }

    /// Starts from a blank map; a loader must be supplied before planning.
    pub fn create_empty(mut device: D, tools: T, config: EngineConfig) -> Result<Self> {
        config.geometry.validate()?;
        device.connect()?;
        Ok(Self::with_map(device, tools, config, map::create_empty()))
    }

    fn with_map(device: D, tools: T, config: EngineConfig, map: CartMap) -> Self {
        Self {
            device,
            tools,
            config,
            map,
            loader: None,
            images: Vec::new(),
            something_to_do: false,
            holes: None,
            placement: None,
            plan: None,
        }
    }

    pub fn map(&self) -> &CartMap {
        &self.map
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn images(&self) -> &[PendingImage] {
        &self.images
    }

    pub fn loader(&self) -> Option<&LoaderImage> {
        self.loader.as_ref()
    }

    /// Returns the names that matched no entry.
    pub fn mark_for_removal<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let unmatched = self.map.mark_for_removal(names);
        if unmatched.len() < names.len() {
            self.something_to_do = true;
            self.invalidate();
        }
        unmatched
    }

    pub fn replace_loader(&mut self, loader: LoaderImage) {
        info!(loader = %loader.name, "loader will be replaced");
        self.loader = Some(loader);
        self.something_to_do = true;
        self.invalidate();
    }

    pub fn replace_loader_from(&mut self, source: ImageSource) -> Result<()> {
        let loader = LoaderImage::prepare(source, &self.tools)?;
        self.replace_loader(loader);
        Ok(())
    }

    pub fn add_image(&mut self, image: PendingImage) {
        info!(name = %image.name, size = format_args!("{:#x}", image.size), "image queued");
        self.images.push(image);
        self.something_to_do = true;
        self.invalidate();
    }

    /// Prepares `source` with the session's tools and queues it.
    pub fn add_image_from(&mut self, source: ImageSource, user_name: Option<String>) -> Result<&PendingImage> {
        let image = PendingImage::prepare(source, user_name, &self.tools, &self.config.geometry)?;
        self.add_image(image);
        Ok(&self.images[self.images.len() - 1])
    }

    pub fn has_changes(&self) -> bool {
        self.something_to_do
    }

    pub fn build_holes(&mut self) -> Result<&HoleReport> {
        if self.holes.is_none() {
            let loader_size = self.loader.as_ref().map(|loader| loader.trimmed_size);
            self.holes = Some(build_holes(&self.map, &self.config.geometry, loader_size)?);
        }
        self.holes
            .as_ref()
            .ok_or_else(|| MapError::Layout("holes missing after build".to_string()))
    }

    pub fn place(&mut self) -> Result<&Placement> {
        if self.placement.is_none() {
            let holes = self.build_holes()?.holes().to_vec();
            self.placement = Some(place(&self.images, &holes, self.config.max_search_images)?);
        }
        self.placement
            .as_ref()
            .ok_or_else(|| MapError::Layout("placement missing after search".to_string()))
    }

    pub fn build_plan(&mut self) -> Result<&Plan> {
        if self.plan.is_none() {
            self.place()?;
            let (Some(holes), Some(placement)) = (&self.holes, &self.placement) else {
                return Err(MapError::Layout("plan requested without holes and placement".to_string()));
            };
            self.plan = Some(build_plan(&self.map, holes, &self.images, placement)?);
        }
        self.plan
            .as_ref()
            .ok_or_else(|| MapError::Layout("plan missing after build".to_string()))
    }

    /// Runs any stage not yet run and burns the result.
    pub fn execute_plan(&mut self) -> Result<Outcome> {
        if !self.something_to_do {
            info!("nothing to do");
            return Ok(Outcome::NothingToDo);
        }
        self.build_plan()?;
        let Some(plan) = &self.plan else {
            return Err(MapError::Layout("plan missing before burn".to_string()));
        };
        let report = burn::execute(
            &mut self.device,
            plan,
            &self.images,
            self.loader.as_ref(),
            &self.tools,
            &self.config,
        )?;
        Ok(Outcome::Burned(report))
    }

    /// Hands the device back, dropping all operation state.
    pub fn into_device(self) -> D {
        self.device
    }

    fn invalidate(&mut self) {
        self.holes = None;
        self.placement = None;
        self.plan = None;
    }
}
