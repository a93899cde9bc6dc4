use crate::args::{AddSpec, CartOptions};
use crate::report::{print_json, print_plan, PlanView};
use anyhow::{Context, Result};
use cartflash::{BlockDevice, BurnOrder, CartGeometry, EngineConfig, ImageSource, MapSession, Outcome};
use cartflash_rom::GbaImages;
use std::path::PathBuf;
use tracing::info;

/// Everything one `apply` or `init` invocation asks for.
#[derive(Debug, Clone, Default)]
pub struct ChangeRequest {
    pub add: Vec<AddSpec>,
    pub remove: Vec<String>,
    pub loader: Option<PathBuf>,
    pub dry_run: bool,
    pub map_last: bool,
    pub verify: bool,
    pub no_trim: bool,
}

impl ChangeRequest {
    pub fn engine_config(&self, geometry: CartGeometry) -> EngineConfig {
        EngineConfig {
            verify_writes: self.verify,
            burn_order: if self.map_last {
                BurnOrder::MapLast
            } else {
                BurnOrder::MapFirst
            },
            ..EngineConfig::with_geometry(geometry)
        }
    }

    pub fn tools(&self) -> GbaImages {
        GbaImages {
            trim_allowed: !self.no_trim,
        }
    }
}

pub fn run(opts: &CartOptions, request: &ChangeRequest) -> Result<()> {
    let cart = opts.open()?;
    let session = MapSession::load(cart, request.tools(), request.engine_config(opts.geometry))
        .context("Failed to load cart map")?;
    execute(session, opts, request)
}

/// Queues the request on `session`, plans it and burns unless this is a dry run.
pub(crate) fn execute<D: BlockDevice>(
    mut session: MapSession<D, GbaImages>,
    opts: &CartOptions,
    request: &ChangeRequest,
) -> Result<()> {
    session.mark_for_removal(request.remove.as_slice());

    if let Some(path) = &request.loader {
        session
            .replace_loader_from(ImageSource::File(path.clone()))
            .with_context(|| format!("Failed to read loader {}", path.display()))?;
    }
    for add in &request.add {
        let image = session
            .add_image_from(ImageSource::File(add.path.clone()), add.name.clone())
            .with_context(|| format!("Failed to read image {}", add.path.display()))?;
        info!(name = %image.name, file = %add.path.display(), "image added");
    }

    if !session.has_changes() {
        if opts.json {
            return print_json(&serde_json::json!({ "burned": false, "actions": [] }));
        }
        println!("\nNothing to do.\n");
        return Ok(());
    }

    let plan = session.build_plan().context("Failed to plan the new layout")?.clone();
    let burn = if request.dry_run {
        None
    } else {
        match session.execute_plan().context("Burn failed")? {
            Outcome::Burned(report) => Some(report),
            Outcome::NothingToDo => None,
        }
    };

    let view = PlanView::new(&plan, burn.as_ref());
    if opts.json {
        print_json(&view)
    } else {
        print_plan(&view);
        Ok(())
    }
}
