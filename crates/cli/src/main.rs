use anyhow::Context;
use cartflash::CartGeometry;
use cartflash_cli::args::{parse_add, parse_size, AddSpec, CartOptions};
use cartflash_cli::commands::apply::ChangeRequest;
use cartflash_cli::commands::{apply, holes, init, scan, show};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "cartflash")]
#[command(about = "Manage the image map of a linear flash cart dump", long_about = None)]
struct Cli {
    /// Cart dump file to operate on
    #[arg(long, global = true, default_value = "cart.bin")]
    cart: PathBuf,

    /// Cart size in megabits
    #[arg(long, global = true, default_value_t = 256)]
    size_mbits: u32,

    /// Image alignment on the cart (e.g. 32kB)
    #[arg(long, global = true, default_value = "32kB", value_parser = parse_size)]
    rom_block: u32,

    /// Smallest unit the cart rewrites (e.g. 256kB)
    #[arg(long, global = true, default_value = "256kB", value_parser = parse_size)]
    write_block: u32,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// More log output; repeat for more detail
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct ChangeArgs {
    /// Image to add, optionally with a map name: file[,name]
    #[arg(long, value_parser = parse_add)]
    add: Vec<AddSpec>,

    /// Keep images at full size instead of dropping trailing padding
    #[arg(long)]
    no_trim: bool,

    /// Plan only; leave the cart untouched
    #[arg(long)]
    dry_run: bool,

    /// Burn the loader and map after every image
    #[arg(long)]
    map_last: bool,

    /// Read every write back and compare checksums
    #[arg(long)]
    verify: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the map: loader region, entries and gaps
    Show,
    /// Print free space after optional removals and loader replacement
    Holes {
        /// Name of an entry to free
        #[arg(long)]
        remove: Vec<String>,

        /// Replacement loader file
        #[arg(long)]
        loader: Option<PathBuf>,
    },
    /// Change the cart: remove entries, add images, replace the loader
    Apply {
        /// Name of an entry to remove
        #[arg(long)]
        remove: Vec<String>,

        /// Replacement loader file
        #[arg(long)]
        loader: Option<PathBuf>,

        #[command(flatten)]
        changes: ChangeArgs,
    },
    /// Start a new map around a loader, then add any images
    Init {
        /// Loader file
        #[arg(long)]
        loader: PathBuf,

        #[command(flatten)]
        changes: ChangeArgs,
    },
    /// Look for image headers at every rom block
    Scan,
}

fn request(changes: ChangeArgs, remove: Vec<String>, loader: Option<PathBuf>) -> ChangeRequest {
    ChangeRequest {
        add: changes.add,
        remove,
        loader,
        dry_run: changes.dry_run,
        map_last: changes.map_last,
        verify: changes.verify,
        no_trim: changes.no_trim,
    }
}

fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let geometry = CartGeometry::from_mbits(cli.size_mbits, cli.rom_block, cli.write_block)
        .context("Invalid cart geometry")?;
    let opts = CartOptions {
        cart: cli.cart,
        geometry,
        json: cli.json,
    };

    match cli.command {
        Commands::Show => show::run(&opts),
        Commands::Holes { remove, loader } => holes::run(&opts, &remove, loader),
        Commands::Apply {
            remove,
            loader,
            changes,
        } => apply::run(&opts, &request(changes, remove, loader)),
        Commands::Init { loader, changes } => init::run(&opts, &request(changes, Vec::new(), Some(loader))),
        Commands::Scan => scan::run(&opts),
    }
}
