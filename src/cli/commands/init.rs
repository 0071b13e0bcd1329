//! `qcm init` command - start an inspection in the current directory

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::session_error;
use crate::cli::GlobalOpts;
use crate::core::config::Config;
use crate::core::inspection::Inspection;
use crate::core::loader::load_catalog;
use crate::core::workspace::Workspace;
use crate::entities::context::{OrderContext, Phase};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Production order number
    #[arg(long)]
    pub order: String,

    /// Garment color
    #[arg(long)]
    pub color: String,

    /// Sizes of the order, comma separated (default: every catalog size)
    #[arg(long, value_delimiter = ',')]
    pub sizes: Vec<String>,

    /// Pieces measured per size (default from config)
    #[arg(long, short = 'n')]
    pub samples: Option<usize>,

    /// Catalog file for the before-wash phase
    #[arg(long)]
    pub before: Option<PathBuf>,

    /// Catalog file for the after-wash phase
    #[arg(long)]
    pub after: Option<PathBuf>,

    /// Replace an existing session
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, _global: &GlobalOpts) -> Result<()> {
    let root = std::env::current_dir().into_diagnostic()?;
    let config = Config::load(&root).map_err(|e| miette::miette!("{}", e))?;

    if args.samples == Some(0) {
        return Err(miette::miette!("--samples must be at least 1"));
    }
    let samples = args.samples.unwrap_or(config.default_sample_count);
    let sizes: Vec<String> = args
        .sizes
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let context = OrderContext::new(args.order.trim(), args.color.trim());
    let mut inspection = Inspection::new(context.clone(), sizes, samples);

    for (phase, file) in [(Phase::BeforeWash, &args.before), (Phase::AfterWash, &args.after)] {
        if let Some(file) = file {
            let catalog = load_catalog(file)?;
            inspection
                .load_catalog(phase, catalog)
                .map_err(session_error)?;
        }
    }

    let workspace =
        Workspace::init(&root, &inspection, args.force).map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Started inspection {} ({} pieces per size)",
        style("✓").green(),
        style(&context).cyan(),
        samples
    );
    println!("   {}", style(workspace.session_path().display()).dim());
    for book in inspection.phases() {
        println!(
            "   {} catalog: {} points, {} key(s)",
            book.phase().label(),
            book.catalog().flat().len(),
            book.catalog().available_keys().len()
        );
    }
    if inspection.phases().next().is_none() {
        println!(
            "   {} load a catalog with {}",
            style("→").dim(),
            style("qcm catalog load <FILE>").yellow()
        );
    }
    Ok(())
}
