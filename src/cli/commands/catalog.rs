//! `qcm catalog` command - load and browse measurement point catalogs

use clap::Subcommand;
use console::style;
use miette::Result;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::helpers::{session_error, truncate_str, SessionContext};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::table::Listing;
use crate::cli::GlobalOpts;
use crate::core::catalog::SpecCatalog;
use crate::core::loader::{load_catalog, read_raw_catalog};
use crate::entities::spec::ToleranceKey;

#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// Load a catalog file (YAML, JSON or CSV) into the current phase
    Load(LoadArgs),

    /// List tolerance keys in catalog order
    Keys,

    /// List the points measured under a key
    Points(PointsArgs),

    /// List catalog sizes
    Sizes,

    /// Check a catalog file without loading it
    Check(CheckArgs),
}

#[derive(clap::Args, Debug)]
pub struct LoadArgs {
    /// Catalog file
    pub file: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct PointsArgs {
    /// Tolerance key (default: the first key)
    #[arg(long, short = 'k')]
    pub key: Option<String>,

    /// Show nominal and tolerance values for this size
    #[arg(long, short = 's')]
    pub size: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Catalog file
    pub file: PathBuf,
}

pub fn run(cmd: CatalogCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CatalogCommands::Load(args) => run_load(args, global),
        CatalogCommands::Keys => run_keys(global),
        CatalogCommands::Points(args) => run_points(args, global),
        CatalogCommands::Sizes => run_sizes(global),
        CatalogCommands::Check(args) => run_check(args),
    }
}

fn run_load(args: LoadArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = SessionContext::open(global)?;
    let catalog = load_catalog(&args.file)?;
    let malformed = catalog.malformed().len();
    let points = catalog.flat().len();
    let keys = catalog.available_keys();

    ctx.inspection
        .load_catalog(ctx.phase, catalog)
        .map_err(session_error)?;
    ctx.save()?;

    println!(
        "{} Loaded {} points for {} ({})",
        style("✓").green(),
        points,
        style(ctx.phase.label()).cyan(),
        keys.iter().map(|k| k.label()).collect::<Vec<_>>().join(", ")
    );
    if malformed > 0 {
        println!(
            "   {} {} spec value(s) could not be parsed; run {} for details",
            style("!").yellow(),
            malformed,
            style("qcm catalog check").yellow()
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct KeyRow {
    key: ToleranceKey,
    label: String,
    points: usize,
}

fn run_keys(global: &GlobalOpts) -> Result<()> {
    let ctx = SessionContext::open(global)?;
    let catalog = ctx.book()?.catalog();
    let rows: Vec<KeyRow> = catalog
        .available_keys()
        .into_iter()
        .map(|key| KeyRow {
            points: catalog.point_count(&key),
            label: key.label(),
            key,
        })
        .collect();

    let format = effective_format(global.output, true);
    if print_structured(&rows, format)? {
        return Ok(());
    }
    let mut listing = Listing::new(&["KEY", "LABEL", "POINTS"]);
    for row in &rows {
        listing.push(vec![row.key.to_string(), row.label.clone(), row.points.to_string()]);
    }
    listing.print(format);
    Ok(())
}

fn resolve_key(catalog: &SpecCatalog, key: Option<&str>) -> Result<ToleranceKey> {
    let keys = catalog.available_keys();
    match key {
        Some(key) => {
            let key = ToleranceKey::new(key);
            if catalog.has_key(&key) {
                Ok(key)
            } else {
                Err(miette::miette!(
                    "Tolerance key {} is not in the catalog (available: {})",
                    key,
                    keys.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ")
                ))
            }
        }
        None => keys
            .into_iter()
            .next()
            .ok_or_else(|| miette::miette!("The catalog has no points")),
    }
}

fn run_points(args: PointsArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = SessionContext::open(global)?;
    let catalog = ctx.book()?.catalog();
    let key = resolve_key(catalog, args.key.as_deref())?;
    let points = catalog.points_for(&key);

    let format = effective_format(global.output, true);
    if print_structured(&points, format)? {
        return Ok(());
    }

    let mut headers = vec!["#", "ID", "POINT", "LOCAL", "KEY"];
    if args.size.is_some() {
        headers.extend(["NOMINAL", "TOL-", "TOL+"]);
    }
    let mut listing = Listing::new(&headers);
    for (index, point) in points.iter().enumerate() {
        let mut row = vec![
            (index + 1).to_string(),
            point.point_id.clone(),
            truncate_str(&point.name_eng, 40),
            point.name_local.clone().unwrap_or_default(),
            point.tolerance_key.label(),
        ];
        if let Some(size) = &args.size {
            match point.size_spec(size) {
                Some(spec) => row.extend([
                    spec.nominal.to_string(),
                    spec.tol_minus.signed_display('-'),
                    spec.tol_plus.signed_display('+'),
                ]),
                None => row.extend(["-".to_string(), "-".to_string(), "-".to_string()]),
            }
        }
        listing.push(row);
    }
    listing.print(format);
    Ok(())
}

fn run_sizes(global: &GlobalOpts) -> Result<()> {
    let ctx = SessionContext::open(global)?;
    let sizes = ctx.book()?.catalog().sizes();
    let format = effective_format(global.output, true);
    if print_structured(&sizes, format)? {
        return Ok(());
    }
    let mut listing = Listing::new(&["SIZE", "IN ORDER"]);
    let order = ctx.inspection.sizes();
    for size in sizes {
        let in_order = order.is_empty() || order.contains(size);
        listing.push(vec![size.clone(), if in_order { "yes" } else { "no" }.to_string()]);
    }
    listing.print(format);
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<()> {
    let raw = read_raw_catalog(&args.file)?;
    let catalog = SpecCatalog::load(raw);
    let malformed = catalog.malformed();

    println!(
        "{} {}: {} points, {} sizes, keys {}",
        style("→").blue(),
        args.file.display(),
        catalog.flat().len(),
        catalog.sizes().len(),
        catalog
            .available_keys()
            .iter()
            .map(|k| k.label())
            .collect::<Vec<_>>()
            .join(", ")
    );

    if malformed.is_empty() {
        println!("{} All spec values parse", style("✓").green());
        return Ok(());
    }
    for issue in &malformed {
        println!("  {} {}", style("✗").red(), issue);
    }
    Err(miette::miette!(
        "{} malformed spec value(s); affected points are shown as '-' and not evaluated",
        malformed.len()
    ))
}
