//! `qcm size` command - manage the working set of sizes

use clap::Subcommand;
use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::{session_error, SessionContext};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::table::Listing;
use crate::cli::GlobalOpts;
use crate::core::pattern::PatternSource;
use crate::entities::spec::ToleranceKey;

#[derive(Subcommand, Debug)]
pub enum SizeCommands {
    /// Start measuring a size on its first uncommitted key
    Add(AddArgs),

    /// Drop a size from the working set (a reopened size keeps its old record)
    #[command(name = "rm")]
    Remove(RemoveArgs),

    /// Change how many pieces are measured for a size
    Samples(SamplesArgs),

    /// List sizes in the working set
    List,
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Size label (e.g. M)
    pub size: String,

    /// Pieces to measure (default from the session)
    #[arg(long, short = 'n')]
    pub samples: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    pub size: String,
}

#[derive(clap::Args, Debug)]
pub struct SamplesArgs {
    pub size: String,

    /// New number of pieces
    pub count: usize,
}

pub fn run(cmd: SizeCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SizeCommands::Add(args) => run_add(args, global),
        SizeCommands::Remove(args) => run_remove(args, global),
        SizeCommands::Samples(args) => run_samples(args, global),
        SizeCommands::List => run_list(global),
    }
}

/// Describe an applied pattern to the inspector
pub(crate) fn describe_pattern(source: PatternSource, selected: usize) -> Option<String> {
    match source {
        PatternSource::Empty => None,
        _ => Some(format!("{} row(s) preselected from {}", selected, source)),
    }
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = SessionContext::open(global)?;
    let phase = ctx.phase;
    let source = ctx
        .inspection
        .add_size(phase, &args.size, args.samples)
        .map_err(session_error)?;
    ctx.save()?;

    let entry = ctx.book()?.entry(&args.size).map_err(session_error)?;
    println!(
        "{} Added size {} on {} ({} points, {} pieces)",
        style("✓").green(),
        style(&args.size).cyan(),
        style(entry.active_key().label()).cyan(),
        entry.point_count(),
        entry.sample_count()
    );
    if let Some(note) = describe_pattern(source, entry.selected_rows().count_selected()) {
        println!("   {} {}", style("→").dim(), note);
    }
    Ok(())
}

fn run_remove(args: RemoveArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = SessionContext::open(global)?;
    let restored = ctx
        .book_mut()?
        .remove_size(&args.size)
        .map_err(session_error)?;
    ctx.save()?;

    if restored {
        println!(
            "{} Dropped edits to {}; its committed record is locked again",
            style("✓").green(),
            style(&args.size).cyan()
        );
    } else {
        println!("{} Removed size {}", style("✓").green(), style(&args.size).cyan());
    }
    Ok(())
}

fn run_samples(args: SamplesArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = SessionContext::open(global)?;
    ctx.book_mut()?
        .set_sample_count(&args.size, args.count)
        .map_err(session_error)?;
    ctx.save()?;
    println!(
        "{} Size {} now has {} pieces",
        style("✓").green(),
        style(&args.size).cyan(),
        args.count
    );
    Ok(())
}

#[derive(Serialize)]
struct EntryRow {
    size: String,
    tolerance_key: ToleranceKey,
    samples: usize,
    selected_rows: usize,
    points: usize,
    recorded: usize,
    status: String,
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let ctx = SessionContext::open(global)?;
    let book = ctx.book()?;
    let rows: Vec<EntryRow> = book
        .entries()
        .iter()
        .map(|entry| EntryRow {
            size: entry.size().to_string(),
            tolerance_key: entry.active_key().clone(),
            samples: entry.sample_count(),
            selected_rows: entry.selected_rows().count_selected(),
            points: entry.point_count(),
            recorded: entry.cell_count(),
            status: book.pair_status(entry.size(), entry.active_key()).to_string(),
        })
        .collect();

    let format = effective_format(global.output, true);
    if print_structured(&rows, format)? {
        return Ok(());
    }
    if rows.is_empty() {
        println!("No sizes in the working set");
        return Ok(());
    }
    let mut listing = Listing::new(&["SIZE", "KEY", "PIECES", "ROWS", "CELLS", "STATUS"]);
    for row in &rows {
        listing.push(vec![
            row.size.clone(),
            row.tolerance_key.label(),
            row.samples.to_string(),
            format!("{}/{}", row.selected_rows, row.points),
            row.recorded.to_string(),
            row.status.clone(),
        ]);
    }
    listing.print(format);
    Ok(())
}
