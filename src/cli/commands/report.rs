//! `qcm status` and `qcm summary`

use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::SessionContext;
use crate::cli::output::{effective_format, print_structured};
use crate::cli::table::Listing;
use crate::cli::GlobalOpts;
use crate::core::inspection::{PairStatus, PhaseBook};
use crate::core::summary::{failing_points, point_breakdown, PointTally, Summary};
use crate::entities::context::Phase;
use crate::entities::record::CommittedRecord;
use crate::entities::spec::{Size, ToleranceKey};

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Include pairs that have not been started
    #[arg(long)]
    pub all: bool,
}

#[derive(clap::Args, Debug)]
pub struct SummaryArgs {
    /// Tally results per measurement point instead of per size
    #[arg(long)]
    pub by_point: bool,

    /// Cover every loaded phase instead of the current one
    #[arg(long)]
    pub all_phases: bool,

    /// Only records of this size
    #[arg(long, short = 's')]
    pub size: Option<String>,
}

#[derive(Serialize)]
struct PairRow {
    size: Size,
    tolerance_key: ToleranceKey,
    status: PairStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

/// Sizes to report on: the order's list, else the catalog's, plus anything in use
fn report_sizes(order: &[Size], book: &PhaseBook) -> Vec<Size> {
    let mut sizes: Vec<Size> = if order.is_empty() {
        book.catalog().sizes().to_vec()
    } else {
        order.to_vec()
    };
    let in_use = book
        .entries()
        .iter()
        .map(|e| e.size().to_string())
        .chain(book.records().iter().map(|r| r.size.clone()));
    for size in in_use {
        if !sizes.contains(&size) {
            sizes.push(size);
        }
    }
    sizes
}

pub fn run_status(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = SessionContext::open(global)?;
    let book = ctx.book()?;

    let mut rows = Vec::new();
    for size in report_sizes(ctx.inspection.sizes(), book) {
        for key in book.catalog().available_keys() {
            let status = book.pair_status(&size, &key);
            if status == PairStatus::NotStarted && !args.all {
                continue;
            }
            let summary = book.ledger().get(&size, &key).map(|r| r.summary);
            rows.push(PairRow {
                size: size.clone(),
                tolerance_key: key,
                status,
                summary,
            });
        }
    }

    let format = effective_format(global.output, true);
    if print_structured(&rows, format)? {
        return Ok(());
    }

    println!(
        "{} {} - {}",
        style("Inspection").bold(),
        style(ctx.inspection.context()).cyan(),
        ctx.phase.label()
    );
    if let Some(inspector) = &ctx.config.inspector {
        println!("{} {}", style("Inspector").dim(), inspector);
    }
    if rows.is_empty() {
        println!("Nothing started yet; add a size with {}", style("qcm size add").yellow());
        return Ok(());
    }
    let mut listing = Listing::new(&["SIZE", "KEY", "STATUS", "CHECKED", "FAIL", "PASS %"]);
    for row in &rows {
        let (checked, fail, rate) = match &row.summary {
            Some(s) => (
                s.checked_points.to_string(),
                s.fail.to_string(),
                format!("{:.1}", s.pass_rate_percent),
            ),
            None => ("-".into(), "-".into(), "-".into()),
        };
        listing.push(vec![
            row.size.clone(),
            row.tolerance_key.label(),
            row.status.to_string(),
            checked,
            fail,
            rate,
        ]);
    }
    listing.print(format);
    Ok(())
}

#[derive(Serialize)]
struct RecordRow {
    phase: Phase,
    size: Size,
    tolerance_key: ToleranceKey,
    summary: Summary,
}

#[derive(Serialize)]
struct SummaryReport {
    records: Vec<RecordRow>,
    total: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    points: Option<Vec<PointTally>>,
    failing_points: Vec<String>,
}

pub fn run_summary(args: SummaryArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = SessionContext::open(global)?;
    let books: Vec<&PhaseBook> = if args.all_phases {
        ctx.inspection.phases().collect()
    } else {
        vec![ctx.book()?]
    };

    let records: Vec<(Phase, &CommittedRecord)> = books
        .iter()
        .flat_map(|book| book.records().iter().map(move |r| (book.phase(), r)))
        .filter(|(_, r)| args.size.as_ref().map_or(true, |s| &r.size == s))
        .collect();

    let total = records
        .iter()
        .map(|(_, r)| r.summary)
        .fold(Summary::default(), Summary::merge);
    let report = SummaryReport {
        records: records
            .iter()
            .map(|(phase, r)| RecordRow {
                phase: *phase,
                size: r.size.clone(),
                tolerance_key: r.tolerance_key.clone(),
                summary: r.summary,
            })
            .collect(),
        total,
        points: args
            .by_point
            .then(|| point_breakdown(records.iter().map(|(_, r)| *r))),
        failing_points: failing_points(records.iter().map(|(_, r)| *r))
            .into_iter()
            .collect(),
    };

    let format = effective_format(global.output, true);
    if print_structured(&report, format)? {
        return Ok(());
    }
    if report.records.is_empty() {
        println!("No committed records yet");
        return Ok(());
    }

    let listing = match &report.points {
        Some(points) => {
            let mut listing = Listing::new(&["POINT", "CHECKED", "PASS", "FAIL+", "FAIL-"]);
            for tally in points {
                listing.push(vec![
                    tally.point_name.clone(),
                    tally.checked.to_string(),
                    tally.pass.to_string(),
                    tally.fail_plus.to_string(),
                    tally.fail_minus.to_string(),
                ]);
            }
            listing
        }
        None => {
            let mut listing = Listing::new(&[
                "PHASE", "SIZE", "KEY", "CHECKED", "PASS", "FAIL+", "FAIL-", "PASS %",
            ]);
            for row in &report.records {
                listing.push(summary_cells(
                    row.phase.label(),
                    &row.size,
                    &row.tolerance_key.label(),
                    &row.summary,
                ));
            }
            listing.push(summary_cells("Total", "", "", &report.total));
            listing
        }
    };
    listing.print(format);

    if !report.failing_points.is_empty() {
        println!(
            "{} Out of tolerance: {}",
            style("✗").red(),
            report.failing_points.join(", ")
        );
    }
    Ok(())
}

fn summary_cells(phase: &str, size: &str, key: &str, s: &Summary) -> Vec<String> {
    vec![
        phase.to_string(),
        size.to_string(),
        key.to_string(),
        s.checked_points.to_string(),
        s.pass.to_string(),
        s.fail_plus.to_string(),
        s.fail_minus.to_string(),
        format!("{:.1}", s.pass_rate_percent),
    ]
}
