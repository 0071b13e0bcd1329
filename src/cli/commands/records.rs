//! `qcm records` command - list what the record store holds

use miette::Result;

use crate::cli::helpers::SessionContext;
use crate::cli::output::{effective_format, print_structured};
use crate::cli::table::Listing;
use crate::cli::GlobalOpts;
use crate::core::store::{CommitSink, StoredRecord};
use crate::entities::context::Phase;

#[derive(clap::Args, Debug)]
pub struct RecordsArgs {
    /// Every order and color in the store, not just the current one
    #[arg(long)]
    pub all_orders: bool,

    /// Every phase instead of the current one
    #[arg(long)]
    pub all_phases: bool,
}

pub fn run(args: RecordsArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = SessionContext::open(global)?;
    let store = ctx.open_store()?;

    let contexts = if args.all_orders {
        store.contexts().map_err(|e| miette::miette!("{}", e))?
    } else {
        vec![ctx.inspection.context().clone()]
    };
    let phases: Vec<Phase> = if args.all_phases {
        Phase::all().to_vec()
    } else {
        vec![ctx.phase]
    };

    let mut rows: Vec<StoredRecord> = Vec::new();
    for context in &contexts {
        for phase in &phases {
            rows.extend(
                store
                    .records(context, *phase)
                    .map_err(|e| miette::miette!("{}", e))?,
            );
        }
    }

    let format = effective_format(global.output, true);
    if print_structured(&rows, format)? {
        return Ok(());
    }
    if rows.is_empty() {
        println!("The record store holds nothing for this selection");
        return Ok(());
    }

    let mut listing = Listing::new(&[
        "ORDER", "COLOR", "PHASE", "SIZE", "KEY", "CHECKED", "PASS %", "SAVED",
    ]);
    for row in &rows {
        listing.push(vec![
            row.context.order_no.clone(),
            row.context.color.clone(),
            row.phase.label().to_string(),
            row.record.size.clone(),
            row.record.tolerance_key.label(),
            row.record.summary.checked_points.to_string(),
            format!("{:.1}", row.record.summary.pass_rate_percent),
            row.saved_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    listing.print(format);
    Ok(())
}
