//! `qcm sync` command - write every committed record to the record store

use console::style;
use miette::Result;

use crate::cli::helpers::SessionContext;
use crate::cli::GlobalOpts;
use crate::core::inspection::PhaseBook;
use crate::core::store::CommitSink;

#[derive(clap::Args, Debug)]
pub struct SyncArgs {
    /// Sync every loaded phase instead of the current one
    #[arg(long)]
    pub all_phases: bool,
}

pub fn run(args: SyncArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = SessionContext::open(global)?;
    let mut store = ctx.open_store()?;
    let context = ctx.inspection.context();

    let books: Vec<&PhaseBook> = if args.all_phases {
        ctx.inspection.phases().collect()
    } else {
        vec![ctx.book()?]
    };

    let mut saved = 0;
    for book in books {
        for record in book.records() {
            store
                .upsert(context, book.phase(), record)
                .map_err(|e| miette::miette!("{}", e))?;
            saved += 1;
        }
    }

    println!(
        "{} Saved {} record(s) to {}",
        style("✓").green(),
        saved,
        style(ctx.config.store_path(ctx.workspace.root()).display()).dim()
    );
    Ok(())
}
