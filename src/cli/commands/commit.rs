//! `qcm validate`, `qcm commit` and `qcm reopen`

use console::style;
use miette::Result;
use tracing::warn;

use crate::cli::helpers::{confirm, session_error, SessionContext};
use crate::cli::GlobalOpts;
use crate::core::ledger::LedgerError;
use crate::core::session::SessionError;
use crate::core::store::CommitSink;
use crate::entities::record::CommittedRecord;
use crate::entities::spec::ToleranceKey;

#[derive(clap::Args, Debug)]
pub struct ValidateArgs {
    pub size: String,
}

#[derive(clap::Args, Debug)]
pub struct CommitArgs {
    pub size: String,

    /// Key expected to be active (guards against committing the wrong key)
    #[arg(long, short = 'k')]
    pub key: Option<String>,

    /// Keep the record local; do not write it to the record store
    #[arg(long)]
    pub no_store: bool,
}

#[derive(clap::Args, Debug)]
pub struct ReopenArgs {
    pub size: String,

    /// Committed key to reopen
    pub key: String,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run_validate(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = SessionContext::open(global)?;
    let missing = ctx.book()?.validate(&args.size).map_err(session_error)?;
    if missing.is_empty() {
        println!(
            "{} Size {} is complete and ready to commit",
            style("✓").green(),
            style(&args.size).cyan()
        );
        return Ok(());
    }
    Err(session_error(SessionError::Incomplete(missing)))
}

fn summary_line(record: &CommittedRecord) -> String {
    let s = &record.summary;
    format!(
        "{} checked, {} pass, {} fail (+{} / -{}), {:.1}% pass",
        s.checked_points, s.pass, s.fail, s.fail_plus, s.fail_minus, s.pass_rate_percent
    )
}

pub fn run_commit(args: CommitArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = SessionContext::open(global)?;
    let record = {
        let book = ctx.book_mut()?;
        let committed = match &args.key {
            Some(key) => book.commit(&args.size, &ToleranceKey::new(key.as_str())),
            None => book.commit_active(&args.size),
        };
        committed.map_err(session_error)?
    };
    ctx.save()?;

    println!(
        "{} Committed {} / {}: {}",
        style("✓").green(),
        style(&record.size).cyan(),
        record.tolerance_key.label(),
        summary_line(&record)
    );

    if args.no_store {
        return Ok(());
    }
    let saved = ctx
        .open_store()
        .and_then(|mut store| {
            store
                .upsert(ctx.inspection.context(), ctx.phase, &record)
                .map_err(|e| miette::miette!("{}", e))
        });
    if let Err(err) = saved {
        warn!(error = %err, size = %record.size, "record store write failed");
        println!(
            "   {} Not saved to the record store ({}); run {} later",
            style("!").yellow(),
            err,
            style("qcm sync").yellow()
        );
    }
    Ok(())
}

pub fn run_reopen(args: ReopenArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = SessionContext::open(global)?;
    let key = ToleranceKey::new(args.key.as_str());

    if !ctx.book()?.is_locked(&args.size, &key) {
        return Err(session_error(
            LedgerError::AlreadyOpen {
                size: args.size.clone(),
                key,
            }
            .into(),
        ));
    }
    let prompt = format!(
        "Reopen {} / {} for editing? It stays unlocked until committed again",
        args.size,
        key.label()
    );
    if !confirm(&prompt, args.yes)? {
        println!("{} Cancelled", style("→").dim());
        return Ok(());
    }

    ctx.book_mut()?
        .reopen(&args.size, &key)
        .map_err(session_error)?;
    ctx.save()?;

    println!(
        "{} Reopened {} / {}; commit again to lock it",
        style("✓").green(),
        style(&args.size).cyan(),
        key.label()
    );
    Ok(())
}
