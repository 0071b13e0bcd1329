use clap::Parser;
use miette::Result;
use qcm::cli::commands::{
    catalog, commit, completions, frac, grid, init, records, report, size, sync,
};
use qcm::cli::{Cli, Commands};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    // QCM_LOG wins over -v; logs go to stderr so piped output stays clean
    let default_filter = match cli.global.verbose {
        0 => "qcm=warn",
        1 => "qcm=debug",
        _ => "qcm=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("QCM_LOG")
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    let global = cli.global;

    match cli.command {
        Commands::Init(args) => init::run(args, &global),
        Commands::Catalog(cmd) => catalog::run(cmd, &global),
        Commands::Size(cmd) => size::run(cmd, &global),
        Commands::Key(args) => grid::run_key(args, &global),
        Commands::Row(args) => grid::run_row(args, &global),
        Commands::Col(args) => grid::run_col(args, &global),
        Commands::Set(args) => grid::run_set(args, &global),
        Commands::Clear(args) => grid::run_clear(args, &global),
        Commands::Show(args) => grid::run_show(args, &global),
        Commands::Validate(args) => commit::run_validate(args, &global),
        Commands::Commit(args) => commit::run_commit(args, &global),
        Commands::Reopen(args) => commit::run_reopen(args, &global),
        Commands::Status(args) => report::run_status(args, &global),
        Commands::Summary(args) => report::run_summary(args, &global),
        Commands::Sync(args) => sync::run(args, &global),
        Commands::Records(args) => records::run(args, &global),
        Commands::Frac(args) => frac::run(args, &global),
        Commands::Completions(args) => completions::run(args),
    }
}
