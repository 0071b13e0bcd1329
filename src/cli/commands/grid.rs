//! Grid commands - `qcm key`, `row`, `col`, `set`, `clear` and `show`
//!
//! Points and pieces are numbered from 1 on the command line.

use console::style;
use miette::Result;

use crate::cli::commands::size::describe_pattern;
use crate::cli::helpers::{position, session_error, truncate_str, SessionContext};
use crate::cli::output::{effective_format, print_structured};
use crate::cli::table::Listing;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::inspection::{GridCell, GridView, PairStatus};
use crate::core::tolerance::Evaluation;
use crate::entities::spec::ToleranceKey;

#[derive(clap::Args, Debug)]
pub struct KeyArgs {
    pub size: String,

    /// Key to switch to; omit to list the size's keys
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RowArgs {
    pub size: String,

    /// Point numbers to toggle
    #[arg(required_unless_present_any = ["all", "none"])]
    pub points: Vec<usize>,

    /// Select every row
    #[arg(long, conflicts_with_all = ["none", "points"])]
    pub all: bool,

    /// Clear every row
    #[arg(long, conflicts_with = "points")]
    pub none: bool,
}

#[derive(clap::Args, Debug)]
pub struct ColArgs {
    pub size: String,

    /// Piece number whose column is toggled
    pub sample: usize,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    pub size: String,

    /// Point number
    pub point: usize,

    /// First piece number
    pub sample: usize,

    /// Deviations from nominal (e.g. 1/8, -1/4, 1 1/2); further values fill the next pieces
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    pub values: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ClearArgs {
    pub size: String,
    pub point: usize,
    pub sample: usize,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    pub size: String,

    /// Show a committed key instead of the working grid
    #[arg(long, short = 'k')]
    pub key: Option<String>,
}

pub fn run_key(args: KeyArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = SessionContext::open(global)?;

    let Some(key) = args.key else {
        let book = ctx.book()?;
        let mut listing = Listing::new(&["KEY", "LABEL", "POINTS", "STATUS"]);
        for key in book.catalog().available_keys() {
            listing.push(vec![
                key.to_string(),
                key.label(),
                book.catalog().point_count(&key).to_string(),
                book.pair_status(&args.size, &key).to_string(),
            ]);
        }
        listing.print(effective_format(global.output, true));
        return Ok(());
    };

    let key = ToleranceKey::new(key);
    let source = ctx
        .book_mut()?
        .set_active_tolerance_key(&args.size, &key)
        .map_err(session_error)?;
    ctx.save()?;

    match source {
        None => println!(
            "{} Size {} is already on {}",
            style("→").dim(),
            style(&args.size).cyan(),
            key.label()
        ),
        Some(source) => {
            let entry = ctx.book()?.entry(&args.size).map_err(session_error)?;
            println!(
                "{} Size {} switched to {} ({} points); grid cleared",
                style("✓").green(),
                style(&args.size).cyan(),
                style(key.label()).cyan(),
                entry.point_count()
            );
            if let Some(note) = describe_pattern(source, entry.selected_rows().count_selected()) {
                println!("   {} {}", style("→").dim(), note);
            }
        }
    }
    Ok(())
}

pub fn run_row(args: RowArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = SessionContext::open(global)?;
    let size = args.size.as_str();

    if args.all || args.none {
        ctx.book_mut()?
            .set_all_rows(size, args.all)
            .map_err(session_error)?;
        ctx.save()?;
        let verb = if args.all { "Selected" } else { "Cleared" };
        println!("{} {} every row of {}", style("✓").green(), verb, style(size).cyan());
        return Ok(());
    }

    let mut changes = Vec::new();
    {
        let book = ctx.book_mut()?;
        for point in &args.points {
            let index = position(*point, "Point")?;
            let on = book.toggle_row(size, index).map_err(session_error)?;
            changes.push((index, on));
        }
    }
    ctx.save()?;

    let points = ctx.book()?.points(size).map_err(session_error)?;
    for (index, on) in changes {
        let name = points.get(index).map(|p| p.name_eng.as_str()).unwrap_or("?");
        if on {
            println!("{} {} {} selected", style("+").green(), index + 1, name);
        } else {
            println!("{} {} {} cleared", style("-").yellow(), index + 1, name);
        }
    }
    Ok(())
}

pub fn run_col(args: ColArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = SessionContext::open(global)?;
    let sample = position(args.sample, "Piece")?;
    let on = ctx
        .book_mut()?
        .toggle_full_column(&args.size, sample)
        .map_err(session_error)?;
    ctx.save()?;

    let state = if on { "measures every point" } else { "follows row selection" };
    println!(
        "{} Piece {} of {} {}",
        style("✓").green(),
        args.sample,
        style(&args.size).cyan(),
        state
    );
    Ok(())
}

pub fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = SessionContext::open(global)?;
    let point = position(args.point, "Point")?;
    let first = position(args.sample, "Piece")?;

    // Every value lands or none do; the session is only saved when all are accepted
    let mut rejected = Vec::new();
    {
        let book = ctx.book_mut()?;
        for (offset, value) in args.values.iter().enumerate() {
            let sample = first + offset;
            let written = book
                .write_measurement(&args.size, point, sample, value)
                .map_err(session_error)?;
            if !written {
                rejected.push((sample + 1).to_string());
            }
        }
    }
    if !rejected.is_empty() {
        return Err(miette::miette!(
            "Point {} is not recorded on piece(s) {}; nothing was saved. Select the row with `qcm row` or mark the column with `qcm col`",
            args.point,
            rejected.join(", ")
        ));
    }
    ctx.save()?;

    let book = ctx.book()?;
    let name = book
        .points(&args.size)
        .map_err(session_error)?
        .get(point)
        .map(|p| p.name_eng.clone())
        .unwrap_or_default();
    for (offset, value) in args.values.iter().enumerate() {
        let sample = first + offset;
        let evaluation = book
            .cell_evaluation(&args.size, point, sample)
            .map_err(session_error)?;
        println!(
            "{} {} piece {}: {} {}",
            evaluation_mark(evaluation),
            name,
            sample + 1,
            value.trim(),
            style(evaluation).dim()
        );
    }
    Ok(())
}

pub fn run_clear(args: ClearArgs, global: &GlobalOpts) -> Result<()> {
    let mut ctx = SessionContext::open(global)?;
    let point = position(args.point, "Point")?;
    let sample = position(args.sample, "Piece")?;
    let removed = ctx
        .book_mut()?
        .clear_cell(&args.size, point, sample)
        .map_err(session_error)?;
    ctx.save()?;

    if removed {
        println!(
            "{} Cleared point {} piece {} of {}",
            style("✓").green(),
            args.point,
            args.sample,
            style(&args.size).cyan()
        );
    } else {
        println!("{} Nothing recorded there", style("→").dim());
    }
    Ok(())
}

pub fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = SessionContext::open(global)?;
    let book = ctx.book()?;

    let grid = match args.key.map(ToleranceKey::new) {
        Some(key) if book.pair_status(&args.size, &key) == PairStatus::Committed => {
            book.committed_grid(&args.size, &key)
        }
        Some(key) => match book.entry(&args.size) {
            Ok(entry) if entry.active_key() == &key => book.grid(&args.size),
            _ => {
                return Err(miette::miette!(
                    "Size {} has nothing recorded on {}",
                    args.size,
                    key.label()
                ))
            }
        },
        None => match book.entry(&args.size) {
            Ok(_) => book.grid(&args.size),
            Err(err) => match book.ledger().latest_for_size(&args.size) {
                Some(record) => book.committed_grid(&args.size, &record.tolerance_key),
                None => Err(err),
            },
        },
    }
    .map_err(session_error)?;

    let format = match global.output {
        OutputFormat::Auto => OutputFormat::Table,
        f => f,
    };
    if print_structured(&grid, format)? {
        return Ok(());
    }

    let state = if grid.locked {
        style("committed").yellow().to_string()
    } else {
        style("open").green().to_string()
    };
    println!(
        "{} {} / {} ({})",
        style("Size").bold(),
        style(&grid.size).cyan(),
        grid.tolerance_key.label(),
        state
    );
    render_grid(&grid).print(format);
    println!(
        "{}",
        style("[x] selected row, * full piece, ! out of tolerance, . not recorded").dim()
    );
    Ok(())
}

fn evaluation_mark(evaluation: Evaluation) -> String {
    match evaluation {
        Evaluation::Pass => style("✓").green().to_string(),
        Evaluation::FailMinus | Evaluation::FailPlus => style("✗").red().to_string(),
        Evaluation::Unmeasured => style("?").yellow().to_string(),
    }
}

fn cell_text(cell: &GridCell) -> String {
    match (&cell.value, cell.evaluation) {
        (Some(value), Evaluation::FailPlus) => format!("{} !+", value.fraction),
        (Some(value), Evaluation::FailMinus) => format!("{} !-", value.fraction),
        (Some(value), _) => value.fraction.clone(),
        (None, _) if cell.writable => "_".to_string(),
        (None, _) => ".".to_string(),
    }
}

/// Grid as rows of point x piece
pub(crate) fn render_grid(grid: &GridView) -> Listing {
    let mut headers = vec![
        "#".to_string(),
        " ".to_string(),
        "POINT".to_string(),
        "NOMINAL".to_string(),
        "TOL".to_string(),
    ];
    for sample in 0..grid.sample_count {
        let marker = if grid.full_columns.get(sample) { "*" } else { "" };
        headers.push(format!("P{}{}", sample + 1, marker));
    }

    let mut listing = Listing::with_headers(headers);
    for (index, row) in grid.rows.iter().enumerate() {
        let mut cells = vec![
            (index + 1).to_string(),
            if row.selected { "[x]" } else { "[ ]" }.to_string(),
            truncate_str(&row.name_eng, 32),
            row.nominal.to_string(),
            format!(
                "{} {}",
                row.tol_minus.signed_display('-'),
                row.tol_plus.signed_display('+')
            ),
        ];
        cells.extend(row.cells.iter().map(cell_text));
        listing.push(cells);
    }
    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fraction::Fraction;
    use crate::core::inspection::GridRow;
    use crate::core::session::SelectionMask;
    use crate::entities::record::CellValue;

    fn grid() -> GridView {
        GridView {
            size: "M".into(),
            tolerance_key: ToleranceKey::new("1"),
            sample_count: 2,
            full_columns: SelectionMask::from(vec![false, true]),
            locked: false,
            rows: vec![GridRow {
                point_id: "P01".into(),
                name_eng: "Chest".into(),
                name_local: None,
                nominal: Fraction::parse("20"),
                tol_minus: Fraction::parse("1/4"),
                tol_plus: Fraction::parse("1/4"),
                selected: false,
                cells: vec![
                    GridCell {
                        value: None,
                        writable: false,
                        evaluation: Evaluation::Unmeasured,
                    },
                    GridCell {
                        value: Some(CellValue::new(0.5, "1/2")),
                        writable: true,
                        evaluation: Evaluation::FailPlus,
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_render_grid_marks_cells() {
        let tsv = render_grid(&grid()).render(OutputFormat::Tsv);
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines[0], "#\t \tPOINT\tNOMINAL\tTOL\tP1\tP2*");
        assert_eq!(lines[1], "1\t[ ]\tChest\t20\t-1/4 +1/4\t.\t1/2 !+");
    }
}
