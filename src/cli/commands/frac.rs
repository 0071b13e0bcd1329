//! `qcm frac` command - convert between fractions and decimals

use miette::Result;
use serde::Serialize;

use crate::cli::output::{effective_format, print_structured};
use crate::cli::table::Listing;
use crate::cli::GlobalOpts;
use crate::core::fraction::{decimal_to_fraction, fraction_to_decimal};

#[derive(clap::Args, Debug)]
pub struct FracArgs {
    /// Values such as 1/8, -1 1/4, ¾ or 0.375
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    pub values: Vec<String>,
}

#[derive(Serialize)]
struct Conversion {
    input: String,
    decimal: Option<f64>,
    fraction: String,
}

pub fn run(args: FracArgs, global: &GlobalOpts) -> Result<()> {
    let conversions: Vec<Conversion> = args
        .values
        .iter()
        .map(|input| {
            let decimal = fraction_to_decimal(input);
            Conversion {
                input: input.clone(),
                decimal,
                fraction: decimal.map_or_else(|| "-".to_string(), decimal_to_fraction),
            }
        })
        .collect();

    let format = effective_format(global.output, true);
    if print_structured(&conversions, format)? {
        return Ok(());
    }
    let mut listing = Listing::new(&["INPUT", "DECIMAL", "FRACTION"]);
    for c in &conversions {
        listing.push(vec![
            c.input.clone(),
            c.decimal.map_or_else(|| "-".to_string(), |d| d.to_string()),
            c.fraction.clone(),
        ]);
    }
    listing.print(format);

    if conversions.iter().any(|c| c.decimal.is_none()) {
        return Err(miette::miette!("Some values could not be parsed"));
    }
    Ok(())
}
