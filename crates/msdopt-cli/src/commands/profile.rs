use crate::cli::ProfileArgs;
use crate::error::{CliError, Result};
use msdopt::core::io::fasta;
use msdopt::core::positions::PositionFilter;
use msdopt::core::profile::TargetProfile;
use msdopt::engine::error::OptimizerError;
use tracing::info;

pub fn run(args: ProfileArgs) -> Result<()> {
    info!("Reading alignment from {:?}", &args.alignment);
    let records = fasta::read_records_from_path(&args.alignment).map_err(OptimizerError::from)?;

    let filter = args
        .reindex
        .as_deref()
        .map(PositionFilter::load)
        .transpose()
        .map_err(OptimizerError::from)?;

    let profile =
        TargetProfile::from_records(&records, filter.as_ref()).map_err(OptimizerError::from)?;
    info!(
        sequences = records.len(),
        positions = profile.n_positions(),
        "Computed alignment profile."
    );

    let written = fasta::write_frequencies_to_path(profile.frequencies(), args.precision, &args.output)
        .map_err(CliError::Io)?;
    println!(
        "✓ Profile of {} position(s) from {} sequence(s) written to: {}",
        profile.n_positions(),
        records.len(),
        written.display()
    );
    Ok(())
}
