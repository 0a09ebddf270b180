use crate::cli::ForwardArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use rsmarthe::engine::progress::ProgressReporter;
use rsmarthe::engine::settings::CalibSettings;
use rsmarthe::workflows;
use tracing::info;

pub fn run(args: ForwardArgs) -> Result<()> {
    let settings = CalibSettings::load(&args.config)?;
    let mut model = super::load_model(&settings, &args.config)?;
    info!(
        "Loaded model '{}' from {:?}.",
        model.name(),
        model.dir()
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting forward run...");
    let summary = workflows::forward::run(&mut model, &settings, &args.config, &reporter)?;

    // The estimator counts a run failed only when the exit code is nonzero.
    if !summary.report.success {
        for line in &summary.report.failed_lines {
            eprintln!("  {}", line);
        }
        return Err(CliError::Simulation(format!(
            "{} suspect output lines after {:.1}s",
            summary.report.failed_lines.len(),
            summary.report.elapsed.as_secs_f64()
        )));
    }

    println!(
        "✓ Forward run complete in {:.1}s: {} cells written across {} grids, {} simulated series.",
        summary.report.elapsed.as_secs_f64(),
        summary.cells_written,
        summary.grids_written.len(),
        summary.sim_files.len()
    );

    Ok(())
}
