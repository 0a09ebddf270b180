use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use rsmarthe::core::models::model::MartheModel;
use rsmarthe::engine::progress::ProgressReporter;
use rsmarthe::engine::run::{self, RunConfig};
use tracing::info;

pub fn run(args: RunArgs) -> Result<()> {
    let model = MartheModel::load(&args.rma)?;
    info!(
        "Loaded model '{}' from {:?}.",
        model.name(),
        model.dir()
    );

    let config = RunConfig {
        exe_name: args.exe.clone(),
        silent: args.silent,
        extra_args: args.extra_args.clone(),
        ..RunConfig::default()
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Running '{}' on {}...", args.exe, args.rma.display());
    let report = run::run_model(&model, &config, &reporter)?;

    if !report.success {
        for line in &report.failed_lines {
            eprintln!("  {}", line);
        }
        return Err(CliError::Simulation(format!(
            "no normal-termination marker after {:.1}s",
            report.elapsed.as_secs_f64()
        )));
    }

    println!(
        "✓ Normal termination in {:.1}s ({} output lines).",
        report.elapsed.as_secs_f64(),
        report.lines.len()
    );

    Ok(())
}
