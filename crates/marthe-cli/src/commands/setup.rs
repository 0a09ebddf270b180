use crate::cli::SetupArgs;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use rsmarthe::engine::progress::ProgressReporter;
use rsmarthe::engine::settings::CalibSettings;
use rsmarthe::workflows;
use tracing::info;

pub fn run(args: SetupArgs) -> Result<()> {
    let settings = CalibSettings::load(&args.config)?;
    let mut model = super::load_model(&settings, &args.config)?;
    info!(
        "Loaded model '{}' from {:?}.",
        model.name(),
        model.dir()
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Building the estimation interface...");
    let summary = workflows::setup::run(&mut model, &settings, &args.config, &reporter)?;

    println!(
        "✓ Estimation interface written: {} adjustable parameters, {} observations.",
        summary.n_parameters, summary.n_observations
    );
    println!(
        "  {} data, {} template and {} instruction files.",
        summary.data_files.len(),
        summary.tpl_files.len(),
        summary.ins_files.len()
    );
    println!("  Control file: {}", summary.pst_path.display());

    Ok(())
}
