use crate::cli::SampleArgs;
use crate::error::{CliError, Result};
use rsmarthe::core::models::model::MartheModel;
use rsmarthe::core::utils::keywords;
use tracing::info;

pub fn run(args: SampleArgs) -> Result<()> {
    if args.layer == 0 {
        return Err(CliError::Argument(
            "Layer numbers start at 1".to_string(),
        ));
    }

    let mut model = MartheModel::load(&args.rma)?;
    let field = model.load_prop(&args.prop)?;
    let label = keywords::lookup(&args.prop)
        .map(|info| info.description)
        .unwrap_or("property");
    info!(
        "Sampling the {} '{}' at ({}, {}) on layer {}.",
        label, args.prop, args.x, args.y, args.layer
    );

    match field.sample(args.x, args.y, args.layer - 1) {
        Some(value) => {
            println!("{}", value);
            Ok(())
        }
        None => Err(CliError::Argument(format!(
            "Point ({}, {}) on layer {} lies outside the model grid",
            args.x, args.y, args.layer
        ))),
    }
}
