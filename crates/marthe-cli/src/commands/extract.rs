use crate::cli::ExtractArgs;
use crate::error::Result;
use rsmarthe::core::io::prn;
use tracing::debug;

pub fn run(args: ExtractArgs) -> Result<()> {
    let written = prn::extract_prn(&args.prn, &args.out)?;

    for path in &written {
        debug!("Wrote {:?}.", path);
    }
    println!(
        "✓ Extracted {} simulated series into '{}'.",
        written.len(),
        args.out.display()
    );

    Ok(())
}
