use anyhow::Result;
use globegrid::VARIABLES;

pub fn run(_cli: &crate::cli::Cli) -> Result<()> {
    println!("{:<16} {:<10} {:<28} {:<8} description", "key", "units", "file stem", "column");
    for spec in VARIABLES {
        println!("{:<16} {:<10} {:<28} {:<8} {}", spec.key, spec.units, spec.stem, spec.column, spec.description);
    }
    Ok(())
}
