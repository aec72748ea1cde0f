use anyhow::{Context as _, Result};
use clap::ArgMatches;
use cvscript_core::{parse_script, print_program};

/// Print the canonical form of a script to stdout
pub fn run(matches: &ArgMatches) -> Result<()> {
    let loaded = super::load_config(matches)?;
    super::init_logging(&loaded.config.logging.level);

    let (path, source) = super::read_script(matches)?;
    let program = parse_script(&source, &loaded.config)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    print!("{}", print_program(&program));
    Ok(())
}
