//! `cvscript check` subcommand: lex and parse without rendering.

use anyhow::{Context as _, Result};
use clap::ArgMatches;
use cvscript_core::{parse_script, Program};

pub fn run(matches: &ArgMatches) -> Result<()> {
    let loaded = super::load_config(matches)?;
    super::init_logging(&loaded.config.logging.level);

    let (path, source) = super::read_script(matches)?;
    let program = parse_script(&source, &loaded.config)
        .with_context(|| format!("{} is not a valid script", path.display()))?;

    println!("✓ {}: {}", path.display(), summary(&program));
    Ok(())
}

fn summary(program: &Program) -> String {
    let functions: Vec<&str> = program.functions().map(|f| f.name.as_str()).collect();
    let statements = program.statements().count();

    if functions.is_empty() {
        format!("{} top-level statement(s)", statements)
    } else {
        format!(
            "{} top-level statement(s), function(s): {}",
            statements,
            functions.join(", ")
        )
    }
}
