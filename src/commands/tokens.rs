use anyhow::{Context as _, Result};
use clap::ArgMatches;
use cvscript_core::{tokenize, Token};

/// Dump the token stream, one token per line
pub fn run(matches: &ArgMatches) -> Result<()> {
    super::init_logging("warn");

    let (path, source) = super::read_script(matches)?;
    let tokens =
        tokenize(&source).with_context(|| format!("Failed to tokenize {}", path.display()))?;

    for token in &tokens {
        println!("{}", describe(token));
    }
    Ok(())
}

fn describe(token: &Token) -> String {
    format!(
        "{}:{}\t{}",
        token.line,
        token.column,
        token.token_type.describe()
    )
}
