use clap::{Arg, Command};

mod commands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn script_arg() -> Arg {
    Arg::new("script")
        .value_name("SCRIPT")
        .help("cvscript source file")
        .required(true)
}

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("TOML configuration file (defaults to ./cvscript.toml when present)")
}

fn cli() -> Command {
    Command::new("cvscript")
        .version(VERSION)
        .about("cvscript - render CV documents from a small layout DSL")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("render")
                .about("Run a script against a dataset and print the fragments")
                .arg(script_arg())
                .arg(
                    Arg::new("data")
                        .short('d')
                        .long("data")
                        .value_name("FILE")
                        .help("JSON dataset: {\"ENTITY\": [{\"field\": \"value\"}]}")
                        .conflicts_with("content"),
                )
                .arg(
                    Arg::new("content")
                        .long("content")
                        .value_name("DIR")
                        .help("Directory holding the entity text files"),
                )
                .arg(config_arg())
                .arg(
                    Arg::new("format")
                        .short('f')
                        .long("format")
                        .value_name("FORMAT")
                        .help("Output format")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Parse a script and report the first error")
                .arg(script_arg())
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("fmt")
                .about("Print a script in canonical form")
                .arg(script_arg())
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("tokens")
                .about("Dump the token stream of a script")
                .arg(script_arg()),
        )
}

fn main() {
    let matches = cli().get_matches();

    let result = match matches.subcommand() {
        Some(("render", sub_matches)) => commands::render::run(sub_matches),
        Some(("check", sub_matches)) => commands::check::run(sub_matches),
        Some(("fmt", sub_matches)) => commands::fmt::run(sub_matches),
        Some(("tokens", sub_matches)) => commands::tokens::run(sub_matches),
        _ => {
            println!("cvscript v{}", VERSION);
            println!("Use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}
