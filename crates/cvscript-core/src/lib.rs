pub mod config;
pub mod dataset;
pub mod dsl;
pub mod error;
pub mod resource;

pub use config::{Config, ConfigError, EntityShape, EntitySpec, EntityTable};
pub use dataset::{
    Dataset, DatasetError, DatasetProvider, JsonDatasetProvider, Record, TableDatasetProvider,
};
pub use dsl::{
    evaluate, print_program, tokenize, tokenize_with_extensions, Context, Evaluator, Fragment,
    Keyword, Parser, Program, Token, TokenType,
};
pub use error::{CvError, LexError, ParseError, ResolutionError, Result};
pub use resource::{DirectoryResolver, ResourceError, ResourceResolver};

/// Lex and parse `source`, recognizing the entities in `entities`
pub fn parse_source(source: &str, entities: &EntityTable) -> Result<Program> {
    let tokens = tokenize(source)?;
    let program = Parser::with_entities(tokens, entities.names()).parse()?;
    Ok(program)
}

/// Lex and parse `source` with the entity table and resource extensions of
/// `config`
pub fn parse_script(source: &str, config: &Config) -> Result<Program> {
    let tokens = tokenize_with_extensions(source, &config.resources.extensions)?;
    let program = Parser::with_entities(tokens, config.entities.names()).parse()?;
    Ok(program)
}

/// Parse and evaluate `source` in one step
pub fn render_source(
    source: &str,
    entities: &EntityTable,
    context: &mut Context,
) -> Result<Vec<Fragment>> {
    let program = parse_source(source, entities)?;
    Ok(evaluate(&program, context)?)
}
