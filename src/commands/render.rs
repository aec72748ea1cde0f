//! `cvscript render` subcommand: run a script against a dataset.

use anyhow::{Context as _, Result};
use clap::ArgMatches;
use cvscript_core::{
    evaluate, parse_script, Context, Dataset, DatasetProvider, DirectoryResolver, Fragment,
    JsonDatasetProvider, ResourceResolver, TableDatasetProvider,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::LoadedConfig;

pub fn run(matches: &ArgMatches) -> Result<()> {
    let loaded = super::load_config(matches)?;
    super::init_logging(&loaded.config.logging.level);

    let (path, source) = super::read_script(matches)?;
    let program = parse_script(&source, &loaded.config)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let content_dir = content_dir(matches, &loaded);
    let dataset = load_dataset(matches, &loaded, &content_dir)?;
    let mut context =
        Context::new(Arc::new(dataset)).with_declared(loaded.config.entities.names());

    let fragments = evaluate(&program, &mut context)
        .with_context(|| format!("Failed to render {}", path.display()))?;
    tracing::info!(
        "Rendered {} fragment(s) from {}",
        fragments.len(),
        path.display()
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match matches.get_one::<String>("format").map(String::as_str) {
        Some("json") => {
            serde_json::to_writer_pretty(&mut out, &fragments)?;
            writeln!(out)?;
        }
        _ => {
            let resolver = resolver_for(&loaded, &content_dir);
            write_text(&mut out, &fragments, &resolver)?;
        }
    }

    Ok(())
}

/// `--content` when given, else the configured content directory
fn content_dir(matches: &ArgMatches, loaded: &LoadedConfig) -> PathBuf {
    matches
        .try_get_one::<String>("content")
        .ok()
        .flatten()
        .map(PathBuf::from)
        .unwrap_or_else(|| loaded.content_dir())
}

fn load_dataset(
    matches: &ArgMatches,
    loaded: &LoadedConfig,
    content_dir: &Path,
) -> Result<Dataset> {
    if let Some(data) = matches.get_one::<String>("data") {
        return JsonDatasetProvider::new(data)
            .load()
            .with_context(|| format!("Failed to load dataset from {}", data));
    }

    tracing::debug!("Reading entity sources from {}", content_dir.display());
    TableDatasetProvider::new(content_dir, loaded.config.entities.clone())
        .load()
        .with_context(|| format!("Failed to load content from {}", content_dir.display()))
}

/// Resource search paths under the configured content directory follow a
/// `--content` override
fn resolver_for(loaded: &LoadedConfig, content_dir: &Path) -> DirectoryResolver {
    DirectoryResolver::from_config(&loaded.config.resources)
        .rooted_at(&loaded.base_dir)
        .relocate(&loaded.content_dir(), content_dir)
}

/// One line per fragment. Resources and lookups print as the resolved path,
/// or a `[missing: name]` marker when no file matches.
fn write_text<W: Write>(
    out: &mut W,
    fragments: &[Fragment],
    resolver: &dyn ResourceResolver,
) -> Result<()> {
    for fragment in fragments {
        match fragment {
            Fragment::Text { text } => writeln!(out, "{}", text)?,
            Fragment::Attribute { value, .. } => writeln!(out, "{}", value)?,
            Fragment::Resource { name } | Fragment::Lookup { key: name } => {
                match resolver.resolve(name) {
                    Ok(Some(found)) => writeln!(out, "{}", found.display())?,
                    Ok(None) => {
                        tracing::warn!("No file found for '{}'", name);
                        writeln!(out, "[missing: {}]", name)?;
                    }
                    Err(e) => {
                        tracing::warn!("{}", e);
                        writeln!(out, "[missing: {}]", name)?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_write_text_resolves_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("logo-header.png"), b"png").unwrap();
        fs::write(dir.path().join("profile.txt"), "About me").unwrap();
        let resolver = DirectoryResolver::new(vec![dir.path().to_path_buf()], vec!["txt".into()]);

        let fragments = vec![
            Fragment::Text {
                text: "Curriculum Vitae".to_string(),
            },
            Fragment::Attribute {
                entity: "PERSONAL".to_string(),
                field: "name".to_string(),
                value: "A. Person".to_string(),
            },
            Fragment::Resource {
                name: "logo-header.png".to_string(),
            },
            Fragment::Lookup {
                key: "profile".to_string(),
            },
            Fragment::Lookup {
                key: "absent".to_string(),
            },
        ];

        let mut out = Vec::new();
        write_text(&mut out, &fragments, &resolver).unwrap();
        let expected = format!(
            "Curriculum Vitae\nA. Person\n{}\n{}\n[missing: absent]\n",
            dir.path().join("logo-header.png").display(),
            dir.path().join("profile.txt").display()
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_resolver_follows_content_override() {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("mycv");
        fs::create_dir_all(content.join("blocks")).unwrap();
        fs::write(content.join("blocks").join("profile.txt"), "About me").unwrap();

        let loaded = LoadedConfig {
            config: cvscript_core::Config::default(),
            base_dir: PathBuf::new(),
        };
        let resolver = resolver_for(&loaded, &content);
        assert_eq!(
            resolver.resolve("profile").unwrap(),
            Some(content.join("blocks").join("profile.txt"))
        );
    }

    #[test]
    fn test_write_text_marks_invalid_names_missing() {
        let resolver = DirectoryResolver::new(Vec::new(), Vec::new());
        let fragments = vec![Fragment::Lookup { key: String::new() }];

        let mut out = Vec::new();
        write_text(&mut out, &fragments, &resolver).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[missing: ]\n");
    }
}
