mod common;

use cvscript_core::{
    evaluate, parse_script, parse_source, print_program, render_source, Config, Context, CvError,
    DatasetProvider, DirectoryResolver, EntityTable, Fragment, JsonDatasetProvider,
    ResourceResolver, TableDatasetProvider,
};
use std::sync::Arc;

fn texts(fragments: &[Fragment]) -> Vec<&str> {
    fragments.iter().filter_map(Fragment::as_text).collect()
}

#[test]
fn test_resume_against_json_dataset() {
    let source = common::read_file("tests/samples/resume.cvs");
    let dataset = JsonDatasetProvider::new(common::sample_path("resume.json"))
        .load()
        .unwrap();
    let entities = EntityTable::default();
    let mut context = Context::new(Arc::new(dataset)).with_declared(entities.names());

    let fragments = render_source(&source, &entities, &mut context).unwrap();

    assert_eq!(
        texts(&fragments),
        vec![
            "Resume",
            "A. Person",
            "no phone",
            "Bachelor Informatics",
            "Master Computer Science",
            "cum laude",
        ]
    );
    let lookups: Vec<&Fragment> = fragments
        .iter()
        .filter(|f| matches!(f, Fragment::Lookup { .. }))
        .collect();
    assert_eq!(
        lookups,
        vec![
            &Fragment::Lookup {
                key: "profile".to_string()
            },
            &Fragment::Lookup {
                key: "skills".to_string()
            },
        ]
    );
}

#[test]
fn test_resume_against_content_directory() {
    let source = common::read_file("tests/samples/resume.cvs");
    let entities = EntityTable::default();
    let dataset = TableDatasetProvider::new(common::sample_path("content"), entities.clone())
        .load()
        .unwrap();

    // No source files for these; they load empty
    assert_eq!(dataset.records("URLS").map(<[_]>::len), Some(0));
    assert_eq!(dataset.records("COURSES").map(<[_]>::len), Some(0));

    let personal = &dataset.records("PERSONAL").unwrap()[0];
    assert_eq!(personal["about"], "First line\nsecond line");

    let program = parse_source(&source, &entities).unwrap();
    let mut context = Context::new(Arc::new(dataset)).with_declared(entities.names());
    let fragments = evaluate(&program, &mut context).unwrap();

    assert_eq!(
        texts(&fragments),
        vec![
            "Resume",
            "A. Person",
            "no phone",
            "Bachelor Informatics",
            "Master Computer Science",
            "cum laude",
        ]
    );
}

#[test]
fn test_lookups_resolve_to_block_files() {
    let resolver = DirectoryResolver::new(
        vec![
            common::sample_path("content").join("blocks"),
            common::sample_path("content"),
        ],
        vec!["txt".to_string()],
    );

    assert_eq!(
        resolver.resolve("profile").unwrap(),
        Some(common::sample_path("content").join("blocks").join("profile.txt"))
    );
    assert_eq!(
        resolver.resolve("blocks").unwrap(),
        Some(common::sample_path("content").join("blocks.txt"))
    );
    assert_eq!(resolver.resolve("logo-header.png").unwrap(), None);
}

#[test]
fn test_unclosed_if_is_a_parse_error() {
    let source = common::read_file("tests/samples/unclosed_if.cvs");
    let err = parse_source(&source, &EntityTable::default()).unwrap_err();
    match err {
        CvError::Parse(e) => assert_eq!(e.found, "end of input"),
        other => panic!("expected a parse error, got {other}"),
    }
}

#[test]
fn test_loop_entity_comes_from_configuration() {
    let source = common::read_file("tests/samples/unknown_loop_entity.cvs");
    assert!(matches!(
        parse_source(&source, &EntityTable::default()),
        Err(CvError::Parse(_))
    ));

    let config = Config::from_toml_str(
        r#"
[entities.PROJECTS]
shape = "table"
source = "projects.txt"
fields = ["name"]
"#,
    )
    .unwrap();
    config.validate().unwrap();
    let program = parse_source(&source, &config.entities).unwrap();

    let dataset = cvscript_core::Dataset::from_json_str(
        r#"{"PROJECTS": [{"name": "cvscript"}, {"name": "site"}]}"#,
    )
    .unwrap();
    let mut context = Context::new(Arc::new(dataset));
    let fragments = evaluate(&program, &mut context).unwrap();
    assert_eq!(texts(&fragments), vec!["cvscript", "site"]);
}

#[test]
fn test_formatted_sample_reparses_to_same_program() {
    let source = common::read_file("tests/samples/resume.cvs");
    let entities = EntityTable::default();
    let program = parse_source(&source, &entities).unwrap();

    let printed = print_program(&program);
    assert_eq!(parse_source(&printed, &entities).unwrap(), program);
}

#[test]
fn test_bare_dotted_attribute_is_rejected() {
    let err = parse_source("WRITE BLOCK.title", &EntityTable::default()).unwrap_err();
    match err {
        CvError::Parse(e) => {
            assert_eq!(e.expected, "backtick-quoted field name");
            assert_eq!(e.found, "identifier 'title'");
        }
        other => panic!("expected a parse error, got {other}"),
    }
}

#[test]
fn test_resource_extensions_come_from_configuration() {
    let mut config = Config::default();
    config.resources.extensions = vec!["svg".to_string()];

    let program = parse_script("WRITE badge.svg", &config).unwrap();
    let mut context = Context::new(Arc::new(cvscript_core::Dataset::new()));
    assert_eq!(
        evaluate(&program, &mut context).unwrap(),
        vec![Fragment::Resource {
            name: "badge.svg".to_string()
        }]
    );

    assert!(matches!(
        parse_script("WRITE photo.png", &config),
        Err(CvError::Parse(_))
    ));
}
