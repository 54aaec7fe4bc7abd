use super::fixture::{DEPLOY_DOC, TestFixture};
use crate::{assert_exit_code, assert_file_exists};

fn import_args<'a>(source: &'a str, catalog: &'a str, extra: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec![
        "--robot", "import", "--source", source, "--type", "skill", "--catalog", catalog,
    ];
    args.extend_from_slice(extra);
    args
}

#[test]
fn test_import_into_empty_catalog() {
    let fixture = TestFixture::new("test_import_into_empty_catalog");
    let source = fixture
        .source("deploy", &[("README.md", DEPLOY_DOC), ("scripts/deploy.sh", "docker build .\n")])
        .display()
        .to_string();
    let catalog = fixture.catalog.display().to_string();

    let output = fixture.run_dojo(&import_args(&source, &catalog, &[]));
    assert_exit_code!(output, 0);

    let json = output.json();
    let data = &json["data"];
    assert_eq!(data["outcome"], "imported");
    assert_eq!(data["naming"]["canonical_name"], "proc-deploying-service-skill");
    assert_eq!(data["similarity"]["compared"], 0);
    assert_eq!(data["validation"]["passed"], true);
    assert!(data["requirements"]["dependencies"]["cli_tools"].is_array());
    assert!(data.get("work_directory").is_none());
    assert_file_exists!(
        &fixture
            .catalog
            .join("skills/proc-deploying-service-skill/scripts/deploy.sh")
    );
}

#[test]
fn test_second_import_stops_on_conflict() {
    let fixture = TestFixture::new("test_second_import_stops_on_conflict");
    let source = fixture.source("deploy", &[("README.md", DEPLOY_DOC)]).display().to_string();
    let catalog = fixture.catalog.display().to_string();

    let first = fixture.run_dojo(&import_args(&source, &catalog, &[]));
    assert_exit_code!(first, 0);

    let second = fixture.run_dojo(&import_args(&source, &catalog, &[]));
    assert_exit_code!(second, 1);
    let json = second.json();
    assert_eq!(json["data"]["outcome"], "conflict");
    assert_eq!(json["data"]["similarity"]["has_conflict"], true);
    assert!(json["data"].get("conversion").is_none());
    assert_eq!(
        json["data"]["similarity"]["conflicts"][0]["name"],
        "proc-deploying-service-skill"
    );
}

#[test]
fn test_forced_import_refuses_to_overwrite_existing_entry() {
    let fixture = TestFixture::new("test_forced_import_refuses_to_overwrite_existing_entry");
    let source = fixture.source("deploy", &[("README.md", DEPLOY_DOC)]).display().to_string();
    let catalog = fixture.catalog.display().to_string();

    assert_exit_code!(fixture.run_dojo(&import_args(&source, &catalog, &[])), 0);

    let forced = fixture.run_dojo(&import_args(&source, &catalog, &["--force"]));
    assert_exit_code!(forced, 2);
    let json = forced.json();
    assert_eq!(json["status"]["error"]["code"], "INVALID_INPUT");
    assert_file_exists!(
        &fixture
            .catalog
            .join("skills/proc-deploying-service-skill/SKILL.md")
    );
}

#[test]
fn test_high_threshold_lets_similar_entry_through() {
    let fixture = TestFixture::new("test_high_threshold_lets_similar_entry_through");
    let existing = fixture.catalog.join("skills/proc-shipping-service-skill");
    super::fixture::write_tree(&existing, &[("SKILL.md", DEPLOY_DOC)]);
    let source = fixture.source("deploy", &[("README.md", DEPLOY_DOC)]).display().to_string();
    let catalog = fixture.catalog.display().to_string();

    let output = fixture.run_dojo(&import_args(&source, &catalog, &["--threshold", "1.0"]));
    assert_exit_code!(output, 0);
    let json = output.json();
    assert_eq!(json["data"]["similarity"]["compared"], 1);
    assert_eq!(json["data"]["similarity"]["has_conflict"], false);
    assert!(
        json["data"]["similarity"]["similarities"][0]["score"]
            .as_f64()
            .unwrap()
            > 0.5
    );
}

#[test]
fn test_work_dir_keeps_stage_documents() {
    let fixture = TestFixture::new("test_work_dir_keeps_stage_documents");
    let source = fixture.source("deploy", &[("README.md", DEPLOY_DOC)]).display().to_string();
    let catalog = fixture.catalog.display().to_string();
    let work = fixture.path("work");
    let work_str = work.display().to_string();

    let output = fixture.run_dojo(&import_args(&source, &catalog, &["--work-dir", &work_str]));
    assert_exit_code!(output, 0);

    for doc in [
        "fetched/fetch_result.json",
        "analysis.json",
        "naming.json",
        "similarity.json",
        "conversion_result.json",
    ] {
        assert_file_exists!(&work.join(doc));
    }
    assert!(!fixture.catalog.join("conversion_result.json").exists());

    // a later stage can be re-run from the kept documents
    let revalidate = fixture.run_dojo(&[
        "validate",
        "--type",
        "skill",
        "--path",
        &fixture
            .catalog
            .join("skills/proc-deploying-service-skill")
            .display()
            .to_string(),
    ]);
    assert_exit_code!(revalidate, 0);
}

#[test]
fn test_import_of_missing_local_source_is_fatal() {
    let fixture = TestFixture::new("test_import_of_missing_local_source_is_fatal");
    let missing = fixture.path("sources/nope").display().to_string();
    let catalog = fixture.catalog.display().to_string();

    let output = fixture.run_dojo(&import_args(&missing, &catalog, &[]));
    assert_exit_code!(output, 2);
    assert_eq!(output.json()["status"]["error"]["code"], "SOURCE_NOT_FOUND");
}
