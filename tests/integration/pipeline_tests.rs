use dojo_import::analyze::Analyzer;
use dojo_import::convert::StructureConverter;
use dojo_import::core::{FetchedBundle, OriginKind, ResourceKind, SubType};
use dojo_import::fetch::{Fetcher, SourceReference};
use dojo_import::naming::Namer;
use dojo_import::validate::Validator;

use super::fixture::{DEPLOY_DOC, REVIEWER_DOC, TestFixture};
use crate::{assert_exit_code, assert_file_contains, assert_file_exists};

#[test]
fn test_local_skill_pipeline_through_library() {
    let fixture = TestFixture::new("test_local_skill_pipeline_through_library");
    let source = fixture.source(
        "deploy",
        &[("README.md", DEPLOY_DOC), ("scripts/deploy.sh", "kubectl apply -f k8s/\n")],
    );
    let config = fixture.config();

    let reference = SourceReference::parse(source.display().to_string());
    let bundle = Fetcher::new(config.fetch.clone())
        .fetch(&reference, ResourceKind::Skill, &fixture.path("work"))
        .unwrap();
    assert_eq!(bundle.origin_kind, OriginKind::LocalFilesystem);
    assert_eq!(bundle.files, vec!["README.md", "scripts/deploy.sh"]);
    assert!(bundle.metadata.contains_key("content_sha256"));

    let assessed = Analyzer::new(config.analysis.clone()).analyze(&bundle);
    assert!(assessed.is_confident(), "{:?}", assessed.issues);
    let record = assessed.value;
    assert_eq!(record.original_name, "Deploy Service");
    assert_eq!(record.purpose, "Ship the service to production");
    assert!(record.has_workflow);
    assert!(record.has_scripts);

    let naming = Namer.name(&record);
    assert_eq!(naming.sub_type, SubType::Proc);
    assert_eq!(naming.canonical_name, "proc-deploying-service-skill");
    assert_eq!(naming.target_path, "skills/proc-deploying-service-skill");

    let result = StructureConverter
        .convert(&bundle, &naming, &record, &fixture.catalog)
        .unwrap();
    assert!(!result.synthesized);
    assert_eq!(result.created_files, vec!["SKILL.md", "scripts/deploy.sh"]);

    let skill_md = fixture.catalog.join("skills/proc-deploying-service-skill/SKILL.md");
    assert_file_contains!(&skill_md, "# Deploy Service");
    assert_file_contains!(&skill_md, "- Scope: Backend services");

    let report = Validator.validate(&result.target_directory, ResourceKind::Skill);
    assert!(report.passed, "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn test_stages_rerun_from_disk_documents() {
    let fixture = TestFixture::new("test_stages_rerun_from_disk_documents");
    let source = fixture.source(
        "deploy",
        &[("README.md", DEPLOY_DOC), ("docs/rollback.md", "# Rollback\n")],
    );
    let work = fixture.path("work");
    let work_str = work.display().to_string();
    let analysis = fixture.path("analysis.json").display().to_string();
    let naming = fixture.path("naming.json").display().to_string();
    let catalog = fixture.catalog.display().to_string();

    let fetch = fixture.run_dojo(&[
        "fetch",
        "--source",
        &source.display().to_string(),
        "--type",
        "skill",
        "--output-dir",
        &work_str,
    ]);
    assert_exit_code!(fetch, 0);
    assert_file_exists!(&work.join("fetch_result.json"));

    let analyze = fixture.run_dojo(&[
        "analyze", "--input-dir", &work_str, "--type", "skill", "--output", &analysis,
    ]);
    assert_exit_code!(analyze, 0);
    assert_file_contains!(&analysis, "\"original_name\": \"Deploy Service\"");

    let name = fixture.run_dojo(&["name", "--input", &analysis, "--output", &naming]);
    assert_exit_code!(name, 0);
    assert_file_contains!(&naming, "proc-deploying-service-skill");
    assert_file_contains!(&naming, "\"analysis\"");

    let convert = fixture.run_dojo(&[
        "--robot", "convert", "--input", &work_str, "--output", &catalog, "--naming", &naming,
    ]);
    assert_exit_code!(convert, 0);
    let json = convert.json();
    assert_eq!(json["data"]["canonical_name"], "proc-deploying-service-skill");
    assert_file_exists!(&fixture.catalog.join("conversion_result.json"));
    assert_file_exists!(
        &fixture
            .catalog
            .join("skills/proc-deploying-service-skill/references/rollback.md")
    );

    let target = fixture
        .catalog
        .join("skills/proc-deploying-service-skill")
        .display()
        .to_string();
    let validate = fixture.run_dojo(&["--robot", "validate", "--path", &target, "--type", "skill"]);
    assert_exit_code!(validate, 0);
    assert_eq!(validate.json()["data"]["passed"], true);
}

#[test]
fn test_specialist_agent_is_named_deshi() {
    let fixture = TestFixture::new("test_specialist_agent_is_named_deshi");
    let source = fixture.source(
        "reviewer",
        &[
            ("README.md", REVIEWER_DOC),
            ("rules/no-secrets.md", "# No secrets\n"),
            ("notes.txt", "scratch"),
        ],
    );
    let config = fixture.config();

    let bundle = Fetcher::new(config.fetch.clone())
        .fetch(
            &SourceReference::parse(source.display().to_string()),
            ResourceKind::Agent,
            &fixture.path("work"),
        )
        .unwrap();
    let assessed = Analyzer::new(config.analysis.clone()).analyze(&bundle);
    let naming = Namer.name(&assessed.value);
    assert_eq!(naming.canonical_name, "deshi-security-reviewer");
    assert_eq!(naming.target_path, "agents/deshi-security-reviewer");

    let result = StructureConverter
        .convert(&bundle, &naming, &assessed.value, &fixture.catalog)
        .unwrap();
    assert_eq!(result.created_files, vec!["AGENT.md", "rules/no-secrets.md"]);

    let agent_md = result.target_directory.join("AGENT.md");
    assert_file_contains!(&agent_md, "- Purpose: A domain expert");
    assert_file_contains!(&agent_md, "- Scope: External definition");

    let report = Validator.validate(&result.target_directory, ResourceKind::Agent);
    assert!(report.passed, "{:?}", report.errors);
}

#[test]
fn test_reopened_bundle_keeps_fetch_provenance() {
    let fixture = TestFixture::new("test_reopened_bundle_keeps_fetch_provenance");
    let source = fixture.source("deploy", &[("SKILL.md", DEPLOY_DOC)]);
    let config = fixture.config();
    let work = fixture.path("work");

    Fetcher::new(config.fetch)
        .fetch(
            &SourceReference::parse(source.display().to_string()),
            ResourceKind::Skill,
            &work,
        )
        .unwrap();

    let reopened = FetchedBundle::open(&work, ResourceKind::Skill).unwrap();
    assert_eq!(reopened.origin_kind, OriginKind::LocalFilesystem);
    assert_eq!(reopened.source, source.display().to_string());
    assert!(reopened.metadata.contains_key("resolved_path"));
}
