use proptest::prelude::*;

use dojo_import::core::{AnalysisRecord, ResourceKind};
use dojo_import::naming::{Namer, to_kebab};

fn arb_record() -> impl Strategy<Value = AnalysisRecord> {
    (
        prop_oneof![Just(ResourceKind::Skill), Just(ResourceKind::Agent)],
        ".{0,60}",
        any::<[bool; 6]>(),
    )
        .prop_map(|(kind, name, flags)| {
            let mut record = AnalysisRecord::empty(kind);
            record.original_name = name;
            record.has_workflow = flags[0];
            record.characteristics.procedural = flags[1];
            record.characteristics.single_action = flags[2];
            record.characteristics.conditional = flags[3];
            record.characteristics.orchestrator = flags[4];
            record.characteristics.specialist = flags[5];
            record
        })
}

proptest! {
    #[test]
    fn naming_is_deterministic(record in arb_record()) {
        prop_assert_eq!(Namer.name(&record), Namer.name(&record.clone()));
    }

    #[test]
    fn canonical_names_follow_the_taxonomy(record in arb_record()) {
        let decision = Namer.name(&record);
        let name = &decision.canonical_name;
        match record.resource_kind {
            ResourceKind::Skill => {
                prop_assert!(
                    ["proc-", "action-", "cond-"].iter().any(|p| name.starts_with(p)),
                    "bad skill name {}", name
                );
                prop_assert!(name.ends_with("-skill"));
            }
            ResourceKind::Agent => {
                prop_assert!(name.starts_with("shihan-") || name.starts_with("deshi-"));
            }
        }
        prop_assert_eq!(
            decision.target_path,
            format!("{}/{}", record.resource_kind.plural(), name)
        );
        prop_assert!(!decision.kebab_name.is_empty());
    }

    #[test]
    fn kebab_output_has_no_edge_or_double_hyphens(name in ".{0,80}") {
        let kebab = to_kebab(&name);
        prop_assert!(!kebab.starts_with('-'));
        prop_assert!(!kebab.ends_with('-'));
        prop_assert!(!kebab.contains("--"));
    }
}
