use std::path::Path;

use proptest::prelude::*;

use dojo_import::config::FetchConfig;
use dojo_import::error::DojoError;
use dojo_import::fetch::guard::{check_reference, check_url, is_blocked_host, safe_relative_path};

proptest! {
    #[test]
    fn loopback_v4_is_always_blocked(b in any::<u8>(), c in any::<u8>(), d in any::<u8>()) {
        let host = format!("127.{b}.{c}.{d}");
        prop_assert!(is_blocked_host(&host, &[]));
    }

    #[test]
    fn private_ranges_are_blocked(b in any::<u8>(), c in any::<u8>(), d in any::<u8>()) {
        let class_a = format!("10.{b}.{c}.{d}");
        let class_c = format!("192.168.{c}.{d}");
        let class_b = format!("172.{}.{c}.{d}", 16 + (b % 16));
        prop_assert!(is_blocked_host(&class_a, &[]));
        prop_assert!(is_blocked_host(&class_c, &[]));
        prop_assert!(is_blocked_host(&class_b, &[]));
    }

    #[test]
    fn blocked_hosts_never_pass_url_checks(
        host in prop_oneof![
            Just("localhost".to_string()),
            Just("[::1]".to_string()),
            Just("0.0.0.0".to_string()),
            (any::<u8>(), any::<u8>()).prop_map(|(c, d)| format!("192.168.{c}.{d}")),
        ],
        path in "[a-z]{1,12}",
    ) {
        let url = format!("https://{host}/{path}");
        let result = check_url(&url, &FetchConfig::default());
        prop_assert!(
            matches!(result, Err(DojoError::SecurityViolation { .. })),
            "{} was accepted", url
        );
    }

    #[test]
    fn traversal_segments_are_rejected(
        prefix in "[a-z]{1,8}",
        suffix in "[a-z]{1,8}",
        sep in prop_oneof![Just("/"), Just("\\")],
    ) {
        let raw = format!("./{prefix}{sep}..{sep}{suffix}");
        prop_assert!(check_reference(&raw).is_err());
    }

    #[test]
    fn safe_relative_paths_stay_inside(segments in prop::collection::vec("[a-zA-Z0-9 ._-]{1,10}", 1..5)) {
        let joined = segments.join("/");
        match safe_relative_path(Path::new(&joined)) {
            Some(path) => {
                prop_assert!(path.is_relative());
                prop_assert!(path.components().all(|c| matches!(c, std::path::Component::Normal(_))));
            }
            None => prop_assert!(
                segments.iter().any(|s| s == "..") || segments.iter().all(|s| s == ".")
            ),
        }
    }
}

#[test]
fn parent_components_are_never_safe() {
    assert!(safe_relative_path(Path::new("a/../../b")).is_none());
    assert!(safe_relative_path(Path::new("/etc/passwd")).is_none());
}
