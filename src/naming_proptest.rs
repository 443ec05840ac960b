//! Property-based tests for branch and clone naming.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::clone::repo_name_from_url;
    use crate::git::{automation_branch_name, is_automation_branch};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    // ============================================================================
    // automation_branch_name property tests
    // ============================================================================

    proptest! {
        /// Property: a branch named for a slash-free base is recognised by the cleanup pattern
        #[test]
        fn automation_branch_name_matches_pattern(
            base in "[A-Za-z0-9._-]{1,20}",
            secs in 0i64..4_102_444_800,
        ) {
            let at = Utc.timestamp_opt(secs, 0).unwrap();
            let name = automation_branch_name(&base, at);
            prop_assert!(is_automation_branch(&name), "{} should match", name);
        }

        /// Property: the timestamp suffix is always 14 digits
        #[test]
        fn automation_branch_name_has_fixed_width_timestamp(
            base in "[a-z]{1,10}",
            secs in 0i64..4_102_444_800,
        ) {
            let at = Utc.timestamp_opt(secs, 0).unwrap();
            let name = automation_branch_name(&base, at);
            let stamp = name.rsplit('/').next().unwrap();
            prop_assert_eq!(stamp.len(), 14);
            prop_assert!(stamp.chars().all(|c| c.is_ascii_digit()));
            let prefix = format!("update-mirrors/{}/", base);
            prop_assert!(name.starts_with(&prefix));
        }

        /// Property: later instants never sort before earlier ones
        #[test]
        fn automation_branch_names_sort_chronologically(
            a in 0i64..4_102_444_800,
            b in 0i64..4_102_444_800,
        ) {
            let first = automation_branch_name("main", Utc.timestamp_opt(a.min(b), 0).unwrap());
            let second = automation_branch_name("main", Utc.timestamp_opt(a.max(b), 0).unwrap());
            prop_assert!(first <= second);
        }

        /// Property: bases containing '/' are never matched, so cleanup leaves them alone
        #[test]
        fn nested_base_is_not_an_automation_branch(
            left in "[a-z]{1,8}",
            right in "[a-z0-9.]{1,8}",
        ) {
            let name = format!("update-mirrors/{}/{}/20240102030405", left, right);
            prop_assert!(!is_automation_branch(&name));
        }
    }

    // ============================================================================
    // repo_name_from_url property tests
    // ============================================================================

    proptest! {
        /// Property: the clone directory name is a single usable path component
        #[test]
        fn repo_name_is_single_component(url in ".*") {
            let name = repo_name_from_url(&url);
            prop_assert!(!name.is_empty());
            prop_assert!(!name.contains('/'));
            prop_assert!(name != "." && name != "..");
        }

        /// Property: the name is the last segment without `.git`
        #[test]
        fn repo_name_strips_git_suffix(
            host in "[a-z]{1,10}",
            group in "[a-z-]{1,10}",
            project in "[a-z][a-z0-9_-]{0,15}",
        ) {
            let url = format!("https://{}.org/{}/{}.git", host, group, project);
            prop_assert_eq!(repo_name_from_url(&url), project.clone());
            let url = format!("https://{}.org/{}/{}", host, group, project);
            prop_assert_eq!(repo_name_from_url(&url), project);
        }
    }
}
