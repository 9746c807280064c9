//! Tests for handle validation and normalization.

use proptest::prelude::*;
use skystats_common::{escape_html, Handle, StatsError, INVALID_HANDLE_MESSAGE};

#[test]
fn test_invalid_handle_user_message() {
    let error = Handle::parse("alice").unwrap_err();
    assert_eq!(error.user_message(), INVALID_HANDLE_MESSAGE);
    assert!(matches!(error, StatsError::Validation { .. }));
}

#[test]
fn test_normalized_bare_name_is_valid() {
    let normalized = Handle::normalize_input("@al");
    assert_eq!(normalized, "al.bsky.social");
    assert!(Handle::parse(&normalized).is_ok());
}

proptest! {
    #[test]
    fn normalized_bare_names_always_parse(name in "[a-z0-9][a-z0-9-]{0,20}") {
        let normalized = Handle::normalize_input(&name);
        let handle = Handle::parse(&normalized).unwrap();
        prop_assert!(handle.as_str().ends_with(".bsky.social"));
        prop_assert!(handle.as_str().starts_with(&name));
    }

    #[test]
    fn names_without_dot_never_parse(name in "[a-z0-9-]{0,40}") {
        prop_assert!(Handle::parse(&name).is_err());
    }

    #[test]
    fn escaped_html_has_no_raw_markup(input in ".*") {
        let escaped = escape_html(&input);
        prop_assert!(!escaped.contains('<'));
        prop_assert!(!escaped.contains('>'));
        prop_assert!(!escaped.contains('"'));
    }
}
