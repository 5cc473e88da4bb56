//! Developer names derived from labels

use proptest::prelude::*;
use sfkit::names::label_to_developer_name;

proptest! {
    #[test]
    fn derived_names_use_api_name_charset(label in "\\PC{0,40}") {
        let name = label_to_developer_name(&label);
        prop_assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        prop_assert!(!name.contains("__"));
        prop_assert!(!name.starts_with(|c: char| c.is_ascii_digit()));
    }

    #[test]
    fn alphanumeric_labels_keep_their_characters(label in "[A-Za-z][A-Za-z0-9]{0,30}") {
        prop_assert_eq!(label_to_developer_name(&label), label);
    }

    #[test]
    fn words_are_joined_with_single_underscores(
        words in prop::collection::vec("[A-Za-z][A-Za-z0-9]{0,8}", 1..5),
        sep in "[ \\-/.]{1,3}",
    ) {
        let label = words.join(&sep);
        prop_assert_eq!(label_to_developer_name(&label), words.join("_"));
    }

    #[test]
    fn derivation_is_idempotent(label in "\\PC{0,40}") {
        let once = label_to_developer_name(&label);
        prop_assert_eq!(label_to_developer_name(&once), once.clone());
    }
}

#[test]
fn empty_label_yields_empty_name() {
    assert_eq!(label_to_developer_name(""), "");
}
