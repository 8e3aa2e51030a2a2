use proptest::prelude::*;
use querycache_client::harness::{render_message, LOADING_MESSAGE};
use querycache_core::QuerySnapshot;
use querycache_test_utils::character;
use querycache_test_utils::generators::{arb_character_name, arb_json_value};

proptest! {
    #[test]
    fn loading_snapshots_always_render_loading(data in arb_json_value(), complete in any::<bool>()) {
        let snapshot = QuerySnapshot::refetching(data, complete);
        prop_assert_eq!(render_message(&snapshot), LOADING_MESSAGE);
    }

    #[test]
    fn settled_characters_render_their_name(name in arb_character_name()) {
        let snapshot = QuerySnapshot::ready(character(&name), true);
        prop_assert_eq!(render_message(&snapshot), format!("Fetched: {}", name));
    }
}
