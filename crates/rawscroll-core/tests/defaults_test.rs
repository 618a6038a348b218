//! Property tests for the per-alias defaults resolver.

use std::collections::BTreeMap;

use proptest::prelude::*;
use rawscroll_core::config::{DatabaseConfig, RawScrollConfig};

fn opt_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-z0-9_]{0,8}")
}

fn engine() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop_oneof![
        Just(String::new()),
        Just("sqlite".to_string()),
        Just("rawscroll.backends.sqlite".to_string()),
        Just("rawscroll.backends.".to_string()),
        "[a-z]{1,8}",
    ])
}

prop_compose! {
    fn database_config()(
        engine in engine(),
        name in opt_text(),
        user in opt_text(),
        password in opt_text(),
        host in opt_text(),
        port in opt_text(),
        time_zone in opt_text(),
        options in prop::option::of(prop::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..3)),
        test_charset in opt_text(),
        test_name in opt_text(),
    ) -> DatabaseConfig {
        DatabaseConfig {
            engine, name, user, password, host, port, time_zone, options,
            test_charset, test_collation: None, test_name, test_mirror: None,
        }
    }
}

proptest! {
    #[test]
    fn every_required_key_is_filled(cfg in database_config()) {
        let mut resolved = cfg.clone();
        resolved.apply_defaults("UTC");

        let engine = resolved.engine.as_deref().unwrap_or_default();
        prop_assert!(!engine.is_empty());
        prop_assert!(!engine.starts_with("rawscroll.backends"));
        prop_assert!(resolved.options.is_some());
        prop_assert!(resolved.time_zone.is_some());
        for key in [&resolved.name, &resolved.user, &resolved.password, &resolved.host, &resolved.port] {
            prop_assert!(key.is_some());
        }
        // Given values survive untouched.
        prop_assert_eq!(&resolved.name, &cfg.name.clone().or(Some(String::new())));
        prop_assert_eq!(&resolved.time_zone, &cfg.time_zone.clone().or(Some("UTC".to_string())));
        // Unset test settings stay unset.
        prop_assert_eq!(&resolved.test_charset, &cfg.test_charset);
        prop_assert_eq!(resolved.test_collation, None);
    }

    #[test]
    fn resolving_twice_changes_nothing(cfg in database_config()) {
        let mut once = cfg;
        once.apply_defaults("UTC");
        let mut twice = once.clone();
        twice.apply_defaults("Asia/Tokyo");
        prop_assert_eq!(once, twice);
    }
}

#[test]
fn empty_entry_resolves_to_dummy() {
    let config = RawScrollConfig::default().with_database("default", DatabaseConfig::default());
    let settings = config.ensure_defaults("default").unwrap();
    assert_eq!(settings.engine, "dummy");
    assert_eq!(settings.options, BTreeMap::new());
    assert_eq!(settings.time_zone, "UTC");
    assert_eq!(
        (settings.name.as_str(), settings.user.as_str(), settings.port.as_str()),
        ("", "", "")
    );
    assert_eq!(settings.test.mirror, None);
}
