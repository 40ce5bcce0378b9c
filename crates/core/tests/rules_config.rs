use std::fs;
use std::path::Path;

use actmap::{ConfigError, NodeType, RuleSet};

const STANDARD_RULES: &str = include_str!("../rules/standard.toml");

#[test]
fn shipped_standard_rules_match_defaults() {
    let parsed = RuleSet::from_toml_str(STANDARD_RULES).expect("standard.toml should parse");
    assert_eq!(parsed, RuleSet::default());
}

#[test]
fn rules_load_from_a_file_on_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("hard.toml");
    let raw = STANDARD_RULES
        .replace("elite_gap = 3", "elite_gap = 5")
        .replace("fallback_type = \"Battle\"", "fallback_type = \"Event\"");
    fs::write(&path, raw).expect("write rules");

    let rules = RuleSet::load(&path).expect("rules should load");
    assert_eq!(rules.spacing.elite_gap, 5);
    assert_eq!(rules.spacing.fallback_type, NodeType::Event);
    assert_eq!(rules.bands, RuleSet::default().bands);
}

#[test]
fn missing_rule_file_reports_its_path() {
    let err = RuleSet::load(Path::new("/definitely/not/here/rules.toml"))
        .expect_err("missing file must fail");
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("/definitely/not/here/rules.toml"), "{err}");
}

#[test]
fn unknown_fields_are_rejected() {
    let raw = STANDARD_RULES.replace("elite_gap = 3", "elite_gap = 3\nboss_gap = 2");
    assert!(matches!(RuleSet::from_toml_str(&raw), Err(ConfigError::Parse(_))));
}

#[test]
fn invalid_values_are_caught_at_load_time() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("broken.toml");
    let raw = STANDARD_RULES.replace("treasure_row_percent = 60", "treasure_row_percent = 140");
    fs::write(&path, raw).expect("write rules");

    let err = RuleSet::load(&path).expect_err("percent above 99 must fail");
    assert!(matches!(err, ConfigError::InvalidRules(_)));
    assert!(err.to_string().contains("treasure_row_percent"), "{err}");
}

#[test]
fn zero_rerolls_are_rejected() {
    let raw = STANDARD_RULES.replace("max_reroll_attempts = 10", "max_reroll_attempts = 0");
    assert!(matches!(RuleSet::from_toml_str(&raw), Err(ConfigError::InvalidRules(_))));
}
