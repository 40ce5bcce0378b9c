//! Declarative rule set consumed read-only by typing, audit, repair, and
//! unknown resolution. Loaded from TOML and validated once per load.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::act::{ActFlag, ActSpecification};
use crate::error::ConfigError;
use crate::types::NodeType;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    pub spacing: SpacingRules,
    pub bands: Vec<RowBand>,
    pub windows: WindowRules,
    pub structure: StructuralRules,
    pub unknown: UnknownRules,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpacingRules {
    /// Minimum row distance between two Elites joined by a route.
    pub elite_gap: usize,
    pub shop_gap: usize,
    pub port_gap: usize,
    /// Elites are banned below `ceil(rows * elite_unlock_percent / 100)`.
    pub elite_unlock_percent: u32,
    pub max_reroll_attempts: u32,
    pub fallback_type: NodeType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RowBand {
    pub name: String,
    pub min_row: usize,
    pub max_row: usize,
    #[serde(with = "odds_table")]
    pub odds: BTreeMap<NodeType, u32>,
}

impl RowBand {
    pub fn contains(&self, row: usize) -> bool {
        (self.min_row..=self.max_row).contains(&row)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowRules {
    /// Row filled with Treasure is `ceil(rows * treasure_row_percent / 100)`.
    pub treasure_row_percent: u32,
    /// Audit accepts a Treasure within this many rows of the treasure row.
    pub treasure_window_radius: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructuralRules {
    /// Types that may not follow themselves along an edge.
    pub no_consecutive: BTreeSet<NodeType>,
    pub ban_port_before_pre_boss: bool,
    pub distinct_siblings: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnknownRules {
    pub battle: PityParams,
    pub treasure: PityParams,
    pub shop: PityParams,
    pub event: PityParams,
    pub fallback_to_event: bool,
}

impl UnknownRules {
    pub fn params(&self, node_type: NodeType) -> Option<&PityParams> {
        match node_type {
            NodeType::Battle => Some(&self.battle),
            NodeType::Treasure => Some(&self.treasure),
            NodeType::Shop => Some(&self.shop),
            NodeType::Event => Some(&self.event),
            _ => None,
        }
    }
}

/// Chance of one Unknown outcome is `base_chance + chance_per_pity * pity`;
/// pity grows by `pity_increment` per miss up to `pity_cap`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PityParams {
    pub base_chance: f64,
    pub chance_per_pity: f64,
    pub pity_increment: u32,
    pub pity_cap: u32,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            spacing: SpacingRules {
                elite_gap: 3,
                shop_gap: 3,
                port_gap: 3,
                elite_unlock_percent: 35,
                max_reroll_attempts: 10,
                fallback_type: NodeType::Battle,
            },
            bands: vec![
                RowBand {
                    name: "early".to_string(),
                    min_row: 0,
                    max_row: 4,
                    odds: BTreeMap::from([
                        (NodeType::Battle, 55),
                        (NodeType::Elite, 5),
                        (NodeType::Shop, 10),
                        (NodeType::Unknown, 30),
                    ]),
                },
                RowBand {
                    name: "middle".to_string(),
                    min_row: 5,
                    max_row: 9,
                    odds: BTreeMap::from([
                        (NodeType::Battle, 45),
                        (NodeType::Elite, 16),
                        (NodeType::Shop, 9),
                        (NodeType::Unknown, 30),
                    ]),
                },
                RowBand {
                    name: "late".to_string(),
                    min_row: 10,
                    max_row: 99,
                    odds: BTreeMap::from([
                        (NodeType::Battle, 40),
                        (NodeType::Elite, 20),
                        (NodeType::Shop, 10),
                        (NodeType::Unknown, 30),
                    ]),
                },
            ],
            windows: WindowRules { treasure_row_percent: 60, treasure_window_radius: 1 },
            structure: StructuralRules {
                no_consecutive: BTreeSet::from([NodeType::Elite, NodeType::Shop, NodeType::Port]),
                ban_port_before_pre_boss: false,
                distinct_siblings: false,
            },
            unknown: UnknownRules {
                battle: PityParams {
                    base_chance: 0.1,
                    chance_per_pity: 0.1,
                    pity_increment: 1,
                    pity_cap: 8,
                },
                treasure: PityParams {
                    base_chance: 0.02,
                    chance_per_pity: 0.02,
                    pity_increment: 1,
                    pity_cap: 8,
                },
                shop: PityParams {
                    base_chance: 0.03,
                    chance_per_pity: 0.03,
                    pity_increment: 1,
                    pity_cap: 8,
                },
                event: PityParams {
                    base_chance: 0.0,
                    chance_per_pity: 0.0,
                    pity_increment: 1,
                    pity_cap: 8,
                },
                fallback_to_event: true,
            },
        }
    }
}

impl RuleSet {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let rules: RuleSet = toml::from_str(raw)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let spacing = &self.spacing;
        check_percent("spacing.elite_unlock_percent", spacing.elite_unlock_percent)?;
        check_percent("windows.treasure_row_percent", self.windows.treasure_row_percent)?;
        if spacing.max_reroll_attempts == 0 {
            return invalid("spacing.max_reroll_attempts must be at least 1".to_string());
        }
        if matches!(spacing.fallback_type, NodeType::Boss | NodeType::Unknown) {
            return invalid(format!(
                "spacing.fallback_type cannot be {}",
                spacing.fallback_type
            ));
        }
        for band in &self.bands {
            if band.min_row > band.max_row {
                return invalid(format!(
                    "band '{}' has min_row {} above max_row {}",
                    band.name, band.min_row, band.max_row
                ));
            }
        }
        for (name, params) in [
            ("battle", &self.unknown.battle),
            ("treasure", &self.unknown.treasure),
            ("shop", &self.unknown.shop),
            ("event", &self.unknown.event),
        ] {
            for (field, value) in
                [("base_chance", params.base_chance), ("chance_per_pity", params.chance_per_pity)]
            {
                if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                    return invalid(format!("unknown.{name}.{field} = {value} is outside [0, 1]"));
                }
            }
        }
        Ok(())
    }

    pub fn band_for_row(&self, row: usize) -> Option<&RowBand> {
        self.bands.iter().find(|band| band.contains(row))
    }

    pub fn elite_unlock_row(&self, rows: usize) -> usize {
        ceil_percent(rows, self.spacing.elite_unlock_percent)
    }

    pub fn treasure_row(&self, rows: usize) -> usize {
        ceil_percent(rows, self.windows.treasure_row_percent)
    }

    /// Inclusive row range in which the audit looks for a Treasure.
    pub fn treasure_window(&self, rows: usize) -> (usize, usize) {
        let center = self.treasure_row(rows);
        let radius = self.windows.treasure_window_radius;
        (center.saturating_sub(radius), (center + radius).min(rows.saturating_sub(1)))
    }

    pub fn min_gap(&self, node_type: NodeType) -> Option<usize> {
        match node_type {
            NodeType::Elite => Some(self.spacing.elite_gap),
            NodeType::Shop => Some(self.spacing.shop_gap),
            NodeType::Port => Some(self.spacing.port_gap),
            _ => None,
        }
    }

    pub fn distinct_siblings(&self, act: &ActSpecification) -> bool {
        self.structure.distinct_siblings || act.has_flag(ActFlag::DistinctSiblings)
    }

    pub fn bans_port_before_pre_boss(&self, act: &ActSpecification) -> bool {
        self.structure.ban_port_before_pre_boss || act.has_flag(ActFlag::NoPortBeforePreBoss)
    }
}

fn ceil_percent(rows: usize, percent: u32) -> usize {
    (rows * percent as usize).div_ceil(100)
}

fn check_percent(field: &str, value: u32) -> Result<(), ConfigError> {
    if (1..=99).contains(&value) {
        Ok(())
    } else {
        invalid(format!("{field} = {value} must be within 1..=99"))
    }
}

fn invalid(message: String) -> Result<(), ConfigError> {
    Err(ConfigError::InvalidRules(message))
}

/// Odds tables travel as string-keyed maps so every format can carry them.
mod odds_table {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::types::NodeType;

    pub(super) fn serialize<S: Serializer>(
        odds: &BTreeMap<NodeType, u32>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let by_name: BTreeMap<&str, u32> =
            odds.iter().map(|(kind, weight)| (kind.as_str(), *weight)).collect();
        by_name.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<NodeType, u32>, D::Error> {
        let by_name = BTreeMap::<String, u32>::deserialize(deserializer)?;
        by_name
            .into_iter()
            .map(|(name, weight)| name.parse().map(|kind| (kind, weight)).map_err(D::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_validate() {
        RuleSet::default().validate().expect("standard rules should be valid");
    }

    #[test]
    fn derived_rows_use_integer_ceilings() {
        let rules = RuleSet::default();
        assert_eq!(rules.elite_unlock_row(10), 4);
        assert_eq!(rules.treasure_row(10), 6);
        assert_eq!(rules.treasure_row(15), 9);
        assert_eq!(rules.elite_unlock_row(15), 6);
        assert_eq!(rules.treasure_window(10), (5, 7));
    }

    #[test]
    fn band_lookup_picks_first_matching_band() {
        let rules = RuleSet::default();
        assert_eq!(rules.band_for_row(0).map(|band| band.name.as_str()), Some("early"));
        assert_eq!(rules.band_for_row(7).map(|band| band.name.as_str()), Some("middle"));
        assert_eq!(rules.band_for_row(12).map(|band| band.name.as_str()), Some("late"));
        assert!(rules.band_for_row(100).is_none());
    }

    #[test]
    fn inverted_band_is_rejected() {
        let mut rules = RuleSet::default();
        rules.bands[0].min_row = 9;
        assert!(matches!(rules.validate(), Err(ConfigError::InvalidRules(_))));
    }

    #[test]
    fn out_of_range_chance_is_rejected() {
        let mut rules = RuleSet::default();
        rules.unknown.shop.base_chance = 1.5;
        let err = rules.validate().unwrap_err();
        assert!(err.to_string().contains("unknown.shop.base_chance"), "{err}");
    }

    #[test]
    fn boss_fallback_is_rejected() {
        let mut rules = RuleSet::default();
        rules.spacing.fallback_type = NodeType::Boss;
        assert!(rules.validate().is_err());
    }

    #[test]
    fn act_flags_enable_structural_rules() {
        let rules = RuleSet::default();
        let plain = ActSpecification::new(1, 10, 7);
        let flagged = ActSpecification::new(1, 10, 7)
            .with_flag(ActFlag::DistinctSiblings)
            .with_flag(ActFlag::NoPortBeforePreBoss);
        assert!(!rules.distinct_siblings(&plain));
        assert!(rules.distinct_siblings(&flagged));
        assert!(rules.bans_port_before_pre_boss(&flagged));
    }

    #[test]
    fn toml_round_trip_preserves_rules() {
        let rules = RuleSet::default();
        let raw = toml::to_string(&rules).expect("rules should serialize");
        let parsed = RuleSet::from_toml_str(&raw).expect("serialized rules should parse");
        assert_eq!(parsed, rules);
    }

    #[test]
    fn unknown_odds_key_is_a_parse_error() {
        let mut raw = toml::to_string(&RuleSet::default()).unwrap();
        raw = raw.replacen("Battle = 55", "Dragon = 55", 1);
        assert!(matches!(RuleSet::from_toml_str(&raw), Err(ConfigError::Parse(_))));
    }
}
