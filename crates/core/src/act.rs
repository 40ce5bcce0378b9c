//! Per-act shape of the map: row count, odd column count, and flags.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rules::RuleSet;

/// Number of paths the skeleton weaver grows through every act.
pub const PATH_COUNT: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActFlag {
    /// Children of one parent on the same row must not share a type.
    DistinctSiblings,
    /// Port may not appear on the row right below the pre-boss row.
    NoPortBeforePreBoss,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActSpecification {
    pub act_id: u32,
    pub rows: usize,
    pub columns: usize,
    pub branchiness: f64,
    pub flags: BTreeSet<ActFlag>,
}

impl ActSpecification {
    pub fn new(act_id: u32, rows: usize, columns: usize) -> Self {
        Self { act_id, rows, columns, branchiness: 0.0, flags: BTreeSet::new() }
    }

    pub fn with_branchiness(mut self, branchiness: f64) -> Self {
        self.branchiness = branchiness;
        self
    }

    pub fn with_flag(mut self, flag: ActFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn has_flag(&self, flag: ActFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn boss_row(&self) -> usize {
        self.rows.saturating_sub(1)
    }

    pub fn pre_boss_row(&self) -> usize {
        self.rows.saturating_sub(2)
    }

    pub fn boss_column(&self) -> usize {
        self.columns / 2
    }

    /// How many leading paths must each start on a column no earlier path used.
    pub fn distinct_start_paths(&self) -> usize {
        let requested = (self.branchiness * PATH_COUNT as f64).round() as usize;
        requested.clamp(2, PATH_COUNT.min(self.columns).max(2))
    }

    /// Checks the act against itself and against the rows `rules` pins.
    pub fn validate(&self, rules: &RuleSet) -> Result<(), ConfigError> {
        if self.columns % 2 == 0 {
            return Err(ConfigError::EvenColumns { columns: self.columns });
        }
        if self.columns < 3 {
            return Err(ConfigError::TooFewColumns { columns: self.columns });
        }
        if !(0.0..=1.0).contains(&self.branchiness) {
            return Err(ConfigError::Branchiness(self.branchiness));
        }
        let treasure_row = rules.treasure_row(self.rows);
        if self.rows < 4 || treasure_row == 0 || treasure_row >= self.pre_boss_row() {
            return Err(ConfigError::TooFewRows { rows: self.rows, treasure_row });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_columns_are_rejected_before_generation() {
        let err = ActSpecification::new(1, 10, 6)
            .validate(&RuleSet::default())
            .expect_err("even columns must fail");
        assert!(matches!(err, ConfigError::EvenColumns { columns: 6 }));
    }

    #[test]
    fn single_column_is_rejected() {
        let err = ActSpecification::new(1, 10, 1).validate(&RuleSet::default()).unwrap_err();
        assert!(matches!(err, ConfigError::TooFewColumns { .. }));
    }

    #[test]
    fn short_acts_collapse_fixed_rows_and_are_rejected() {
        let err = ActSpecification::new(1, 7, 7).validate(&RuleSet::default()).unwrap_err();
        assert!(matches!(err, ConfigError::TooFewRows { rows: 7, .. }));
        assert!(ActSpecification::new(1, 8, 7).validate(&RuleSet::default()).is_ok());
    }

    #[test]
    fn branchiness_outside_unit_range_is_rejected() {
        let act = ActSpecification::new(1, 10, 7).with_branchiness(1.5);
        assert!(matches!(act.validate(&RuleSet::default()), Err(ConfigError::Branchiness(_))));
    }

    #[test]
    fn distinct_start_paths_is_clamped_by_columns() {
        assert_eq!(ActSpecification::new(1, 10, 7).distinct_start_paths(), 2);
        assert_eq!(ActSpecification::new(1, 10, 7).with_branchiness(1.0).distinct_start_paths(), 6);
        assert_eq!(ActSpecification::new(1, 10, 3).with_branchiness(1.0).distinct_start_paths(), 3);
        assert_eq!(ActSpecification::new(1, 10, 7).with_branchiness(0.5).distinct_start_paths(), 3);
    }
}
