mod config;
mod validation;

pub use config::{
    default_superior_bands, BandLink, EvaluationRule, LevelBand, RuleDefinition,
    SuperiorStrategy, DEFAULT_LEVEL_DIFF_LIMIT, DEFAULT_RELATION_WEIGHT,
};
pub use validation::{check_rule, RuleViolation, WEIGHT_SUM_TOLERANCE};
