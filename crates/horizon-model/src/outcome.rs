//! Tracked clinical outcomes and their column contract.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// A competing clinical event tracked per encounter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Death,
    Vasopressor,
    Ventilator,
}

impl OutcomeKind {
    /// All outcomes in output column order.
    pub const ALL: [OutcomeKind; 3] = [Self::Death, Self::Vasopressor, Self::Ventilator];

    /// Stem used in output column names.
    pub fn stem(self) -> &'static str {
        match self {
            Self::Death => "deceased",
            Self::Vasopressor => "vasopressor",
            Self::Ventilator => "ventilator",
        }
    }

    /// Name of the time-to-event-or-censor column, in days.
    pub fn time_column(self) -> String {
        format!("censor_or_{}_days", self.stem())
    }

    /// Name of the binary event indicator column.
    pub fn indicator_column(self) -> String {
        format!("{}_indicator", self.stem())
    }

    /// Canonical event tag recognised in event tables.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Death => "death",
            Self::Vasopressor => "vasopressor",
            Self::Ventilator => "ventilator",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}

impl FromStr for OutcomeKind {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "death" | "deceased" | "mortality" => Ok(Self::Death),
            "vasopressor" | "vasopressors" | "vp" => Ok(Self::Vasopressor),
            "ventilator" | "ventilation" | "mv" => Ok(Self::Ventilator),
            _ => Err(ModelError::UnknownOutcome(value.to_string())),
        }
    }
}

/// The six outcome columns appended to every horizon table, in order.
pub fn outcome_columns() -> Vec<String> {
    OutcomeKind::ALL
        .iter()
        .flat_map(|kind| [kind.time_column(), kind.indicator_column()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_columns_follow_contract() {
        assert_eq!(
            outcome_columns(),
            vec![
                "censor_or_deceased_days",
                "deceased_indicator",
                "censor_or_vasopressor_days",
                "vasopressor_indicator",
                "censor_or_ventilator_days",
                "ventilator_indicator",
            ]
        );
    }

    #[test]
    fn parses_outcome_aliases() {
        assert_eq!("deceased".parse::<OutcomeKind>().unwrap(), OutcomeKind::Death);
        assert_eq!("Death".parse::<OutcomeKind>().unwrap(), OutcomeKind::Death);
        assert_eq!("mv".parse::<OutcomeKind>().unwrap(), OutcomeKind::Ventilator);
        assert!("sepsis".parse::<OutcomeKind>().is_err());
    }
}
