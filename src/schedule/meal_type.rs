use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Meal slot of a day. Declaration order is the chronological order within a day,
/// and the derived `Ord` relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MealType {
    #[serde(rename = "Café da Manhã", alias = "BREAKFAST")]
    Breakfast,
    #[serde(rename = "Lanche da Manhã", alias = "MORNING_SNACK")]
    MorningSnack,
    #[serde(rename = "Almoço", alias = "LUNCH")]
    Lunch,
    #[serde(rename = "Lanche da Tarde", alias = "AFTERNOON_SNACK")]
    AfternoonSnack,
    #[serde(rename = "Jantar", alias = "DINNER")]
    Dinner,
    #[serde(rename = "Ceia", alias = "EVENING_SNACK")]
    EveningSnack,
}

impl MealType {
    pub const ALL: [MealType; 6] = [
        MealType::Breakfast,
        MealType::MorningSnack,
        MealType::Lunch,
        MealType::AfternoonSnack,
        MealType::Dinner,
        MealType::EveningSnack,
    ];

    /// Label used on the wire and in the `meal_type` columns.
    pub fn label(self) -> &'static str {
        match self {
            MealType::Breakfast => "Café da Manhã",
            MealType::MorningSnack => "Lanche da Manhã",
            MealType::Lunch => "Almoço",
            MealType::AfternoonSnack => "Lanche da Tarde",
            MealType::Dinner => "Jantar",
            MealType::EveningSnack => "Ceia",
        }
    }

    fn identifier(self) -> &'static str {
        match self {
            MealType::Breakfast => "BREAKFAST",
            MealType::MorningSnack => "MORNING_SNACK",
            MealType::Lunch => "LUNCH",
            MealType::AfternoonSnack => "AFTERNOON_SNACK",
            MealType::Dinner => "DINNER",
            MealType::EveningSnack => "EVENING_SNACK",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown meal type: {0:?}")]
pub struct UnknownMealType(pub String);

impl FromStr for MealType {
    type Err = UnknownMealType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        MealType::ALL
            .into_iter()
            .find(|t| t.label() == s || t.identifier() == s)
            .ok_or_else(|| UnknownMealType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_and_identifiers() {
        assert_eq!("Almoço".parse::<MealType>().unwrap(), MealType::Lunch);
        assert_eq!("EVENING_SNACK".parse::<MealType>().unwrap(), MealType::EveningSnack);
        assert_eq!(" Ceia ".parse::<MealType>().unwrap(), MealType::EveningSnack);
    }

    #[test]
    fn rejects_values_outside_the_enumeration() {
        let err = "Brunch".parse::<MealType>().unwrap_err();
        assert_eq!(err, UnknownMealType("Brunch".into()));
    }

    #[test]
    fn ordering_is_chronological() {
        let mut shuffled = vec![MealType::Dinner, MealType::Breakfast, MealType::EveningSnack, MealType::Lunch];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![MealType::Breakfast, MealType::Lunch, MealType::Dinner, MealType::EveningSnack]
        );
    }

    #[test]
    fn serializes_as_label() {
        let json = serde_json::to_string(&MealType::MorningSnack).unwrap();
        assert_eq!(json, "\"Lanche da Manhã\"");
        let back: MealType = serde_json::from_str("\"AFTERNOON_SNACK\"").unwrap();
        assert_eq!(back, MealType::AfternoonSnack);
    }
}
