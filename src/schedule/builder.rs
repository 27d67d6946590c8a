use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Serialize, Serializer};
use time::Date;

use super::calendar::{format_date, parse_record_date, Week, WeekOutOfRange};
use super::meal_type::MealType;
use super::model::{DailyMealChoice, DietPlanEntry, MealOption};

/// One cell of the weekly grid.
///
/// The nutritionist prescription and the patient's pick are kept side by side;
/// a choice never clears the assigned meal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSlot {
    pub meal_type: MealType,
    pub assigned_meal: Option<MealOption>,
    pub selected_choice: Option<MealOption>,
    pub diet_plan_id: Option<i64>,
    pub choice_id: Option<i64>,
}

impl MealSlot {
    fn empty(meal_type: MealType) -> Self {
        Self {
            meal_type,
            assigned_meal: None,
            selected_choice: None,
            diet_plan_id: None,
            choice_id: None,
        }
    }

    /// What the patient will eat: their choice if made, otherwise the prescription.
    pub fn effective(&self) -> Option<&MealOption> {
        self.selected_choice.as_ref().or(self.assigned_meal.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.assigned_meal.is_none() && self.selected_choice.is_none()
    }
}

pub type DaySlots = BTreeMap<MealType, MealSlot>;

/// Seven days by six meal types, keyed by `YYYY-MM-DD` then meal type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySchedule {
    pub patient_id: i64,
    #[serde(serialize_with = "serialize_date")]
    week_start: Date,
    days: BTreeMap<String, DaySlots>,
}

fn serialize_date<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_date(*date))
}

impl WeeklySchedule {
    pub fn week_start(&self) -> Date {
        self.week_start
    }

    /// Date keys in calendar order.
    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.days.keys().map(String::as_str)
    }

    pub fn days(&self) -> &BTreeMap<String, DaySlots> {
        &self.days
    }

    pub fn day(&self, date: Date) -> Option<&DaySlots> {
        self.days.get(&format_date(date))
    }

    pub fn slot(&self, date: Date, meal_type: MealType) -> Option<&MealSlot> {
        self.day(date).and_then(|slots| slots.get(&meal_type))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    DietPlan,
    DailyChoice,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::DietPlan => f.write_str("diet plan"),
            RecordKind::DailyChoice => f.write_str("daily meal choice"),
        }
    }
}

/// A record left out of the grid because of its shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordIssue {
    #[error("{kind} {id:?} has an unparsable date {raw:?}")]
    MalformedRecord {
        kind: RecordKind,
        id: Option<i64>,
        raw: String,
    },
    #[error("{kind} {id:?} has an unknown meal type {raw:?}")]
    UnknownMealType {
        kind: RecordKind,
        id: Option<i64>,
        raw: String,
    },
}

/// Assembles a [`WeeklySchedule`] from flat diet-plan and daily-choice records.
///
/// Pure: no I/O, no logging, inputs are only borrowed. Records of other patients
/// and records outside the requested week are ignored.
#[derive(Debug, Clone)]
pub struct WeeklyScheduleBuilder<'a> {
    patient_id: i64,
    catalog: HashMap<i64, &'a MealOption>,
}

impl<'a> WeeklyScheduleBuilder<'a> {
    pub fn new(patient_id: i64) -> Self {
        Self {
            patient_id,
            catalog: HashMap::new(),
        }
    }

    /// Options used to resolve choices that only carry a `mealOptionId`.
    pub fn with_meal_options(mut self, options: &'a [MealOption]) -> Self {
        self.catalog
            .extend(options.iter().filter_map(|o| o.id.map(|id| (id, o))));
        self
    }

    pub fn build(
        &self,
        start_of_week: Date,
        diet_plans: &[DietPlanEntry],
        daily_choices: &[DailyMealChoice],
    ) -> Result<WeeklySchedule, WeekOutOfRange> {
        self.build_with_report(start_of_week, diet_plans, daily_choices)
            .map(|(schedule, _)| schedule)
    }

    /// Same as [`build`](Self::build), also returning the records that were skipped
    /// so the caller can log them.
    ///
    /// Fails only when the week holding `start_of_week` runs off either end of the
    /// supported calendar; a partial week is never returned.
    pub fn build_with_report(
        &self,
        start_of_week: Date,
        diet_plans: &[DietPlanEntry],
        daily_choices: &[DailyMealChoice],
    ) -> Result<(WeeklySchedule, Vec<RecordIssue>), WeekOutOfRange> {
        let week = Week::containing(start_of_week)?;
        let mut days: BTreeMap<String, DaySlots> = week
            .dates()
            .iter()
            .map(|d| {
                let slots: DaySlots = MealType::ALL
                    .into_iter()
                    .map(|t| (t, MealSlot::empty(t)))
                    .collect();
                (format_date(*d), slots)
            })
            .collect();
        let mut issues = Vec::new();

        for entry in diet_plans.iter().filter(|e| e.patient_id == self.patient_id) {
            let Some(slot) = locate(
                &mut days,
                &mut issues,
                RecordKind::DietPlan,
                entry.id,
                &entry.date,
                &entry.meal_type,
            ) else {
                continue;
            };
            // First non-empty entry wins; within it, the first option.
            if slot.assigned_meal.is_some() {
                continue;
            }
            if let Some(first) = entry.meal_options.first() {
                slot.assigned_meal = Some(first.clone());
                slot.diet_plan_id = entry.id;
            }
        }

        // Later choices for the same slot overwrite earlier ones.
        for choice in daily_choices.iter().filter(|c| c.patient_id == self.patient_id) {
            let Some(slot) = locate(
                &mut days,
                &mut issues,
                RecordKind::DailyChoice,
                choice.id,
                &choice.date,
                &choice.meal_type,
            ) else {
                continue;
            };
            slot.choice_id = choice.id;
            slot.selected_choice = choice
                .meal_option
                .clone()
                .or_else(|| self.catalog.get(&choice.meal_option_id).map(|o| (*o).clone()));
        }

        let schedule = WeeklySchedule {
            patient_id: self.patient_id,
            week_start: week.start(),
            days,
        };
        Ok((schedule, issues))
    }
}

/// Slot addressed by a record, or `None` if the record is unusable or out of the week.
fn locate<'d>(
    days: &'d mut BTreeMap<String, DaySlots>,
    issues: &mut Vec<RecordIssue>,
    kind: RecordKind,
    id: Option<i64>,
    raw_date: &str,
    raw_meal_type: &str,
) -> Option<&'d mut MealSlot> {
    let Some(date) = parse_record_date(raw_date) else {
        issues.push(RecordIssue::MalformedRecord {
            kind,
            id,
            raw: raw_date.to_string(),
        });
        return None;
    };
    let Ok(meal_type) = raw_meal_type.parse::<MealType>() else {
        issues.push(RecordIssue::UnknownMealType {
            kind,
            id,
            raw: raw_meal_type.to_string(),
        });
        return None;
    };
    days.get_mut(&format_date(date))?.get_mut(&meal_type)
}

/// Convenience for a builder without a meal-option catalog.
pub fn build_week(
    patient_id: i64,
    start_of_week: Date,
    diet_plans: &[DietPlanEntry],
    daily_choices: &[DailyMealChoice],
) -> Result<WeeklySchedule, WeekOutOfRange> {
    WeeklyScheduleBuilder::new(patient_id).build(start_of_week, diet_plans, daily_choices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::calendar::{parse_date, week_start};
    use time::macros::date;
    use time::Weekday;

    const PATIENT: i64 = 12;

    fn option(id: i64, name: &str, meal_type: MealType) -> MealOption {
        MealOption {
            id: Some(id),
            name: name.into(),
            meal_type,
            description: None,
            calories: Some(520.0),
            protein: None,
            carbs: None,
            fat: None,
            items: vec![],
            is_active: true,
            patient_id: PATIENT,
            created_at: None,
            updated_at: None,
        }
    }

    fn plan(id: i64, date: &str, meal_type: MealType, options: Vec<MealOption>) -> DietPlanEntry {
        DietPlanEntry {
            id: Some(id),
            patient_id: PATIENT,
            nutritionist_id: Some(1),
            date: date.into(),
            meal_type: meal_type.label().into(),
            meal_options: options,
            notes: None,
            completed: false,
        }
    }

    fn choice(id: i64, date: &str, meal_type: MealType, picked: Option<MealOption>, option_id: i64) -> DailyMealChoice {
        DailyMealChoice {
            id: Some(id),
            patient_id: PATIENT,
            date: date.into(),
            meal_type: meal_type.label().into(),
            meal_option_id: option_id,
            meal_option: picked,
            created_at: None,
            updated_at: None,
        }
    }

    fn salmon() -> MealOption {
        option(4, "Salmão grelhado com legumes", MealType::Lunch)
    }

    #[test]
    fn grid_is_total_with_seven_consecutive_dates() {
        let week = build_week(PATIENT, date!(2025 - 10 - 08), &[], &[]).unwrap();
        let keys: Vec<&str> = week.dates().collect();
        assert_eq!(keys.len(), 7);
        let parsed: Vec<Date> = keys.iter().map(|k| parse_date(k).unwrap()).collect();
        for pair in parsed.windows(2) {
            assert_eq!(pair[0].next_day(), Some(pair[1]));
        }
        for slots in week.days().values() {
            assert_eq!(slots.len(), MealType::ALL.len());
            assert!(slots.values().all(MealSlot::is_empty));
        }
    }

    #[test]
    fn assigned_meal_without_choice() {
        let plans = [plan(1, "2025-10-06", MealType::Lunch, vec![salmon()])];
        let week = build_week(PATIENT, date!(2025 - 10 - 06), &plans, &[]).unwrap();
        let slot = week.slot(date!(2025 - 10 - 06), MealType::Lunch).unwrap();
        assert_eq!(slot.assigned_meal.as_ref().and_then(|m| m.id), Some(4));
        assert!(slot.selected_choice.is_none());
        assert_eq!(slot.diet_plan_id, Some(1));
        assert!(week.slot(date!(2025 - 10 - 06), MealType::Dinner).unwrap().is_empty());
    }

    #[test]
    fn choice_and_assignment_are_both_retained() {
        let plans = [plan(1, "2025-10-06", MealType::Lunch, vec![salmon()])];
        let picked = option(7, "Frango com batata doce", MealType::Lunch);
        let choices = [choice(30, "2025-10-06", MealType::Lunch, Some(picked), 7)];
        let week = build_week(PATIENT, date!(2025 - 10 - 06), &plans, &choices).unwrap();
        let slot = week.slot(date!(2025 - 10 - 06), MealType::Lunch).unwrap();
        assert_eq!(slot.assigned_meal.as_ref().and_then(|m| m.id), Some(4));
        assert_eq!(slot.selected_choice.as_ref().and_then(|m| m.id), Some(7));
        assert_eq!(slot.effective().and_then(|m| m.id), Some(7));
        assert_eq!(slot.choice_id, Some(30));
    }

    #[test]
    fn malformed_dates_do_not_blank_the_week() {
        let plans = [
            plan(1, "not-a-date", MealType::Dinner, vec![option(9, "Sopa", MealType::Dinner)]),
            plan(2, "2025-10-07", MealType::Dinner, vec![option(10, "Omelete", MealType::Dinner)]),
        ];
        let builder = WeeklyScheduleBuilder::new(PATIENT);
        let (week, issues) = builder.build_with_report(date!(2025 - 10 - 07), &plans, &[]).unwrap();
        let slot = week.slot(date!(2025 - 10 - 07), MealType::Dinner).unwrap();
        assert_eq!(slot.assigned_meal.as_ref().and_then(|m| m.id), Some(10));
        assert_eq!(
            issues,
            vec![RecordIssue::MalformedRecord {
                kind: RecordKind::DietPlan,
                id: Some(1),
                raw: "not-a-date".into(),
            }]
        );
    }

    #[test]
    fn unknown_meal_types_are_dropped() {
        let mut stray = choice(5, "2025-10-07", MealType::Lunch, Some(salmon()), 4);
        stray.meal_type = "Brunch".into();
        let (week, issues) =
            WeeklyScheduleBuilder::new(PATIENT).build_with_report(date!(2025 - 10 - 07), &[], &[stray]).unwrap();
        assert!(week.days().values().flat_map(|d| d.values()).all(MealSlot::is_empty));
        assert!(matches!(
            issues.as_slice(),
            [RecordIssue::UnknownMealType { kind: RecordKind::DailyChoice, id: Some(5), .. }]
        ));
    }

    #[test]
    fn wednesday_start_is_normalized_to_sunday() {
        let week = build_week(PATIENT, date!(2025 - 10 - 08), &[], &[]).unwrap();
        assert_eq!(week.week_start(), date!(2025 - 10 - 05));
        assert_eq!(week.week_start().weekday(), Weekday::Sunday);
        assert_eq!(week.dates().next(), Some("2025-10-05"));
        assert_eq!(week.dates().last(), Some("2025-10-11"));
    }

    #[test]
    fn first_date_round_trips_to_same_week_start() {
        for start in [date!(2025 - 10 - 08), date!(2024 - 12 - 31), date!(2025 - 03 - 02)] {
            let week = build_week(PATIENT, start, &[], &[]).unwrap();
            let first = parse_date(week.dates().next().unwrap()).unwrap();
            assert_eq!(week_start(first), Ok(week.week_start()));
            assert_eq!(build_week(PATIENT, first, &[], &[]).unwrap(), week);
        }
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let plans = [plan(1, "2025-10-06", MealType::Lunch, vec![salmon()])];
        let choices = [choice(2, "2025-10-06", MealType::Lunch, Some(salmon()), 4)];
        let a = build_week(PATIENT, date!(2025 - 10 - 06), &plans, &choices).unwrap();
        let b = build_week(PATIENT, date!(2025 - 10 - 06), &plans, &choices).unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_value(&a).unwrap(), serde_json::to_value(&b).unwrap());
    }

    #[test]
    fn records_outside_the_week_or_of_other_patients_are_ignored() {
        let mut foreign = plan(3, "2025-10-06", MealType::Breakfast, vec![option(8, "Pão", MealType::Breakfast)]);
        foreign.patient_id = 99;
        let plans = [
            plan(1, "2025-10-13", MealType::Lunch, vec![salmon()]),
            plan(2, "2025-10-04", MealType::Lunch, vec![salmon()]),
            foreign,
        ];
        let (week, issues) =
            WeeklyScheduleBuilder::new(PATIENT).build_with_report(date!(2025 - 10 - 06), &plans, &[]).unwrap();
        assert!(issues.is_empty());
        assert!(week.days().values().flat_map(|d| d.values()).all(MealSlot::is_empty));
    }

    #[test]
    fn first_option_of_first_entry_wins() {
        let plans = [
            plan(1, "2025-10-06", MealType::Lunch, vec![]),
            plan(2, "2025-10-06", MealType::Lunch, vec![salmon(), option(5, "Massa", MealType::Lunch)]),
            plan(3, "2025-10-06", MealType::Lunch, vec![option(6, "Quinoa", MealType::Lunch)]),
        ];
        let week = build_week(PATIENT, date!(2025 - 10 - 06), &plans, &[]).unwrap();
        let slot = week.slot(date!(2025 - 10 - 06), MealType::Lunch).unwrap();
        assert_eq!(slot.assigned_meal.as_ref().and_then(|m| m.id), Some(4));
        assert_eq!(slot.diet_plan_id, Some(2));
    }

    #[test]
    fn last_choice_for_a_slot_wins() {
        let choices = [
            choice(1, "2025-10-06", MealType::Dinner, Some(option(9, "Sopa", MealType::Dinner)), 9),
            choice(2, "2025-10-06T19:00:00", MealType::Dinner, Some(option(10, "Omelete", MealType::Dinner)), 10),
        ];
        let week = build_week(PATIENT, date!(2025 - 10 - 06), &[], &choices).unwrap();
        let slot = week.slot(date!(2025 - 10 - 06), MealType::Dinner).unwrap();
        assert_eq!(slot.selected_choice.as_ref().and_then(|m| m.id), Some(10));
        assert_eq!(slot.choice_id, Some(2));
    }

    #[test]
    fn choices_without_embedded_option_resolve_through_catalog() {
        let catalog = [salmon(), option(7, "Frango", MealType::Lunch)];
        let choices = [
            choice(1, "2025-10-06", MealType::Lunch, None, 7),
            choice(2, "2025-10-07", MealType::Lunch, None, 404),
        ];
        let week = WeeklyScheduleBuilder::new(PATIENT)
            .with_meal_options(&catalog)
            .build(date!(2025 - 10 - 06), &[], &choices).unwrap();
        let resolved = week.slot(date!(2025 - 10 - 06), MealType::Lunch).unwrap();
        assert_eq!(resolved.selected_choice.as_ref().map(|m| m.name.as_str()), Some("Frango"));
        let dangling = week.slot(date!(2025 - 10 - 07), MealType::Lunch).unwrap();
        assert!(dangling.selected_choice.is_none());
        assert_eq!(dangling.choice_id, Some(2));
    }

    #[test]
    fn serializes_date_keys_and_meal_labels() {
        let plans = [plan(1, "2025-10-06", MealType::Lunch, vec![salmon()])];
        let week = build_week(PATIENT, date!(2025 - 10 - 06), &plans, &[]).unwrap();
        let json = serde_json::to_value(&week).unwrap();
        assert_eq!(json["patientId"], 12);
        assert_eq!(json["weekStart"], "2025-10-05");
        assert_eq!(json["days"]["2025-10-06"]["Almoço"]["assignedMeal"]["id"], 4);
        assert!(json["days"]["2025-10-06"]["Almoço"]["selectedChoice"].is_null());
    }

    #[test]
    fn weeks_past_the_calendar_edges_are_refused() {
        assert_eq!(
            build_week(PATIENT, Date::MAX, &[], &[]),
            Err(WeekOutOfRange(Date::MAX))
        );
        assert!(build_week(PATIENT, Date::MIN, &[], &[]).is_err());

        // The last complete week still has seven distinct days and a Sunday start.
        let mut last = Date::MAX;
        while build_week(PATIENT, last, &[], &[]).is_err() {
            last = last.previous_day().unwrap();
        }
        let week = build_week(PATIENT, last, &[], &[]).unwrap();
        assert_eq!(week.dates().count(), 7);
        assert_eq!(week.week_start().weekday(), Weekday::Sunday);
        assert_eq!(week.dates().last(), Some(format_date(last).as_str()));
    }
}
