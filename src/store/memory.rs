use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::RwLock;

use super::{
    DateRange, DietPlanChanges, DietStore, MealOptionChanges, MealOptionFilter, NewDietPlan,
    NewMealOption, NewPatient, Recorded,
};
use crate::patients::model::{Patient, PatientStatus};
use crate::schedule::calendar::format_date;
use crate::schedule::{DailyMealChoice, DietPlanEntry, MealOption, MealType};

#[derive(Debug, Clone)]
struct PlanRow {
    id: i64,
    nutritionist_id: i64,
    patient_id: i64,
    date: Date,
    meal_type: MealType,
    meal_option_ids: Vec<i64>,
    notes: Option<String>,
    completed: bool,
}

#[derive(Debug, Clone)]
struct ChoiceRow {
    id: i64,
    patient_id: i64,
    date: Date,
    meal_type: MealType,
    meal_option_id: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    meal_options: Vec<MealOption>,
    plans: Vec<PlanRow>,
    choices: Vec<ChoiceRow>,
    patients: Vec<Patient>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn option(&self, id: i64) -> Option<&MealOption> {
        self.meal_options.iter().find(|o| o.id == Some(id))
    }

    fn plan_entry(&self, row: &PlanRow) -> DietPlanEntry {
        DietPlanEntry {
            id: Some(row.id),
            patient_id: row.patient_id,
            nutritionist_id: Some(row.nutritionist_id),
            date: format_date(row.date),
            meal_type: row.meal_type.label().to_string(),
            meal_options: row
                .meal_option_ids
                .iter()
                .filter_map(|id| self.option(*id).cloned())
                .collect(),
            notes: row.notes.clone(),
            completed: row.completed,
        }
    }

    fn choice(&self, row: &ChoiceRow) -> DailyMealChoice {
        DailyMealChoice {
            id: Some(row.id),
            patient_id: row.patient_id,
            date: format_date(row.date),
            meal_type: row.meal_type.label().to_string(),
            meal_option_id: row.meal_option_id,
            meal_option: self.option(row.meal_option_id).cloned(),
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

/// In-process [`DietStore`]. Ids are shared across tables and start at 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_range(range: Option<DateRange>, date: Date) -> bool {
    range.map_or(true, |r| r.contains(date))
}

#[async_trait]
impl DietStore for MemoryStore {
    async fn list_meal_options(&self, filter: MealOptionFilter) -> anyhow::Result<Vec<MealOption>> {
        let t = self.tables.read().await;
        Ok(t.meal_options
            .iter()
            .filter(|o| filter.patient_id.map_or(true, |p| o.patient_id == p))
            .filter(|o| filter.meal_type.map_or(true, |m| o.meal_type == m))
            .cloned()
            .collect())
    }

    async fn get_meal_option(&self, id: i64) -> anyhow::Result<Option<MealOption>> {
        Ok(self.tables.read().await.option(id).cloned())
    }

    async fn create_meal_option(&self, new: NewMealOption) -> anyhow::Result<MealOption> {
        let mut t = self.tables.write().await;
        let now = OffsetDateTime::now_utc();
        let option = MealOption {
            id: Some(t.next_id()),
            name: new.name,
            meal_type: new.meal_type,
            description: new.description,
            calories: new.calories,
            protein: new.protein,
            carbs: new.carbs,
            fat: new.fat,
            items: new.items,
            is_active: true,
            patient_id: new.patient_id,
            created_at: Some(now),
            updated_at: Some(now),
        };
        t.meal_options.push(option.clone());
        Ok(option)
    }

    async fn update_meal_option(
        &self,
        id: i64,
        changes: MealOptionChanges,
    ) -> anyhow::Result<Option<MealOption>> {
        let mut t = self.tables.write().await;
        let Some(option) = t.meal_options.iter_mut().find(|o| o.id == Some(id)) else {
            return Ok(None);
        };
        let MealOptionChanges {
            name,
            description,
            calories,
            protein,
            carbs,
            fat,
            items,
            is_active,
        } = changes;
        if let Some(name) = name {
            option.name = name;
        }
        if description.is_some() {
            option.description = description;
        }
        option.calories = calories.or(option.calories);
        option.protein = protein.or(option.protein);
        option.carbs = carbs.or(option.carbs);
        option.fat = fat.or(option.fat);
        if let Some(items) = items {
            option.items = items;
        }
        if let Some(active) = is_active {
            option.is_active = active;
        }
        option.updated_at = Some(OffsetDateTime::now_utc());
        Ok(Some(option.clone()))
    }

    async fn delete_meal_option(&self, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.meal_options.len();
        t.meal_options.retain(|o| o.id != Some(id));
        if t.meal_options.len() == before {
            return Ok(false);
        }
        // Same cascade as the foreign keys in the Postgres schema.
        for plan in &mut t.plans {
            plan.meal_option_ids.retain(|o| *o != id);
        }
        t.choices.retain(|c| c.meal_option_id != id);
        Ok(true)
    }

    async fn diet_plans_for_patient(
        &self,
        patient_id: i64,
        range: Option<DateRange>,
    ) -> anyhow::Result<Vec<DietPlanEntry>> {
        let t = self.tables.read().await;
        let mut rows: Vec<&PlanRow> = t
            .plans
            .iter()
            .filter(|p| p.patient_id == patient_id && in_range(range, p.date))
            .collect();
        rows.sort_by_key(|p| (p.date, p.id));
        Ok(rows.into_iter().map(|p| t.plan_entry(p)).collect())
    }

    async fn get_diet_plan(&self, id: i64) -> anyhow::Result<Option<DietPlanEntry>> {
        let t = self.tables.read().await;
        Ok(t.plans.iter().find(|p| p.id == id).map(|p| t.plan_entry(p)))
    }

    async fn create_diet_plan(&self, new: NewDietPlan) -> anyhow::Result<DietPlanEntry> {
        let mut t = self.tables.write().await;
        let row = PlanRow {
            id: t.next_id(),
            nutritionist_id: new.nutritionist_id,
            patient_id: new.patient_id,
            date: new.date,
            meal_type: new.meal_type,
            meal_option_ids: new.meal_option_ids,
            notes: new.notes,
            completed: new.completed,
        };
        let entry = t.plan_entry(&row);
        t.plans.push(row);
        Ok(entry)
    }

    async fn update_diet_plan(
        &self,
        id: i64,
        changes: DietPlanChanges,
    ) -> anyhow::Result<Option<DietPlanEntry>> {
        let mut t = self.tables.write().await;
        let Some(row) = t.plans.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(date) = changes.date {
            row.date = date;
        }
        if let Some(meal_type) = changes.meal_type {
            row.meal_type = meal_type;
        }
        if let Some(ids) = changes.meal_option_ids {
            row.meal_option_ids = ids;
        }
        if changes.notes.is_some() {
            row.notes = changes.notes;
        }
        if let Some(completed) = changes.completed {
            row.completed = completed;
        }
        let row = row.clone();
        Ok(Some(t.plan_entry(&row)))
    }

    async fn delete_diet_plan(&self, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.plans.len();
        t.plans.retain(|p| p.id != id);
        Ok(t.plans.len() != before)
    }

    async fn daily_choices_for_patient(
        &self,
        patient_id: i64,
        range: Option<DateRange>,
    ) -> anyhow::Result<Vec<DailyMealChoice>> {
        let t = self.tables.read().await;
        let mut rows: Vec<&ChoiceRow> = t
            .choices
            .iter()
            .filter(|c| c.patient_id == patient_id && in_range(range, c.date))
            .collect();
        rows.sort_by_key(|c| (c.date, c.id));
        Ok(rows.into_iter().map(|c| t.choice(c)).collect())
    }

    async fn get_daily_choice(&self, id: i64) -> anyhow::Result<Option<DailyMealChoice>> {
        let t = self.tables.read().await;
        Ok(t.choices.iter().find(|c| c.id == id).map(|c| t.choice(c)))
    }

    async fn record_choice(
        &self,
        patient_id: i64,
        date: Date,
        meal_type: MealType,
        meal_option_id: i64,
    ) -> anyhow::Result<(DailyMealChoice, Recorded)> {
        let mut t = self.tables.write().await;
        let now = OffsetDateTime::now_utc();
        let existing = t
            .choices
            .iter()
            .position(|c| c.patient_id == patient_id && c.date == date && c.meal_type == meal_type);
        let (index, recorded) = match existing {
            Some(i) => {
                let row = &mut t.choices[i];
                row.meal_option_id = meal_option_id;
                row.updated_at = now;
                (i, Recorded::Updated)
            }
            None => {
                let id = t.next_id();
                t.choices.push(ChoiceRow {
                    id,
                    patient_id,
                    date,
                    meal_type,
                    meal_option_id,
                    created_at: now,
                    updated_at: now,
                });
                (t.choices.len() - 1, Recorded::Created)
            }
        };
        Ok((t.choice(&t.choices[index]), recorded))
    }

    async fn update_choice(
        &self,
        id: i64,
        meal_option_id: i64,
    ) -> anyhow::Result<Option<DailyMealChoice>> {
        let mut t = self.tables.write().await;
        let Some(row) = t.choices.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        row.meal_option_id = meal_option_id;
        row.updated_at = OffsetDateTime::now_utc();
        let row = row.clone();
        Ok(Some(t.choice(&row)))
    }

    async fn delete_choice(&self, id: i64) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.choices.len();
        t.choices.retain(|c| c.id != id);
        Ok(t.choices.len() != before)
    }

    async fn list_patients(&self, nutritionist_id: Option<i64>) -> anyhow::Result<Vec<Patient>> {
        let t = self.tables.read().await;
        let mut patients: Vec<Patient> = t
            .patients
            .iter()
            .filter(|p| nutritionist_id.map_or(true, |n| p.nutritionist_id == n))
            .cloned()
            .collect();
        patients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(patients)
    }

    async fn get_patient(&self, id: i64) -> anyhow::Result<Option<Patient>> {
        let t = self.tables.read().await;
        Ok(t.patients.iter().find(|p| p.id == id).cloned())
    }

    async fn create_patient(&self, new: NewPatient) -> anyhow::Result<Option<Patient>> {
        let mut t = self.tables.write().await;
        if t.patients.iter().any(|p| p.id == new.id) {
            return Ok(None);
        }
        let patient = Patient {
            id: new.id,
            nutritionist_id: new.nutritionist_id,
            name: new.name,
            age: new.age,
            email: new.email,
            phone: new.phone,
            goal: new.goal,
            status: PatientStatus::Active,
            updated_at: Some(OffsetDateTime::now_utc()),
        };
        t.patients.push(patient.clone());
        Ok(Some(patient))
    }
}
