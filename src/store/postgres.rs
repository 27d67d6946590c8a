use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use time::{Date, OffsetDateTime};

use super::{
    DateRange, DietPlanChanges, DietStore, MealOptionChanges, MealOptionFilter, NewDietPlan,
    NewMealOption, NewPatient, Recorded,
};
use crate::patients::model::{Patient, PatientStatus};
use crate::schedule::calendar::format_date;
use crate::schedule::{DailyMealChoice, DietPlanEntry, FoodItem, MealOption, MealType};

const MEAL_OPTION_COLUMNS: &str = "id, patient_id, name, meal_type, description, calories, protein, \
     carbs, fat, items, is_active, created_at, updated_at";

const CHOICE_COLUMNS: &str =
    "id, patient_id, date, meal_type, meal_option_id, created_at, updated_at";

const DIET_PLAN_COLUMNS: &str = "id, nutritionist_id, patient_id, date, meal_type, notes, completed";

const PATIENT_COLUMNS: &str = "id, nutritionist_id, name, age, email, phone, goal, status, updated_at";

#[derive(Debug, FromRow)]
struct MealOptionRow {
    id: i64,
    patient_id: i64,
    name: String,
    meal_type: String,
    description: Option<String>,
    calories: Option<f64>,
    protein: Option<f64>,
    carbs: Option<f64>,
    fat: Option<f64>,
    items: Json<Vec<FoodItem>>,
    is_active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<MealOptionRow> for MealOption {
    type Error = anyhow::Error;

    fn try_from(r: MealOptionRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: Some(r.id),
            name: r.name,
            meal_type: r.meal_type.parse()?,
            description: r.description,
            calories: r.calories,
            protein: r.protein,
            carbs: r.carbs,
            fat: r.fat,
            items: r.items.0,
            is_active: r.is_active,
            patient_id: r.patient_id,
            created_at: Some(r.created_at),
            updated_at: Some(r.updated_at),
        })
    }
}

#[derive(Debug, FromRow)]
struct LinkedOptionRow {
    diet_plan_id: i64,
    #[sqlx(flatten)]
    option: MealOptionRow,
}

#[derive(Debug, FromRow)]
struct DietPlanRow {
    id: i64,
    nutritionist_id: i64,
    patient_id: i64,
    date: Date,
    meal_type: String,
    notes: Option<String>,
    completed: bool,
}

#[derive(Debug, FromRow)]
struct ChoiceRow {
    id: i64,
    patient_id: i64,
    date: Date,
    meal_type: String,
    meal_option_id: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct UpsertedChoiceRow {
    #[sqlx(flatten)]
    choice: ChoiceRow,
    inserted: bool,
}

#[derive(Debug, FromRow)]
struct PatientRow {
    id: i64,
    nutritionist_id: i64,
    name: String,
    age: Option<i32>,
    email: Option<String>,
    phone: Option<String>,
    goal: Option<String>,
    status: String,
    updated_at: OffsetDateTime,
}

impl TryFrom<PatientRow> for Patient {
    type Error = anyhow::Error;

    fn try_from(r: PatientRow) -> anyhow::Result<Self> {
        let status = PatientStatus::parse(&r.status)
            .with_context(|| format!("patient {} has unknown status {:?}", r.id, r.status))?;
        Ok(Self {
            id: r.id,
            nutritionist_id: r.nutritionist_id,
            name: r.name,
            age: r.age,
            email: r.email,
            phone: r.phone,
            goal: r.goal,
            status,
            updated_at: Some(r.updated_at),
        })
    }
}

impl ChoiceRow {
    fn into_choice(self, options: &HashMap<i64, MealOption>) -> DailyMealChoice {
        DailyMealChoice {
            id: Some(self.id),
            patient_id: self.patient_id,
            date: format_date(self.date),
            meal_type: self.meal_type,
            meal_option: options.get(&self.meal_option_id).cloned(),
            meal_option_id: self.meal_option_id,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        }
    }
}

/// Writes the ordered option list of a plan, replacing any previous one.
async fn link_options(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    diet_plan_id: i64,
    option_ids: &[i64],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM diet_plan_meal_options WHERE diet_plan_id = $1")
        .bind(diet_plan_id)
        .execute(&mut **tx)
        .await?;
    for (position, option_id) in option_ids.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO diet_plan_meal_options (diet_plan_id, meal_option_id, position)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(diet_plan_id)
        .bind(option_id)
        .bind(position as i32)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Postgres-backed [`DietStore`]; schema lives in `./migrations`.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }

    async fn options_by_ids(&self, ids: &[i64]) -> anyhow::Result<HashMap<i64, MealOption>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, MealOptionRow>(&format!(
            "SELECT {MEAL_OPTION_COLUMNS} FROM meal_options WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter()
            .map(|r| Ok((r.id, MealOption::try_from(r)?)))
            .collect()
    }

    async fn attach_options(&self, plans: Vec<DietPlanRow>) -> anyhow::Result<Vec<DietPlanEntry>> {
        let ids: Vec<i64> = plans.iter().map(|p| p.id).collect();
        let mut linked: HashMap<i64, Vec<MealOption>> = HashMap::new();
        if !ids.is_empty() {
            let rows = sqlx::query_as::<_, LinkedOptionRow>(
                r#"
                SELECT l.diet_plan_id, o.id, o.patient_id, o.name, o.meal_type, o.description,
                       o.calories, o.protein, o.carbs, o.fat, o.items, o.is_active,
                       o.created_at, o.updated_at
                FROM diet_plan_meal_options l
                JOIN meal_options o ON o.id = l.meal_option_id
                WHERE l.diet_plan_id = ANY($1)
                ORDER BY l.diet_plan_id, l.position
                "#,
            )
            .bind(&ids)
            .fetch_all(&self.db)
            .await?;
            for row in rows {
                linked
                    .entry(row.diet_plan_id)
                    .or_default()
                    .push(MealOption::try_from(row.option)?);
            }
        }

        Ok(plans
            .into_iter()
            .map(|p| DietPlanEntry {
                meal_options: linked.remove(&p.id).unwrap_or_default(),
                id: Some(p.id),
                patient_id: p.patient_id,
                nutritionist_id: Some(p.nutritionist_id),
                date: format_date(p.date),
                meal_type: p.meal_type,
                notes: p.notes,
                completed: p.completed,
            })
            .collect())
    }

    async fn embed_options(&self, rows: Vec<ChoiceRow>) -> anyhow::Result<Vec<DailyMealChoice>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.meal_option_id).collect();
        let options = self.options_by_ids(&ids).await?;
        Ok(rows.into_iter().map(|r| r.into_choice(&options)).collect())
    }

    async fn embed_option(&self, row: Option<ChoiceRow>) -> anyhow::Result<Option<DailyMealChoice>> {
        match row {
            Some(row) => Ok(self.embed_options(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DietStore for PgStore {
    async fn list_meal_options(&self, filter: MealOptionFilter) -> anyhow::Result<Vec<MealOption>> {
        let rows = sqlx::query_as::<_, MealOptionRow>(&format!(
            r#"
            SELECT {MEAL_OPTION_COLUMNS}
            FROM meal_options
            WHERE ($1::BIGINT IS NULL OR patient_id = $1)
              AND ($2::TEXT IS NULL OR meal_type = $2)
            ORDER BY name, id
            "#
        ))
        .bind(filter.patient_id)
        .bind(filter.meal_type.map(MealType::label))
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(MealOption::try_from).collect()
    }

    async fn get_meal_option(&self, id: i64) -> anyhow::Result<Option<MealOption>> {
        let row = sqlx::query_as::<_, MealOptionRow>(&format!(
            "SELECT {MEAL_OPTION_COLUMNS} FROM meal_options WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(MealOption::try_from).transpose()
    }

    async fn create_meal_option(&self, new: NewMealOption) -> anyhow::Result<MealOption> {
        let row = sqlx::query_as::<_, MealOptionRow>(&format!(
            r#"
            INSERT INTO meal_options
                (patient_id, name, meal_type, description, calories, protein, carbs, fat, items)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {MEAL_OPTION_COLUMNS}
            "#
        ))
        .bind(new.patient_id)
        .bind(&new.name)
        .bind(new.meal_type.label())
        .bind(&new.description)
        .bind(new.calories)
        .bind(new.protein)
        .bind(new.carbs)
        .bind(new.fat)
        .bind(Json(&new.items))
        .fetch_one(&self.db)
        .await?;
        MealOption::try_from(row)
    }

    async fn update_meal_option(
        &self,
        id: i64,
        changes: MealOptionChanges,
    ) -> anyhow::Result<Option<MealOption>> {
        let row = sqlx::query_as::<_, MealOptionRow>(&format!(
            r#"
            UPDATE meal_options
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                calories = COALESCE($4, calories),
                protein = COALESCE($5, protein),
                carbs = COALESCE($6, carbs),
                fat = COALESCE($7, fat),
                items = COALESCE($8, items),
                is_active = COALESCE($9, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING {MEAL_OPTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.calories)
        .bind(changes.protein)
        .bind(changes.carbs)
        .bind(changes.fat)
        .bind(changes.items.as_ref().map(Json))
        .bind(changes.is_active)
        .fetch_optional(&self.db)
        .await?;
        row.map(MealOption::try_from).transpose()
    }

    async fn delete_meal_option(&self, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM meal_options WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn diet_plans_for_patient(
        &self,
        patient_id: i64,
        range: Option<DateRange>,
    ) -> anyhow::Result<Vec<DietPlanEntry>> {
        let rows = sqlx::query_as::<_, DietPlanRow>(&format!(
            r#"
            SELECT {DIET_PLAN_COLUMNS}
            FROM diet_plans
            WHERE patient_id = $1
              AND ($2::DATE IS NULL OR date >= $2)
              AND ($3::DATE IS NULL OR date <= $3)
            ORDER BY date, id
            "#
        ))
        .bind(patient_id)
        .bind(range.map(|r| r.from))
        .bind(range.map(|r| r.to))
        .fetch_all(&self.db)
        .await?;
        self.attach_options(rows).await
    }

    async fn get_diet_plan(&self, id: i64) -> anyhow::Result<Option<DietPlanEntry>> {
        let row = sqlx::query_as::<_, DietPlanRow>(&format!(
            "SELECT {DIET_PLAN_COLUMNS} FROM diet_plans WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(self.attach_options(row.into_iter().collect()).await?.pop())
    }

    async fn create_diet_plan(&self, new: NewDietPlan) -> anyhow::Result<DietPlanEntry> {
        let mut tx = self.db.begin().await?;
        let row = sqlx::query_as::<_, DietPlanRow>(&format!(
            r#"
            INSERT INTO diet_plans (nutritionist_id, patient_id, date, meal_type, notes, completed)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {DIET_PLAN_COLUMNS}
            "#
        ))
        .bind(new.nutritionist_id)
        .bind(new.patient_id)
        .bind(new.date)
        .bind(new.meal_type.label())
        .bind(&new.notes)
        .bind(new.completed)
        .fetch_one(&mut *tx)
        .await?;

        link_options(&mut tx, row.id, &new.meal_option_ids).await?;
        tx.commit().await?;

        self.attach_options(vec![row])
            .await?
            .pop()
            .context("diet plan vanished after insert")
    }

    async fn update_diet_plan(
        &self,
        id: i64,
        changes: DietPlanChanges,
    ) -> anyhow::Result<Option<DietPlanEntry>> {
        let mut tx = self.db.begin().await?;
        let row = sqlx::query_as::<_, DietPlanRow>(&format!(
            r#"
            UPDATE diet_plans
            SET date = COALESCE($2, date),
                meal_type = COALESCE($3, meal_type),
                notes = COALESCE($4, notes),
                completed = COALESCE($5, completed),
                updated_at = now()
            WHERE id = $1
            RETURNING {DIET_PLAN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.date)
        .bind(changes.meal_type.map(MealType::label))
        .bind(&changes.notes)
        .bind(changes.completed)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        if let Some(option_ids) = &changes.meal_option_ids {
            link_options(&mut tx, row.id, option_ids).await?;
        }
        tx.commit().await?;
        Ok(self.attach_options(vec![row]).await?.pop())
    }

    async fn delete_diet_plan(&self, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM diet_plans WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn daily_choices_for_patient(
        &self,
        patient_id: i64,
        range: Option<DateRange>,
    ) -> anyhow::Result<Vec<DailyMealChoice>> {
        let rows = sqlx::query_as::<_, ChoiceRow>(&format!(
            r#"
            SELECT {CHOICE_COLUMNS}
            FROM daily_meal_choices
            WHERE patient_id = $1
              AND ($2::DATE IS NULL OR date >= $2)
              AND ($3::DATE IS NULL OR date <= $3)
            ORDER BY date, id
            "#
        ))
        .bind(patient_id)
        .bind(range.map(|r| r.from))
        .bind(range.map(|r| r.to))
        .fetch_all(&self.db)
        .await?;
        self.embed_options(rows).await
    }

    async fn get_daily_choice(&self, id: i64) -> anyhow::Result<Option<DailyMealChoice>> {
        let row = sqlx::query_as::<_, ChoiceRow>(&format!(
            "SELECT {CHOICE_COLUMNS} FROM daily_meal_choices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        self.embed_option(row).await
    }

    async fn record_choice(
        &self,
        patient_id: i64,
        date: Date,
        meal_type: MealType,
        meal_option_id: i64,
    ) -> anyhow::Result<(DailyMealChoice, Recorded)> {
        // xmax is zero only for a freshly inserted tuple.
        let row = sqlx::query_as::<_, UpsertedChoiceRow>(&format!(
            r#"
            INSERT INTO daily_meal_choices (patient_id, date, meal_type, meal_option_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (patient_id, date, meal_type)
            DO UPDATE SET meal_option_id = EXCLUDED.meal_option_id, updated_at = now()
            RETURNING {CHOICE_COLUMNS}, (xmax = 0) AS inserted
            "#
        ))
        .bind(patient_id)
        .bind(date)
        .bind(meal_type.label())
        .bind(meal_option_id)
        .fetch_one(&self.db)
        .await?;
        let recorded = if row.inserted {
            Recorded::Created
        } else {
            Recorded::Updated
        };
        let choice = self
            .embed_option(Some(row.choice))
            .await?
            .context("daily choice vanished after upsert")?;
        Ok((choice, recorded))
    }

    async fn update_choice(
        &self,
        id: i64,
        meal_option_id: i64,
    ) -> anyhow::Result<Option<DailyMealChoice>> {
        let row = sqlx::query_as::<_, ChoiceRow>(&format!(
            r#"
            UPDATE daily_meal_choices
            SET meal_option_id = $2, updated_at = now()
            WHERE id = $1
            RETURNING {CHOICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(meal_option_id)
        .fetch_optional(&self.db)
        .await?;
        self.embed_option(row).await
    }

    async fn delete_choice(&self, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM daily_meal_choices WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_patients(&self, nutritionist_id: Option<i64>) -> anyhow::Result<Vec<Patient>> {
        let rows = sqlx::query_as::<_, PatientRow>(&format!(
            r#"
            SELECT {PATIENT_COLUMNS}
            FROM patients
            WHERE ($1::BIGINT IS NULL OR nutritionist_id = $1)
            ORDER BY name, id
            "#
        ))
        .bind(nutritionist_id)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(Patient::try_from).collect()
    }

    async fn get_patient(&self, id: i64) -> anyhow::Result<Option<Patient>> {
        let row = sqlx::query_as::<_, PatientRow>(&format!(
            "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(Patient::try_from).transpose()
    }

    async fn create_patient(&self, new: NewPatient) -> anyhow::Result<Option<Patient>> {
        let row = sqlx::query_as::<_, PatientRow>(&format!(
            r#"
            INSERT INTO patients (id, nutritionist_id, name, age, email, phone, goal, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            RETURNING {PATIENT_COLUMNS}
            "#
        ))
        .bind(new.id)
        .bind(new.nutritionist_id)
        .bind(&new.name)
        .bind(new.age)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(&new.goal)
        .bind(PatientStatus::Active.as_str())
        .fetch_optional(&self.db)
        .await?;
        row.map(Patient::try_from).transpose()
    }
}
