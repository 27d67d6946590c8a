use tracing::info;

use super::dto::RecordChoiceRequest;
use crate::error::ApiError;
use crate::meal_options::services::require_slot_option;
use crate::schedule::calendar::parse_date;
use crate::schedule::DailyMealChoice;
use crate::session::Session;
use crate::store::{DietStore, Recorded};

/// Create-or-update of the choice for one (patient, date, meal type).
pub async fn record_choice(
    store: &dyn DietStore,
    session: &Session,
    req: RecordChoiceRequest,
) -> Result<(DailyMealChoice, Recorded), ApiError> {
    let patient_id = session.target_patient(req.patient_id)?;
    let date = parse_date(&req.date).ok_or_else(|| {
        ApiError::BadRequest(format!("invalid date {:?}, expected YYYY-MM-DD", req.date))
    })?;
    require_slot_option(store, req.meal_option_id, patient_id, req.meal_type).await?;

    let (choice, recorded) = store
        .record_choice(patient_id, date, req.meal_type, req.meal_option_id)
        .await?;
    info!(
        id = ?choice.id,
        patient_id,
        date = %choice.date,
        meal_type = %req.meal_type,
        meal_option_id = req.meal_option_id,
        ?recorded,
        "daily meal choice recorded"
    );
    Ok((choice, recorded))
}

/// Points an existing choice at another option of the same slot.
pub async fn update_choice(
    store: &dyn DietStore,
    session: &Session,
    id: i64,
    meal_option_id: i64,
) -> Result<DailyMealChoice, ApiError> {
    let existing = store
        .get_daily_choice(id)
        .await?
        .ok_or(ApiError::NotFound("daily meal choice"))?;
    session.ensure_patient_access(existing.patient_id)?;
    let meal_type = existing.meal_type.parse().map_err(|e| {
        ApiError::Internal(anyhow::anyhow!("stored choice {id} is unusable: {e}"))
    })?;
    require_slot_option(store, meal_option_id, existing.patient_id, meal_type).await?;
    let updated = store
        .update_choice(id, meal_option_id)
        .await?
        .ok_or(ApiError::NotFound("daily meal choice"))?;
    info!(id, meal_option_id, "daily meal choice updated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::MealType;
    use crate::session::Role;
    use crate::store::{MemoryStore, NewMealOption};

    async fn option(store: &MemoryStore, patient_id: i64, name: &str, meal_type: MealType) -> i64 {
        store
            .create_meal_option(NewMealOption {
                patient_id,
                name: name.into(),
                meal_type,
                description: None,
                calories: None,
                protein: None,
                carbs: None,
                fat: None,
                items: vec![],
            })
            .await
            .unwrap()
            .id
            .unwrap()
    }

    fn patient(id: i64) -> Session {
        Session {
            user_id: id,
            role: Role::Patient,
        }
    }

    fn lunch_on(date: &str, meal_option_id: i64) -> RecordChoiceRequest {
        RecordChoiceRequest {
            patient_id: None,
            date: date.into(),
            meal_type: MealType::Lunch,
            meal_option_id,
        }
    }

    #[tokio::test]
    async fn second_record_for_the_same_slot_updates_in_place() {
        let store = MemoryStore::new();
        let salmon = option(&store, 12, "Salmão", MealType::Lunch).await;
        let chicken = option(&store, 12, "Frango", MealType::Lunch).await;

        let (first, how) = record_choice(&store, &patient(12), lunch_on("2025-10-06", salmon))
            .await
            .unwrap();
        assert_eq!(how, Recorded::Created);
        let (second, how) = record_choice(&store, &patient(12), lunch_on("2025-10-06", chicken))
            .await
            .unwrap();
        assert_eq!(how, Recorded::Updated);
        assert_eq!(first.id, second.id);
        assert_eq!(second.meal_option_id, chicken);
        assert_eq!(
            store
                .daily_choices_for_patient(12, None)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn nutritionist_must_name_the_patient() {
        let store = MemoryStore::new();
        let salmon = option(&store, 12, "Salmão", MealType::Lunch).await;
        let doc = Session {
            user_id: 1,
            role: Role::Nutritionist,
        };
        let err = record_choice(&store, &doc, lunch_on("2025-10-06", salmon))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let mut req = lunch_on("2025-10-06", salmon);
        req.patient_id = Some(12);
        let (choice, _) = record_choice(&store, &doc, req).await.unwrap();
        assert_eq!(choice.patient_id, 12);
    }

    #[tokio::test]
    async fn patient_cannot_record_for_someone_else() {
        let store = MemoryStore::new();
        let salmon = option(&store, 12, "Salmão", MealType::Lunch).await;
        let mut req = lunch_on("2025-10-06", salmon);
        req.patient_id = Some(12);
        let err = record_choice(&store, &patient(13), req).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn update_keeps_the_slot_and_checks_the_option_type() {
        let store = MemoryStore::new();
        let salmon = option(&store, 12, "Salmão", MealType::Lunch).await;
        let chicken = option(&store, 12, "Frango", MealType::Lunch).await;
        let soup = option(&store, 12, "Sopa", MealType::Dinner).await;
        let (choice, _) = record_choice(&store, &patient(12), lunch_on("2025-10-06", salmon))
            .await
            .unwrap();
        let id = choice.id.unwrap();

        let err = update_choice(&store, &patient(12), id, soup).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let updated = update_choice(&store, &patient(12), id, chicken).await.unwrap();
        assert_eq!(updated.meal_option_id, chicken);
        assert_eq!(updated.date, "2025-10-06");

        let missing = update_choice(&store, &patient(12), id + 1000, chicken).await.unwrap_err();
        assert!(matches!(missing, ApiError::NotFound(_)));
    }
}
