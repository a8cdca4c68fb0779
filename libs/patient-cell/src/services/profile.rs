use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{value_as_text, PatientError, PatientProfile, ProfileUpdate};

/// Storage capability for patient profiles, keyed by patient id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, patient_id: &str) -> Option<PatientProfile>;

    /// Create the profile on first reference, then merge `update` into it.
    async fn upsert(
        &self,
        patient_id: &str,
        update: &ProfileUpdate,
    ) -> Result<PatientProfile, PatientError>;

    async fn list(&self) -> Vec<PatientProfile>;
}

/// Merge an update into a profile field by field.
///
/// Only non-blank incoming values are written, so a known value is never erased.
/// Returns whether anything changed.
pub fn merge_profile(profile: &mut PatientProfile, update: &ProfileUpdate) -> bool {
    let mut changed = false;

    changed |= merge_field(&mut profile.first_name, &update.first_name);
    changed |= merge_field(&mut profile.last_name, &update.last_name);
    changed |= merge_field(&mut profile.email, &update.email);
    changed |= merge_field(&mut profile.phone, &update.phone);
    changed |= merge_field(&mut profile.summary, &update.summary);

    for (key, value) in &update.extra {
        // identity is immutable
        if key == "id" {
            continue;
        }

        if let Some(text) = value_as_text(value) {
            if profile.extra.get(key) != Some(&text) {
                profile.extra.insert(key.clone(), text);
                changed = true;
            }
        }
    }

    changed
}

fn merge_field(current: &mut Option<String>, incoming: &Option<String>) -> bool {
    match incoming.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => {
            if current.as_deref() == Some(value) {
                false
            } else {
                *current = Some(value.to_string());
                true
            }
        }
        _ => false,
    }
}

#[derive(Debug, Clone)]
struct StoredProfile {
    profile: PatientProfile,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, StoredProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, patient_id: &str) -> Option<PatientProfile> {
        let profiles = self.profiles.read().await;
        profiles.get(patient_id).map(|stored| stored.profile.clone())
    }

    async fn upsert(
        &self,
        patient_id: &str,
        update: &ProfileUpdate,
    ) -> Result<PatientProfile, PatientError> {
        let patient_id = patient_id.trim();
        if patient_id.is_empty() {
            return Err(PatientError::MissingId);
        }

        let now = Utc::now();
        let mut profiles = self.profiles.write().await;

        let stored = profiles.entry(patient_id.to_string()).or_insert_with(|| {
            debug!("Creating profile for patient {}", patient_id);
            StoredProfile {
                profile: PatientProfile::new(patient_id),
                created_at: now,
                updated_at: now,
            }
        });

        if merge_profile(&mut stored.profile, update) {
            stored.updated_at = now;
            debug!(
                "Updated profile for patient {} (created {}, updated {})",
                patient_id, stored.created_at, stored.updated_at
            );
        }

        Ok(stored.profile.clone())
    }

    async fn list(&self) -> Vec<PatientProfile> {
        let profiles = self.profiles.read().await;
        let mut all: Vec<PatientProfile> = profiles
            .values()
            .map(|stored| stored.profile.clone())
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileField;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_creates_profile_on_first_reference() {
        let store = InMemoryProfileStore::new();

        let profile = store
            .upsert("patient-1", &ProfileUpdate::default())
            .await
            .unwrap();

        assert_eq!(profile.id, "patient-1");
        assert_eq!(store.get("patient-1").await, Some(profile));
    }

    #[tokio::test]
    async fn test_blank_update_never_erases_known_value() {
        let store = InMemoryProfileStore::new();

        store
            .upsert(
                "patient-1",
                &ProfileUpdate::default().with(ProfileField::Email, "ada@example.com"),
            )
            .await
            .unwrap();
        let profile = store
            .upsert(
                "patient-1",
                &ProfileUpdate::default().with(ProfileField::Email, ""),
            )
            .await
            .unwrap();

        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_non_blank_update_overwrites() {
        let store = InMemoryProfileStore::new();

        store
            .upsert(
                "patient-1",
                &ProfileUpdate::default().with(ProfileField::Phone, "555-0100"),
            )
            .await
            .unwrap();
        let profile = store
            .upsert(
                "patient-1",
                &ProfileUpdate::default().with(ProfileField::Phone, " 555-0199 "),
            )
            .await
            .unwrap();

        assert_eq!(profile.phone.as_deref(), Some("555-0199"));
    }

    #[tokio::test]
    async fn test_extra_fields_are_forward_compatible() {
        let store = InMemoryProfileStore::new();

        let update = ProfileUpdate::default()
            .with_extra("insurer", "Acme")
            .with_extra("age", json!(42))
            .with_extra("id", "someone-else")
            .with_extra("notes", json!(null));
        let profile = store.upsert("patient-1", &update).await.unwrap();

        assert_eq!(profile.id, "patient-1");
        assert_eq!(profile.extra.get("insurer").map(String::as_str), Some("Acme"));
        assert_eq!(profile.extra.get("age").map(String::as_str), Some("42"));
        assert!(!profile.extra.contains_key("id"));
        assert!(!profile.extra.contains_key("notes"));
    }

    #[tokio::test]
    async fn test_missing_patient_id_is_rejected() {
        let store = InMemoryProfileStore::new();

        let result = store.upsert("  ", &ProfileUpdate::default()).await;

        assert_matches!(result, Err(PatientError::MissingId));
        assert!(store.list().await.is_empty());
    }

    #[test]
    fn test_reads_are_independent_copies() {
        let store = InMemoryProfileStore::new();

        tokio_test::block_on(async {
            store
                .upsert(
                    "patient-1",
                    &ProfileUpdate::default().with(ProfileField::FirstName, "Ada"),
                )
                .await
                .unwrap();

            let mut snapshot = store.get("patient-1").await.unwrap();
            snapshot.first_name = Some("Changed".to_string());

            let stored = store.get("patient-1").await.unwrap();
            assert_eq!(stored.first_name.as_deref(), Some("Ada"));
        });
    }

    #[test]
    fn test_merge_reports_changes() {
        let mut profile = PatientProfile::new("patient-1");

        assert!(merge_profile(
            &mut profile,
            &ProfileUpdate::default().with(ProfileField::Summary, "Back pain")
        ));
        assert!(!merge_profile(
            &mut profile,
            &ProfileUpdate::default().with(ProfileField::Summary, "Back pain")
        ));
        assert!(!merge_profile(&mut profile, &ProfileUpdate::default()));
    }
}
