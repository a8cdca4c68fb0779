use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ==============================================================================
// PROFILE SCHEMA
// ==============================================================================

/// Named fields of the intake schema. Anything else lands in `extra`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileField {
    FirstName,
    LastName,
    Email,
    Phone,
    Summary,
}

impl ProfileField {
    pub const ALL: [ProfileField; 5] = [
        ProfileField::FirstName,
        ProfileField::LastName,
        ProfileField::Email,
        ProfileField::Phone,
        ProfileField::Summary,
    ];

    /// Fields that must all be known before a patient is ready to schedule.
    pub const REQUIRED: [ProfileField; 5] = [
        ProfileField::FirstName,
        ProfileField::LastName,
        ProfileField::Email,
        ProfileField::Phone,
        ProfileField::Summary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::FirstName => "firstName",
            ProfileField::LastName => "lastName",
            ProfileField::Email => "email",
            ProfileField::Phone => "phone",
            ProfileField::Summary => "summary",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==============================================================================
// CORE PROFILE MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(flatten, default)]
    pub extra: BTreeMap<String, String>,
}

impl PatientProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Value of a schema field, with blank values reported as unset.
    pub fn value(&self, field: ProfileField) -> Option<&str> {
        let raw = match field {
            ProfileField::FirstName => &self.first_name,
            ProfileField::LastName => &self.last_name,
            ProfileField::Email => &self.email,
            ProfileField::Phone => &self.phone,
            ProfileField::Summary => &self.summary,
        };

        raw.as_deref().filter(|value| !value.trim().is_empty())
    }

    pub fn has_required_fields(&self) -> bool {
        ProfileField::REQUIRED
            .iter()
            .all(|field| self.value(*field).is_some())
    }

    pub fn full_name(&self) -> Option<String> {
        let first = self.value(ProfileField::FirstName).unwrap_or_default();
        let last = self.value(ProfileField::LastName).unwrap_or_default();
        let name = format!("{} {}", first, last).trim().to_string();

        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    /// Every known field except the id, schema fields first.
    pub fn known_fields(&self) -> Vec<(String, String)> {
        ProfileField::ALL
            .iter()
            .filter_map(|field| {
                self.value(*field)
                    .map(|value| (field.as_str().to_string(), value.to_string()))
            })
            .chain(
                self.extra
                    .iter()
                    .filter(|(_, value)| !value.trim().is_empty())
                    .map(|(key, value)| (key.clone(), value.clone())),
            )
            .collect()
    }
}

/// Partial profile update as reported by the caller or the intake agent.
///
/// Scalars of any JSON type are accepted for the schema fields and stored as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(flatten, default)]
    pub extra: BTreeMap<String, Value>,
}

impl ProfileUpdate {
    pub fn with(mut self, field: ProfileField, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match field {
            ProfileField::FirstName => self.first_name = value,
            ProfileField::LastName => self.last_name = value,
            ProfileField::Email => self.email = value,
            ProfileField::Phone => self.phone = value,
            ProfileField::Summary => self.summary = value,
        }
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.phone,
            &self.summary,
        ]
        .iter()
        .all(|value| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            && self.extra.values().all(|value| value_as_text(value).is_none())
    }
}

/// Text form of a JSON value, or `None` when it counts as unset.
pub fn value_as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_text))
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatientError {
    #[error("Patient id is required")]
    MissingId,
}
