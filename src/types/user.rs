//! User profile as reported by the backend, or a local fallback when it is unreachable.

use crate::config::DEFAULT_MODEL;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileSource {
    #[default]
    Backend,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub selected_category: Option<String>,
    #[serde(default = "default_model")]
    pub model_preference: String,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            selected_category: None,
            model_preference: default_model(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub preferences: UserPreferences,
    #[serde(default)]
    pub source: ProfileSource,
}

fn default_name() -> String {
    "Guest".to_string()
}

impl UserProfile {
    /// Local profile used while the backend is unreachable. Reuses `known_id` when
    /// one was persisted earlier so the conversation history stays attached.
    pub fn fallback(known_id: Option<String>) -> Self {
        Self {
            id: known_id.unwrap_or_else(|| format!("guest-{}", Uuid::new_v4().simple())),
            name: default_name(),
            preferences: UserPreferences::default(),
            source: ProfileSource::Fallback,
        }
    }

    /// `false` when this profile was produced locally rather than by the backend.
    pub fn is_online(&self) -> bool {
        self.source != ProfileSource::Fallback
    }

    pub fn with_selected_category(&self, category: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.preferences.selected_category = Some(category.into());
        next
    }

    pub fn without_selected_category(&self) -> Self {
        let mut next = self.clone();
        next.preferences.selected_category = None;
        next
    }

    pub fn with_model_preference(&self, model: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.preferences.model_preference = model.into();
        next
    }
}
