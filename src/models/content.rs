//! Content model matching the admin panel's content records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Category applied when a request leaves it out.
pub const DEFAULT_CATEGORY: &str = "General";

/// A stored content block, addressed by its slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub category: String,
    pub html_content: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Content {
    /// Build a new record from a validated draft.
    pub fn create(id: String, draft: ContentDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            slug: draft.slug,
            category: draft.category,
            html_content: draft.html_content,
            created_at: now,
            last_modified: now,
        }
    }

    /// Overwrite the editable fields. `id` and `created_at` never change.
    pub fn apply(&mut self, draft: ContentDraft, now: DateTime<Utc>) {
        self.title = draft.title;
        self.slug = draft.slug;
        self.category = draft.category;
        self.html_content = draft.html_content;
        self.last_modified = now.max(self.created_at);
    }
}

/// Request body for `POST /api/content` and `PUT /api/content/{slug}`.
///
/// Required fields default to empty so that missing fields surface as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveContentRequest {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub html_content: String,
}

impl SaveContentRequest {
    /// Identifier of the record to update, if the request carries one.
    pub fn target_id(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }

    /// Check required fields and produce a draft the store accepts.
    pub fn validate(self) -> Result<ContentDraft, AppError> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.slug.trim().is_empty() {
            missing.push("slug");
        }
        if self.html_content.trim().is_empty() {
            missing.push("htmlContent");
        }
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let slug = self.slug.trim().to_string();
        if !is_url_safe_slug(&slug) {
            return Err(AppError::Validation(format!(
                "Slug {:?} may only contain letters, digits, '-' and '_'",
                slug
            )));
        }

        let category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        Ok(ContentDraft {
            title: self.title,
            slug,
            category,
            html_content: self.html_content,
        })
    }
}

/// Validated editable fields of a content record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDraft {
    pub title: String,
    pub slug: String,
    pub category: String,
    pub html_content: String,
}

impl ContentDraft {
    pub fn new(title: &str, slug: &str, category: &str, html_content: &str) -> Self {
        Self {
            title: title.to_string(),
            slug: slug.to_string(),
            category: category.to_string(),
            html_content: html_content.to_string(),
        }
    }
}

/// Body of successful write responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl MessageResponse {
    pub fn new(message: &str, id: Option<String>) -> Self {
        Self {
            message: message.to_string(),
            id,
        }
    }
}

fn is_url_safe_slug(slug: &str) -> bool {
    slug.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> SaveContentRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_category_defaults_to_general() {
        let draft = request(json!({
            "title": "Test",
            "slug": "test-page",
            "htmlContent": "<p>hi</p>"
        }))
        .validate()
        .unwrap();
        assert_eq!(draft.category, DEFAULT_CATEGORY);

        let draft = request(json!({
            "title": "Test",
            "slug": "test-page",
            "category": "  ",
            "htmlContent": "<p>hi</p>"
        }))
        .validate()
        .unwrap();
        assert_eq!(draft.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_missing_fields_are_all_named() {
        let err = request(json!({ "title": "", "htmlContent": "<p>x</p>" }))
            .validate()
            .unwrap_err();
        match err {
            AppError::Validation(msg) => {
                assert_eq!(msg, "Missing required fields: title, slug");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_slug_must_be_url_safe() {
        let err = request(json!({
            "title": "T",
            "slug": "has space/and slash",
            "htmlContent": "<p>x</p>"
        }))
        .validate()
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_underscore_id_alias() {
        let req = request(json!({ "_id": "abc", "title": "T", "slug": "s", "htmlContent": "h" }));
        assert_eq!(req.target_id(), Some("abc"));

        let req = request(json!({ "id": "  ", "title": "T", "slug": "s", "htmlContent": "h" }));
        assert_eq!(req.target_id(), None);
    }

    #[test]
    fn test_apply_keeps_identity() {
        let created = Utc::now();
        let mut content = Content::create(
            "id-1".to_string(),
            ContentDraft::new("A", "a", "General", "<p>a</p>"),
            created,
        );
        let earlier = created - chrono::Duration::seconds(30);
        content.apply(ContentDraft::new("B", "b", "BSS", "<p>b</p>"), earlier);

        assert_eq!(content.id, "id-1");
        assert_eq!(content.created_at, created);
        assert_eq!(content.title, "B");
        assert!(content.last_modified >= content.created_at);
    }

    #[test]
    fn test_serializes_camel_case() {
        let content = Content::create(
            "id-1".to_string(),
            ContentDraft::new("A", "a", "General", "<p>a</p>"),
            Utc::now(),
        );
        let value = serde_json::to_value(&content).unwrap();
        assert!(value.get("htmlContent").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("lastModified").is_some());
    }
}
