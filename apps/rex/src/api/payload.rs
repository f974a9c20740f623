//! JSON request and response bodies of the HTTP API.
//!
//! Field names follow the WordPress REST conventions the editor already
//! speaks (`post_title`, `tax_input`, ...).

use crate::error::AppError;
use rex_core::primitives::ORIGINAL_META_KEY;
use rex_core::{ContentItem, ContentPatch, PostId, PostStatus, PostType, SaveRequest, TermId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// REQUESTS
// =============================================================================

/// Body of `POST /fork`.
#[derive(Debug, Clone, Deserialize)]
pub struct ForkBody {
    pub source_id: u64,
    #[serde(default)]
    pub status: Option<String>,
}

impl ForkBody {
    /// Requested status of the new item; defaults to draft.
    pub fn target_status(&self) -> Result<PostStatus, AppError> {
        parse_status(self.status.as_deref().unwrap_or("draft"))
    }
}

/// Body of `POST /save`.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveBody {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub post_type: Option<String>,
    #[serde(default)]
    pub data: SaveData,
}

/// The `data` object of a Save.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveData {
    #[serde(default)]
    pub post_title: Option<String>,
    #[serde(default)]
    pub post_content: Option<String>,
    #[serde(default)]
    pub post_excerpt: Option<String>,
    #[serde(default)]
    pub post_status: Option<String>,
    #[serde(default)]
    pub post_name: Option<String>,
    #[serde(default)]
    pub meta: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub tax_input: BTreeMap<String, Vec<u64>>,
    #[serde(default)]
    pub expected_modified_gmt: Option<String>,
}

impl SaveData {
    /// Convert into the engine's patch, validating the status.
    pub fn into_patch(self) -> Result<(ContentPatch, Option<String>), AppError> {
        let mut patch = ContentPatch::new();
        patch.title = self.post_title;
        patch.content = self.post_content;
        patch.excerpt = self.post_excerpt;
        patch.slug = self.post_name;
        patch.status = self.post_status.as_deref().map(parse_status).transpose()?;
        patch.meta = self
            .meta
            .into_iter()
            .map(|(key, value)| (key, meta_string(value)))
            .collect();
        patch.terms = self
            .tax_input
            .into_iter()
            .map(|(taxonomy, ids)| (taxonomy, ids.into_iter().map(TermId).collect()))
            .collect();
        Ok((patch, self.expected_modified_gmt))
    }
}

impl SaveBody {
    pub fn into_request(self) -> Result<SaveRequest, AppError> {
        let post_type = match self.post_type.as_deref() {
            Some(name) => name.parse::<PostType>()?,
            None => PostType::post(),
        };
        let (patch, expected_modified_gmt) = self.data.into_patch()?;
        Ok(SaveRequest {
            id: self.id.map(PostId),
            post_type,
            patch,
            expected_modified_gmt,
        })
    }
}

/// Body of `POST /publish`.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishBody {
    pub staging_id: u64,
}

/// Query of `DELETE /posts/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub force: bool,
}

fn parse_status(name: &str) -> Result<PostStatus, AppError> {
    Ok(name.parse::<PostStatus>()?)
}

/// Meta values are stored as strings; scalars are rendered, structures kept as JSON.
fn meta_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

/// A content item as served by `GET /posts/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    pub id: PostId,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub status: PostStatus,
    pub author: u64,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub slug: String,
    pub modified_gmt: String,
    pub terms: BTreeMap<String, Vec<u64>>,
    pub meta: BTreeMap<String, String>,
    pub original_post_id: Option<PostId>,
}

impl From<&ContentItem> for PostView {
    fn from(item: &ContentItem) -> Self {
        let mut meta = item.meta.clone();
        if let Some(original) = item.original {
            meta.insert(ORIGINAL_META_KEY.to_string(), original.to_string());
        }
        Self {
            id: item.id,
            post_type: item.post_type.clone(),
            status: item.status,
            author: item.author.0,
            title: item.title.clone(),
            content: item.content.clone(),
            excerpt: item.excerpt.clone(),
            slug: item.slug.clone(),
            modified_gmt: item.modified_gmt.to_string(),
            terms: item
                .terms
                .iter()
                .map(|(taxonomy, ids)| (taxonomy.clone(), ids.iter().map(|t| t.0).collect()))
                .collect(),
            meta,
            original_post_id: item.original,
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn save_body_converts_to_request() -> Result<(), AppError> {
        let body: SaveBody = serde_json::from_value(json!({
            "id": 11,
            "data": {
                "post_title": "v2",
                "post_status": "pending",
                "meta": {"rating": 5, "featured": true, "note": null, "subtitle": "s", "list": [1, 2]},
                "tax_input": {"category": [3, 1]},
                "expected_modified_gmt": "00000000000000000004"
            }
        }))?;
        let request = body.into_request()?;

        assert_eq!(request.id, Some(PostId(11)));
        assert_eq!(request.post_type, PostType::post());
        assert_eq!(request.patch.title.as_deref(), Some("v2"));
        assert_eq!(request.patch.status, Some(PostStatus::Pending));
        assert_eq!(request.patch.meta["rating"], "5");
        assert_eq!(request.patch.meta["featured"], "true");
        assert_eq!(request.patch.meta["note"], "");
        assert_eq!(request.patch.meta["subtitle"], "s");
        assert_eq!(request.patch.meta["list"], "[1,2]");
        assert_eq!(request.patch.terms["category"].len(), 2);
        assert_eq!(
            request.expected_modified_gmt.as_deref(),
            Some("00000000000000000004")
        );
        Ok(())
    }

    #[test]
    fn unknown_status_is_invalid_input() -> Result<(), AppError> {
        let body: SaveBody = serde_json::from_value(json!({"data": {"post_status": "live"}}))?;
        let err = body.into_request().err();
        assert_eq!(err.map(|e| e.code()), Some("invalid_input"));

        let fork: ForkBody = serde_json::from_value(json!({"source_id": 1, "status": "nope"}))?;
        assert!(fork.target_status().is_err());
        Ok(())
    }

    #[test]
    fn fork_status_defaults_to_draft() -> Result<(), AppError> {
        let fork: ForkBody = serde_json::from_value(json!({"source_id": 1}))?;
        assert_eq!(fork.target_status()?, PostStatus::Draft);
        Ok(())
    }

    #[test]
    fn post_view_exposes_original_link_as_meta() {
        let mut item = ContentItem::new(PostType::page(), PostStatus::Draft, rex_core::UserId(3));
        item.id = PostId(11);
        item.original = Some(PostId(10));
        let view = PostView::from(&item);
        assert_eq!(view.meta.get(ORIGINAL_META_KEY).map(String::as_str), Some("10"));
        assert_eq!(view.original_post_id, Some(PostId(10)));

        let json = serde_json::to_value(&view).unwrap_or_default();
        assert_eq!(json["type"], "page");
        assert_eq!(json["id"], 11);
    }
}
