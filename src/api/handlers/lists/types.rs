//! Request/response types for list, item, member, and message endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::handlers::auth::principal::Role;

pub const LIST_NAME_MAX: usize = 100;
pub const ITEM_NAME_MAX: usize = 200;
pub const MESSAGE_MAX: usize = 1_000;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateListRequest {
    pub name: String,
}

/// Explicit patch: absent fields stay untouched.
#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct UpdateListRequest {
    pub name: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ListResponse {
    pub id: String,
    pub name: String,
    pub creator_id: String,
    pub role: Role,
    pub member_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MemberResponse {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub created_at: String,
}

/// Purchase state of a list item.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemStatus {
    Todo,
    Purchased,
}

impl ItemStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::Purchased => "PURCHASED",
        }
    }

    #[must_use]
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "TODO" => Some(Self::Todo),
            "PURCHASED" => Some(Self::Purchased),
            _ => None,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ItemResponse {
    pub id: String,
    pub name: String,
    pub quantity: i32,
    pub status: ItemStatus,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateItemRequest {
    pub name: String,
    pub quantity: Option<i32>,
    pub notes: Option<String>,
}

/// Explicit patch: absent fields stay untouched. `notes` tracks presence
/// separately from nullability, so an explicit JSON `null` clears the column.
#[derive(ToSchema, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub quantity: Option<i32>,
    pub status: Option<ItemStatus>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

/// Member suggestion for @-mention autocomplete; `id` is the user id.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MentionMemberResponse {
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MentionItemResponse {
    pub id: String,
    pub name: String,
    pub status: ItemStatus,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MentionsResponse {
    pub members: Vec<MentionMemberResponse>,
    pub items: Vec<MentionItemResponse>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub id: String,
    pub author_id: String,
    pub username: String,
    pub content: String,
    pub created_at: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct PostMessageRequest {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_status_round_trips_through_db_text() {
        for status in [ItemStatus::Todo, ItemStatus::Purchased] {
            assert_eq!(ItemStatus::from_db(status.as_str()), Some(status));
        }
        assert_eq!(ItemStatus::from_db("DONE"), None);
    }

    #[test]
    fn update_requests_reject_unknown_fields() {
        let list: Result<UpdateListRequest, _> = serde_json::from_str(r#"{"creator_id":"x"}"#);
        assert!(list.is_err());

        let item: Result<UpdateItemRequest, _> = serde_json::from_str(r#"{"checked":true}"#);
        assert!(item.is_err());
    }

    #[test]
    fn item_patch_distinguishes_null_notes_from_absent() {
        let patch: UpdateItemRequest = serde_json::from_str(r#"{"notes":null}"#).expect("json");
        assert_eq!(patch.notes, Some(None));

        let patch: UpdateItemRequest = serde_json::from_str(r#"{"name":"Milk"}"#).expect("json");
        assert_eq!(patch.notes, None);

        let patch: UpdateItemRequest =
            serde_json::from_str(r#"{"notes":"organic"}"#).expect("json");
        assert_eq!(patch.notes, Some(Some("organic".to_string())));
    }

    #[test]
    fn item_status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&ItemStatus::Purchased).expect("json"),
            "\"PURCHASED\""
        );
    }
}
