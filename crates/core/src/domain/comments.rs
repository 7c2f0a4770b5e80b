use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::types::comment_id::CommentId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub parent_id: Option<CommentId>,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Untrusted `{ text, parentId }` as handed over by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentInput {
    pub text: String,
    pub parent_id: Option<String>,
}

impl CommentInput {
    pub fn new(text: impl Into<String>, parent_id: Option<&str>) -> Self {
        Self {
            text: text.into(),
            parent_id: parent_id.map(str::to_string),
        }
    }

    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let Some(object) = value.as_object() else {
            return Err(ValidationError::InvalidField {
                field: "comment",
                expected: "an object",
            });
        };
        let text = match object.get("text") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => return Err(ValidationError::EmptyText),
            Some(_) => {
                return Err(ValidationError::InvalidField {
                    field: "text",
                    expected: "a string",
                });
            }
        };
        let parent_id = match object.get("parentId") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Null) | None => None,
            Some(_) => {
                return Err(ValidationError::InvalidField {
                    field: "parentId",
                    expected: "a string id or null",
                });
            }
        };
        Ok(Self { text, parent_id })
    }

    /// Checks the input and stamps identity and creation time. Stops at the
    /// first violated rule.
    pub fn validate(self, now: DateTime<Utc>) -> Result<Comment, ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        let parent_id = self
            .parent_id
            .as_deref()
            .map(|raw| {
                CommentId::try_from(raw)
                    .map_err(|_| ValidationError::InvalidParentId(raw.to_string()))
            })
            .transpose()?;
        Ok(Comment {
            id: CommentId::generate(),
            text: self.text,
            parent_id,
            created_at: ceil_to_micros(now),
        })
    }
}

/// Storage keeps microseconds; rounding up keeps the stamp at or after `now`.
pub fn ceil_to_micros(now: DateTime<Utc>) -> DateTime<Utc> {
    let truncated = now.trunc_subsecs(6);
    if truncated < now {
        truncated + TimeDelta::microseconds(1)
    } else {
        truncated
    }
}
