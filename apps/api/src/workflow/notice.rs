use serde::Serialize;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeAction {
    Retry,
    ReconnectCredentials,
}

/// Dismissible, user-facing outcome of a failed operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub message: String,
    pub action: Option<NoticeAction>,
}

impl Notice {
    pub fn from_error(err: &AppError) -> Self {
        let action = match err {
            _ if err.is_credentials_problem() => Some(NoticeAction::ReconnectCredentials),
            AppError::TransientService(_) | AppError::Timeout | AppError::SchemaValidation(_) => {
                Some(NoticeAction::Retry)
            }
            _ => None,
        };
        Self {
            message: err.user_message(),
            action,
        }
    }

    pub fn retry(err: &AppError) -> Self {
        Self {
            message: err.user_message(),
            action: Some(NoticeAction::Retry),
        }
    }
}
