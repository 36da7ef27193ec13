//! User-facing notifications raised by mutations.

use crate::error::BackendError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    Success,
    Failure,
}

/// A short message for the presentation layer to show as a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Failure,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.kind == NotificationKind::Failure
    }

    pub fn entry_deleted() -> Self {
        Self::success("Entry Deleted", "The entry was successfully deleted.")
    }

    pub fn entry_delete_failed() -> Self {
        Self::failure("Delete Failed", "Failed to delete the entry. Please try again.")
    }

    /// `filter_reset` is set when the deleted category was the active filter.
    pub fn category_deleted(filter_reset: bool) -> Self {
        let description = if filter_reset {
            "Category filter has been reset."
        } else {
            "The category was successfully deleted."
        };
        Self::success("Category Deleted", description)
    }

    pub fn category_delete_failed() -> Self {
        Self::failure(
            "Delete Failed",
            "Failed to delete the category. Please try again.",
        )
    }

    pub fn category_renamed() -> Self {
        Self::success("Category Renamed", "The category was successfully renamed.")
    }

    pub fn rename_failed(error: &BackendError) -> Self {
        Self::failure("Rename Failed", error.message.clone())
    }

    pub fn invalid_name() -> Self {
        Self::failure("Invalid Name", "Category name cannot be empty.")
    }
}
