//! Document status machine and task roles.
//!
//! ```text
//! DRAFT ──start-editing──▶ EDITING ──complete-editing──▶ READY_FOR_REVIEW
//!   ▲                                                          │
//!   │ (start-editing from REJECTED)                   submit-for-review
//!   │                                                          ▼
//! REJECTED ◀──reject── REVIEWING ──sign──▶ SIGNING ──sign──▶ COMPLETED
//!     ▲                                       │
//!     └──────────────────reject───────────────┘
//! ```
//!
//! These checks are a client-side guard only; the backend re-validates every
//! transition.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Editing,
    ReadyForReview,
    Reviewing,
    Signing,
    Completed,
    Rejected,
}

impl DocumentStatus {
    /// Completed documents are frozen.
    pub fn is_final(self) -> bool {
        self == DocumentStatus::Completed
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocumentStatus::Draft => "DRAFT",
            DocumentStatus::Editing => "EDITING",
            DocumentStatus::ReadyForReview => "READY_FOR_REVIEW",
            DocumentStatus::Reviewing => "REVIEWING",
            DocumentStatus::Signing => "SIGNING",
            DocumentStatus::Completed => "COMPLETED",
            DocumentStatus::Rejected => "REJECTED",
        };
        f.write_str(name)
    }
}

/// Workflow endpoints under `POST /documents/:id/<slug>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowAction {
    StartEditing,
    CompleteEditing,
    SubmitForReview,
    Sign,
    Reject,
}

impl WorkflowAction {
    /// URL path segment for this action.
    pub fn slug(self) -> &'static str {
        match self {
            WorkflowAction::StartEditing => "start-editing",
            WorkflowAction::CompleteEditing => "complete-editing",
            WorkflowAction::SubmitForReview => "submit-for-review",
            WorkflowAction::Sign => "sign",
            WorkflowAction::Reject => "reject",
        }
    }

    /// Status reached by applying this action in `from`, if allowed.
    pub fn next_status(self, from: DocumentStatus) -> Option<DocumentStatus> {
        use DocumentStatus::*;
        match (self, from) {
            (WorkflowAction::StartEditing, Draft | Rejected) => Some(Editing),
            (WorkflowAction::CompleteEditing, Editing) => Some(ReadyForReview),
            (WorkflowAction::SubmitForReview, ReadyForReview) => Some(Reviewing),
            (WorkflowAction::Sign, Reviewing) => Some(Signing),
            (WorkflowAction::Sign, Signing) => Some(Completed),
            (WorkflowAction::Reject, Reviewing | Signing) => Some(Rejected),
            _ => None,
        }
    }

    /// Task role allowed to trigger this action in `from`.
    pub fn required_role(self, from: DocumentStatus) -> TaskRole {
        match (self, from) {
            (WorkflowAction::StartEditing | WorkflowAction::CompleteEditing, _) => TaskRole::Editor,
            (WorkflowAction::SubmitForReview, _) => TaskRole::Editor,
            (WorkflowAction::Sign | WorkflowAction::Reject, DocumentStatus::Reviewing) => {
                TaskRole::Reviewer
            }
            (WorkflowAction::Sign | WorkflowAction::Reject, _) => TaskRole::Signer,
        }
    }
}

/// Role a user holds on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskRole {
    Creator,
    Editor,
    Reviewer,
    Signer,
}

/// Assignment of a task role to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTask {
    pub role: TaskRole,
    pub assigned_user_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_user_name: Option<String>,
}

impl DocumentTask {
    pub fn new(role: TaskRole, email: impl Into<String>) -> Self {
        Self {
            role,
            assigned_user_email: email.into(),
            assigned_user_name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.assigned_user_name = Some(name.into());
        self
    }

    /// Display name, falling back to the e-mail.
    pub fn display_name(&self) -> &str {
        self.assigned_user_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.assigned_user_email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut status = DocumentStatus::Draft;
        for action in [
            WorkflowAction::StartEditing,
            WorkflowAction::CompleteEditing,
            WorkflowAction::SubmitForReview,
            WorkflowAction::Sign,
            WorkflowAction::Sign,
        ] {
            status = action.next_status(status).unwrap();
        }
        assert_eq!(status, DocumentStatus::Completed);
    }

    #[test]
    fn test_reject_and_restart() {
        let rejected = WorkflowAction::Reject
            .next_status(DocumentStatus::Reviewing)
            .unwrap();
        assert_eq!(rejected, DocumentStatus::Rejected);
        assert_eq!(
            WorkflowAction::StartEditing.next_status(rejected),
            Some(DocumentStatus::Editing)
        );
    }

    #[test]
    fn test_invalid_transitions() {
        assert_eq!(WorkflowAction::Sign.next_status(DocumentStatus::Draft), None);
        assert_eq!(WorkflowAction::Reject.next_status(DocumentStatus::Editing), None);
        assert_eq!(WorkflowAction::StartEditing.next_status(DocumentStatus::Completed), None);
        assert_eq!(WorkflowAction::Sign.next_status(DocumentStatus::Completed), None);
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&DocumentStatus::ReadyForReview).unwrap();
        assert_eq!(json, "\"READY_FOR_REVIEW\"");
        let status: DocumentStatus = serde_json::from_str("\"SIGNING\"").unwrap();
        assert_eq!(status, DocumentStatus::Signing);
        assert_eq!(DocumentStatus::ReadyForReview.to_string(), "READY_FOR_REVIEW");
    }

    #[test]
    fn test_action_slugs_match_serde() {
        for action in [
            WorkflowAction::StartEditing,
            WorkflowAction::CompleteEditing,
            WorkflowAction::SubmitForReview,
            WorkflowAction::Sign,
            WorkflowAction::Reject,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.slug()));
        }
    }

    #[test]
    fn test_required_roles() {
        assert_eq!(
            WorkflowAction::Sign.required_role(DocumentStatus::Reviewing),
            TaskRole::Reviewer
        );
        assert_eq!(
            WorkflowAction::Sign.required_role(DocumentStatus::Signing),
            TaskRole::Signer
        );
        assert_eq!(
            WorkflowAction::CompleteEditing.required_role(DocumentStatus::Editing),
            TaskRole::Editor
        );
    }

    #[test]
    fn test_task_display_name() {
        let task = DocumentTask::new(TaskRole::Signer, "park@example.com");
        assert_eq!(task.display_name(), "park@example.com");
        assert_eq!(task.named("박지민").display_name(), "박지민");
    }
}
