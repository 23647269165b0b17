//! # Document Model
//!
//! Templates define where fields sit on the page images; documents reference
//! a template and own their copies of field values, signature slots and role
//! assignments.
//!
//! ```
//! use docflow::document::{Document, DocumentStatus, WorkflowAction};
//!
//! let json = r#"{
//!     "id": "doc-1",
//!     "title": "Purchase order",
//!     "templateId": "tpl-1",
//!     "status": "DRAFT",
//!     "data": {"coordinateFields": "[]"}
//! }"#;
//! let mut doc: Document = serde_json::from_str(json).unwrap();
//! doc.apply(WorkflowAction::StartEditing).unwrap();
//! assert_eq!(doc.status, DocumentStatus::Editing);
//! ```

mod merge;
mod workflow;

pub use merge::{LabelFallback, MergedField, MergedFields, merge_fields};
pub use workflow::{DocumentStatus, DocumentTask, TaskRole, WorkflowAction};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DocflowError;
use crate::field::{Field, FieldError, SignatureField, deserialize_fields, is_image_data_uri};

/// Custom deserializer for page image lists: accepts an array, a
/// JSON-encoded array string, or null.
fn deserialize_paths<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    match raw {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(Vec::new()),
        Some(serde_json::Value::String(s)) => {
            serde_json::from_str(&s).map_err(serde::de::Error::custom)
        }
        Some(other) => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// TEMPLATE
// ============================================================================

/// A PDF template with placed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_fields")]
    pub coordinate_fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_image_path: Option<String>,
    #[serde(default, deserialize_with = "deserialize_paths")]
    pub pdf_image_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Template {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            coordinate_fields: Vec::new(),
            pdf_image_path: None,
            pdf_image_paths: Vec::new(),
            created_at: None,
        }
    }

    /// Page image paths in page order, without duplicates.
    ///
    /// Multi-page templates list `pdfImagePaths`; older single-page templates
    /// only have `pdfImagePath`.
    pub fn page_images(&self) -> Vec<String> {
        let mut pages: Vec<String> = Vec::new();
        for path in &self.pdf_image_paths {
            if !path.is_empty() && !pages.contains(path) {
                pages.push(path.clone());
            }
        }
        if pages.is_empty()
            && let Some(path) = self.pdf_image_path.as_ref().filter(|p| !p.is_empty())
        {
            pages.push(path.clone());
        }
        pages
    }

    /// Number of pages; at least 1 so single-image templates still render.
    pub fn page_count(&self) -> u32 {
        self.page_images().len().max(1) as u32
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.coordinate_fields.iter().find(|f| f.id == id)
    }
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// A completed signature, as recorded by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    pub signer_email: String,
    #[serde(alias = "signatureData")]
    pub image_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
}

/// Mutable per-document payload, sent back as `PUT /documents/:id {data}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentData {
    #[serde(default, deserialize_with = "deserialize_fields")]
    pub coordinate_fields: Vec<Field>,
    #[serde(default)]
    pub signature_fields: Vec<SignatureField>,
    #[serde(default)]
    pub signatures: Vec<SignatureRecord>,
}

/// A document instance created from a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub template_id: String,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub data: DocumentData,
    #[serde(default)]
    pub tasks: Vec<DocumentTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Template>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(id: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            template_id: template_id.into(),
            status: DocumentStatus::Draft,
            data: DocumentData::default(),
            tasks: Vec::new(),
            template: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Completed documents accept no further writes.
    pub fn is_immutable(&self) -> bool {
        self.status.is_final()
    }

    fn ensure_mutable(&self) -> Result<(), DocflowError> {
        if self.is_immutable() {
            return Err(DocflowError::Immutable(format!(
                "document {} is {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// First task assigned to `role`.
    pub fn assignee(&self, role: TaskRole) -> Option<&DocumentTask> {
        self.tasks.iter().find(|t| t.role == role)
    }

    pub fn has_role(&self, email: &str, role: TaskRole) -> bool {
        self.tasks
            .iter()
            .any(|t| t.role == role && t.assigned_user_email.eq_ignore_ascii_case(email))
    }

    /// Client-side route guard: the viewer must hold one of `roles`.
    pub fn require_role(&self, email: &str, roles: &[TaskRole]) -> Result<(), DocflowError> {
        if roles.iter().any(|role| self.has_role(email, *role)) {
            Ok(())
        } else {
            Err(DocflowError::PermissionDenied(format!(
                "{} holds none of {:?} on document {}",
                email, roles, self.id
            )))
        }
    }

    /// Check whether `action` is allowed from the current status.
    pub fn can_apply(&self, action: WorkflowAction) -> bool {
        action.next_status(self.status).is_some()
    }

    /// Move to the status reached by `action`.
    pub fn apply(&mut self, action: WorkflowAction) -> Result<DocumentStatus, DocflowError> {
        let next = action.next_status(self.status).ok_or_else(|| {
            DocflowError::Workflow(format!(
                "cannot {} a document in status {}",
                action.slug(),
                self.status
            ))
        })?;
        self.status = next;
        Ok(next)
    }

    /// Resolved field list (template shapes merged with document copies).
    pub fn merged_fields(&self) -> MergedFields {
        let template_fields = self
            .template
            .as_ref()
            .map(|t| t.coordinate_fields.as_slice())
            .unwrap_or(&[]);
        merge_fields(template_fields, &self.data.coordinate_fields)
    }

    /// Set a field's value on the document's own copy.
    ///
    /// The first edit of a template field copies it into the document.
    pub fn set_field_value(&mut self, field_id: &str, value: impl Into<String>) -> Result<(), DocflowError> {
        self.ensure_mutable()?;
        let value = value.into();

        if let Some(field) = self
            .data
            .coordinate_fields
            .iter_mut()
            .find(|f| f.id == field_id)
        {
            field.value = Some(value);
            return Ok(());
        }

        let template_field = self
            .template
            .as_ref()
            .and_then(|t| t.field(field_id))
            .ok_or_else(|| DocflowError::NotFound(format!("field {}", field_id)))?;
        let mut copy = template_field.clone();
        copy.value = Some(value);
        self.data.coordinate_fields.push(copy);
        Ok(())
    }

    /// Current effective value of a field (document copy, else template).
    pub fn field_value(&self, field_id: &str) -> Option<&str> {
        self.data
            .coordinate_fields
            .iter()
            .find(|f| f.id == field_id)
            .or_else(|| self.template.as_ref().and_then(|t| t.field(field_id)))
            .and_then(|f| f.value.as_deref())
    }

    /// Attach a signature image on behalf of `signer_email`.
    ///
    /// Works on signature slots (`signatureFields`) and on signature-typed
    /// coordinate fields. Each can be signed once, by its assignee only.
    pub fn sign_field(
        &mut self,
        field_id: &str,
        data_uri: &str,
        signer_email: &str,
    ) -> Result<(), DocflowError> {
        self.ensure_mutable()?;

        if let Some(slot) = self
            .data
            .signature_fields
            .iter_mut()
            .find(|s| s.id == field_id)
        {
            if !slot.owner_email.eq_ignore_ascii_case(signer_email) {
                return Err(DocflowError::PermissionDenied(format!(
                    "signature {} belongs to {}",
                    field_id, slot.owner_email
                )));
            }
            slot.sign(data_uri)?;
        } else {
            let merged = self.merged_fields();
            let field = merged
                .get(field_id)
                .map(|m| &m.field)
                .ok_or_else(|| DocflowError::NotFound(format!("field {}", field_id)))?;
            let role = field
                .field_type
                .signature_role()
                .ok_or_else(|| DocflowError::NotFound(format!("signature field {}", field_id)))?;
            let allowed = match field.assignee_email.as_deref() {
                Some(email) => email.eq_ignore_ascii_case(signer_email),
                None => self.has_role(signer_email, role),
            };
            if !allowed {
                return Err(DocflowError::PermissionDenied(format!(
                    "{} may not sign field {}",
                    signer_email, field_id
                )));
            }
            if field.has_signature_image() {
                return Err(FieldError::AlreadySigned {
                    id: field_id.to_string(),
                }
                .into());
            }
            if !is_image_data_uri(data_uri) {
                return Err(FieldError::NotAnImage {
                    id: field_id.to_string(),
                }
                .into());
            }
            self.set_field_value(field_id, data_uri)?;
        }

        self.data.signatures.push(SignatureRecord {
            signer_email: signer_email.to_string(),
            image_data: data_uri.to_string(),
            signed_at: Some(Utc::now()),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldBox, FieldType};

    const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn template() -> Template {
        let mut template = Template::new("tpl", "Contract");
        template.coordinate_fields = vec![
            Field::new("name", "Name", FieldType::Text, FieldBox::new(0.0, 0.0, 100.0, 20.0)),
            Field::new("sig", "Signer", FieldType::SignerSignature, FieldBox::new(0.0, 50.0, 100.0, 40.0))
                .with_assignee("signer@example.com", "Signer"),
        ];
        template
    }

    fn document() -> Document {
        let mut doc = Document::new("doc", "tpl");
        doc.template = Some(template());
        doc.tasks = vec![
            DocumentTask::new(TaskRole::Editor, "editor@example.com"),
            DocumentTask::new(TaskRole::Signer, "signer@example.com"),
        ];
        doc
    }

    #[test]
    fn test_deserialize_backend_document() {
        let json = r#"{
            "id": "d1", "title": "PO", "templateId": "t1", "status": "SIGNING",
            "data": {
                "coordinateFields": "[{\"id\":\"a\",\"label\":\"A\",\"type\":\"text\",\"x\":1,\"y\":2,\"width\":3,\"height\":4,\"value\":\"v\"}]",
                "signatureFields": [{"id":"s","signerEmail":"x@y.z","signerName":"X","x":0,"y":0,"width":10,"height":10}],
                "signatures": [{"signerEmail":"x@y.z","signatureData":"data:image/png;base64,AA=="}]
            },
            "tasks": [{"role":"SIGNER","assignedUserEmail":"x@y.z"}],
            "updatedAt": "2024-03-01T10:00:00Z"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.status, DocumentStatus::Signing);
        assert_eq!(doc.data.coordinate_fields[0].value_str(), "v");
        assert_eq!(doc.data.signature_fields[0].owner_email, "x@y.z");
        assert_eq!(doc.data.signatures.len(), 1);
        assert!(doc.has_role("X@Y.Z", TaskRole::Signer));
        assert!(doc.updated_at.is_some());
    }

    #[test]
    fn test_template_page_images() {
        let mut template = Template::new("t", "T");
        assert!(template.page_images().is_empty());
        assert_eq!(template.page_count(), 1);

        template.pdf_image_path = Some("/uploads/pdf-templates/a.png".into());
        assert_eq!(template.page_images(), vec!["/uploads/pdf-templates/a.png"]);

        template.pdf_image_paths = vec!["p1.png".into(), "p2.png".into(), "p1.png".into()];
        assert_eq!(template.page_images(), vec!["p1.png", "p2.png"]);
        assert_eq!(template.page_count(), 2);
    }

    #[test]
    fn test_template_paths_encoded_string() {
        let json = r#"{"id":"t","pdfImagePaths":"[\"a.png\",\"b.png\"]","coordinateFields":[]}"#;
        let template: Template = serde_json::from_str(json).unwrap();
        assert_eq!(template.pdf_image_paths, vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_set_field_value_copies_template_field() {
        let mut doc = document();
        doc.set_field_value("name", "Kim").unwrap();
        assert_eq!(doc.data.coordinate_fields.len(), 1);
        assert_eq!(doc.field_value("name"), Some("Kim"));

        doc.set_field_value("name", "Lee").unwrap();
        assert_eq!(doc.data.coordinate_fields.len(), 1);
        assert_eq!(doc.field_value("name"), Some("Lee"));
    }

    #[test]
    fn test_set_field_value_unknown() {
        let mut doc = document();
        assert!(matches!(
            doc.set_field_value("nope", "x"),
            Err(DocflowError::NotFound(_))
        ));
    }

    #[test]
    fn test_completed_document_is_immutable() {
        let mut doc = document();
        doc.status = DocumentStatus::Completed;
        assert!(matches!(
            doc.set_field_value("name", "x"),
            Err(DocflowError::Immutable(_))
        ));
        assert!(matches!(
            doc.sign_field("sig", PNG, "signer@example.com"),
            Err(DocflowError::Immutable(_))
        ));
    }

    #[test]
    fn test_apply_invalid_transition() {
        let mut doc = document();
        assert!(matches!(
            doc.apply(WorkflowAction::Sign),
            Err(DocflowError::Workflow(_))
        ));
        assert_eq!(doc.status, DocumentStatus::Draft);
    }

    #[test]
    fn test_require_role() {
        let doc = document();
        assert!(doc.require_role("editor@example.com", &[TaskRole::Editor]).is_ok());
        assert!(matches!(
            doc.require_role("someone@example.com", &[TaskRole::Editor, TaskRole::Creator]),
            Err(DocflowError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_sign_coordinate_field_once() {
        let mut doc = document();
        assert!(matches!(
            doc.sign_field("sig", PNG, "editor@example.com"),
            Err(DocflowError::PermissionDenied(_))
        ));
        doc.sign_field("sig", PNG, "signer@example.com").unwrap();
        assert_eq!(doc.field_value("sig"), Some(PNG));
        assert_eq!(doc.data.signatures.len(), 1);
        assert!(matches!(
            doc.sign_field("sig", PNG, "signer@example.com"),
            Err(DocflowError::Field(FieldError::AlreadySigned { .. }))
        ));
    }

    #[test]
    fn test_sign_signature_slot() {
        let mut doc = document();
        doc.data.signature_fields.push(SignatureField::new(
            "slot",
            "reviewer@example.com",
            "Reviewer",
            FieldBox::new(0.0, 0.0, 50.0, 20.0),
        ));
        assert!(doc.sign_field("slot", PNG, "signer@example.com").is_err());
        doc.sign_field("slot", PNG, "reviewer@example.com").unwrap();
        assert!(doc.data.signature_fields[0].is_signed());
    }

    #[test]
    fn test_sign_rejects_non_signature_field() {
        let mut doc = document();
        assert!(doc.sign_field("name", PNG, "editor@example.com").is_err());
    }
}
