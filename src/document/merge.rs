//! Merge template field shapes with a document's field copies.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::field::Field;

/// A document field that could only be matched to its template field by
/// label. Legacy data with regenerated ids ends up here; it is a data
/// quality problem to fix, not a supported identity rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelFallback {
    pub label: String,
    pub template_id: String,
    pub document_id: String,
}

/// Effective field plus the template's copy of it (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct MergedField {
    /// The field to render: the document's copy when one exists.
    pub field: Field,
    /// The template's original, kept for fallback cell defaults.
    pub template: Option<Field>,
}

/// Result of [`merge_fields`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedFields {
    pub fields: Vec<MergedField>,
    pub label_fallbacks: Vec<LabelFallback>,
}

impl MergedFields {
    /// Effective fields only.
    pub fn effective(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().map(|m| &m.field)
    }

    pub fn get(&self, id: &str) -> Option<&MergedField> {
        self.fields.iter().find(|m| m.field.id == id)
    }
}

/// Resolve the field list of a document.
///
/// - A document field replaces the template field with the same id.
/// - A document field whose id matches no template field is matched by
///   label to a still-unmatched template field, but only when exactly one
///   such template field carries that label. Every label match is reported.
/// - Template-only fields are kept in template order, followed by
///   document-only fields in document order.
pub fn merge_fields(template_fields: &[Field], document_fields: &[Field]) -> MergedFields {
    let template_ids: HashSet<&str> = template_fields.iter().map(|f| f.id.as_str()).collect();

    let mut by_template: HashMap<usize, &Field> = HashMap::new();
    let mut extras: Vec<&Field> = Vec::new();
    let mut label_fallbacks = Vec::new();

    // Id matches first, so label matching only sees truly unmatched slots.
    let mut unmatched_docs = Vec::new();
    for doc_field in document_fields {
        if template_ids.contains(doc_field.id.as_str()) {
            if let Some(idx) = template_fields.iter().position(|t| t.id == doc_field.id) {
                by_template.insert(idx, doc_field);
            }
        } else {
            unmatched_docs.push(doc_field);
        }
    }

    for doc_field in unmatched_docs {
        let candidates: Vec<usize> = template_fields
            .iter()
            .enumerate()
            .filter(|(idx, t)| {
                !by_template.contains_key(idx)
                    && !doc_field.label.is_empty()
                    && t.label == doc_field.label
            })
            .map(|(idx, _)| idx)
            .collect();

        match candidates.as_slice() {
            [idx] => {
                let template_field = &template_fields[*idx];
                tracing::warn!(
                    "[merge] field '{}' matched by label only (template id {}, document id {})",
                    doc_field.label,
                    template_field.id,
                    doc_field.id
                );
                label_fallbacks.push(LabelFallback {
                    label: doc_field.label.clone(),
                    template_id: template_field.id.clone(),
                    document_id: doc_field.id.clone(),
                });
                by_template.insert(*idx, doc_field);
            }
            _ => extras.push(doc_field),
        }
    }

    let mut fields: Vec<MergedField> = template_fields
        .iter()
        .enumerate()
        .map(|(idx, template_field)| MergedField {
            field: by_template
                .get(&idx)
                .map(|f| (*f).clone())
                .unwrap_or_else(|| template_field.clone()),
            template: Some(template_field.clone()),
        })
        .collect();

    fields.extend(extras.into_iter().map(|f| MergedField {
        field: f.clone(),
        template: None,
    }));

    MergedFields {
        fields,
        label_fallbacks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldBox, FieldType};
    use pretty_assertions::assert_eq;

    fn field(id: &str, label: &str) -> Field {
        Field::new(id, label, FieldType::Text, FieldBox::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn test_document_copy_wins_by_id() {
        let template = vec![field("a", "A"), field("b", "B")];
        let document = vec![field("b", "B").with_value("filled")];
        let merged = merge_fields(&template, &document);

        let ids: Vec<_> = merged.effective().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(merged.get("b").unwrap().field.value_str(), "filled");
        assert!(merged.get("b").unwrap().template.as_ref().unwrap().value.is_none());
        assert!(merged.label_fallbacks.is_empty());
    }

    #[test]
    fn test_label_fallback_is_reported() {
        let template = vec![field("old-id", "성명")];
        let document = vec![field("new-id", "성명").with_value("홍길동")];
        let merged = merge_fields(&template, &document);

        assert_eq!(merged.fields.len(), 1);
        assert_eq!(merged.fields[0].field.value_str(), "홍길동");
        assert_eq!(
            merged.label_fallbacks,
            vec![LabelFallback {
                label: "성명".into(),
                template_id: "old-id".into(),
                document_id: "new-id".into(),
            }]
        );
    }

    #[test]
    fn test_ambiguous_label_is_not_matched() {
        let template = vec![field("t1", "Date"), field("t2", "Date")];
        let document = vec![field("d1", "Date").with_value("2024-01-01")];
        let merged = merge_fields(&template, &document);

        assert_eq!(merged.fields.len(), 3);
        assert!(merged.label_fallbacks.is_empty());
        assert!(merged.fields[2].template.is_none());
    }

    #[test]
    fn test_id_match_takes_slot_before_label() {
        let template = vec![field("t1", "Name")];
        let document = vec![
            field("zzz", "Name").with_value("by label"),
            field("t1", "Name").with_value("by id"),
        ];
        let merged = merge_fields(&template, &document);

        assert_eq!(merged.fields[0].field.value_str(), "by id");
        assert_eq!(merged.fields[1].field.value_str(), "by label");
        assert!(merged.label_fallbacks.is_empty());
    }

    #[test]
    fn test_document_only_fields_appended() {
        let template = vec![field("a", "A")];
        let document = vec![field("x", ""), field("y", "Y")];
        let merged = merge_fields(&template, &document);
        let ids: Vec<_> = merged.effective().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "x", "y"]);
    }
}
