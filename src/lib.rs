//! # docflow - Document Field Overlays
//!
//! docflow is the client side of a PDF document signing platform. Templates
//! are uploaded PDFs (rasterised into page images) with fields placed on a
//! fixed canonical page; documents are filled-in copies that move through a
//! review and signing workflow. This crate provides:
//!
//! - **Field model**: typed fields, table values, signature slots
//! - **Layout**: canonical-to-screen transform and table geometry
//! - **Rendering**: positioned overlay nodes, print HTML, PNG previews
//! - **Workflow**: status transitions and task roles
//! - **Stores**: template, document, notification and bulk staging state
//!   with debounced autosave against the backend REST API
//!
//! ## Quick Start
//!
//! ```
//! use docflow::field::{Field, FieldBox, FieldType};
//! use docflow::document::merge_fields;
//! use docflow::render::{RenderInput, RenderOptions, render_fields};
//!
//! let fields = vec![
//!     Field::new("name", "Name", FieldType::Text, FieldBox::new(100.0, 100.0, 200.0, 40.0))
//!         .with_value("Kim"),
//! ];
//! let merged = merge_fields(&fields, &fields);
//!
//! let nodes = render_fields(&RenderInput::new(&merged.fields), &RenderOptions::readonly(0.5));
//! assert_eq!(nodes[0].rect.left, 50.0);
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`field`] | Field types and value codecs |
//! | [`layout`] | Coordinate transform and table layout |
//! | [`document`] | Templates, documents, merge and workflow |
//! | [`render`] | Overlay nodes, HTML and raster output |
//! | [`api`] | Backend REST client |
//! | [`store`] | Client state containers and autosave |
//! | [`server`] | HTTP render service |
//! | [`config`] | Client configuration |
//! | [`error`] | Error types |

pub mod api;
pub mod config;
pub mod document;
pub mod error;
pub mod field;
pub mod layout;
pub mod render;
pub mod server;
pub mod store;

// Re-exports for convenience
pub use error::DocflowError;
