//! # HTML Output
//!
//! Absolutely positioned overlay markup, and a self-contained print page
//! that lays each template page image under its overlay at the paper scale.
//!
//! The print page needs no external stylesheet or script: A4 page rules,
//! one `.page` block per template page, and `window.print()` on load.

use std::fmt::Write as _;

use super::{NodeKind, RenderNode, RenderedPage};
use crate::layout::{ScreenRect, page_size};

const PRINT_CSS: &str = "\
@page { size: A4; margin: 0; }
* { box-sizing: border-box; }
html, body { margin: 0; padding: 0; background: #fff; }
.page { position: relative; overflow: hidden; page-break-after: always; break-after: page; }
.page:last-child { page-break-after: auto; break-after: auto; }
.page > img.background { position: absolute; left: 0; top: 0; width: 100%; height: 100%; }
.node { position: absolute; display: flex; align-items: center; justify-content: center; \
text-align: center; white-space: pre-wrap; overflow: hidden; line-height: 1.2; color: #000; }
.node.placeholder { color: #9ca3af; }
.node.signature-placeholder { color: #6b7280; border: 1px dashed #9ca3af; }
.node.image img { width: 100%; height: 100%; object-fit: contain; }
.cell { position: absolute; display: flex; align-items: center; justify-content: center; \
border: 1px solid #000; overflow: hidden; padding: 0 2px; }
.cell.header { font-weight: bold; background: #f3f4f6; }
.required { color: #ef4444; }
";

/// Escape text for use in element content and attribute values.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn px(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    format!("{}px", rounded)
}

fn position(rect: &ScreenRect) -> String {
    format!(
        "left:{};top:{};width:{};height:{};",
        px(rect.left),
        px(rect.top),
        px(rect.width),
        px(rect.height)
    )
}

/// Font declarations. The family is stripped of characters that could end
/// the declaration or the attribute.
fn font(size: f64, family: &str) -> String {
    let family: String = family
        .chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '"' | '\'' | '<' | '>' | '\\') && !c.is_control())
        .collect();
    format!("font-size:{};font-family:{};", px(size), html_escape(family.trim()))
}

/// Markup for one overlay node.
fn node_html(out: &mut String, node: &RenderNode) {
    let id = html_escape(&node.field_id);
    let style = position(&node.rect);

    match &node.kind {
        NodeKind::Text {
            text,
            font_size,
            font_family,
            placeholder,
            required,
        } => {
            let class = if *placeholder { "node text placeholder" } else { "node text" };
            let marker = if *required {
                " <span class=\"required\">*</span>"
            } else {
                ""
            };
            let _ = write!(
                out,
                "<div class=\"{}\" data-field-id=\"{}\" style=\"{}{}\">{}{}</div>",
                class,
                id,
                style,
                font(*font_size, font_family),
                html_escape(text),
                marker
            );
        }
        NodeKind::Image { data_uri } => {
            let _ = write!(
                out,
                "<div class=\"node image\" data-field-id=\"{}\" style=\"{}\"><img src=\"{}\" alt=\"\"></div>",
                id,
                style,
                html_escape(data_uri)
            );
        }
        NodeKind::SignaturePlaceholder { text } => {
            let _ = write!(
                out,
                "<div class=\"node signature-placeholder\" data-field-id=\"{}\" style=\"{}\">{}</div>",
                id,
                style,
                html_escape(text)
            );
        }
        NodeKind::Table(table) => {
            let cell_font = font(table.font_size, &table.font_family);
            let _ = write!(out, "<div class=\"table\" data-field-id=\"{}\">", id);
            for cell in table.header.iter().flatten() {
                let _ = write!(
                    out,
                    "<div class=\"cell header\" style=\"{}{}\">{}</div>",
                    position(&cell.rect),
                    cell_font,
                    html_escape(&cell.text)
                );
            }
            for cell in table.cells() {
                let _ = write!(
                    out,
                    "<div class=\"cell\" data-row=\"{}\" data-col=\"{}\" style=\"{}{}\">{}</div>",
                    cell.row,
                    cell.col,
                    position(&cell.rect),
                    cell_font,
                    html_escape(&cell.text)
                );
            }
            out.push_str("</div>");
        }
    }
}

/// Overlay markup for a list of nodes, in node order.
pub fn overlay_html(nodes: &[RenderNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        node_html(&mut out, node);
        out.push('\n');
    }
    out
}

/// Complete print document for the given pages.
pub fn print_html(title: &str, pages: &[RenderedPage]) -> String {
    let mut out = String::with_capacity(4096);
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n",
        html_escape(title),
        PRINT_CSS
    );

    for page in pages {
        let (width, height) = page_size(page.scale);
        let _ = writeln!(
            out,
            "<div class=\"page\" data-page=\"{}\" style=\"width:{};height:{};\">",
            page.page,
            px(width),
            px(height)
        );
        if let Some(image) = &page.image {
            let _ = writeln!(
                out,
                "<img class=\"background\" src=\"{}\" alt=\"\">",
                html_escape(image)
            );
        }
        out.push_str(&overlay_html(&page.nodes));
        out.push_str("</div>\n");
    }

    out.push_str("<script>window.addEventListener('load', function () { window.print(); });</script>\n");
    out.push_str("</body>\n</html>\n");
    out
}
