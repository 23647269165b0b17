//! # docflow CLI
//!
//! Command-line interface for rendering field overlays.
//!
//! ## Usage
//!
//! ```bash
//! # Render a field list to overlay nodes (JSON on stdout)
//! docflow render --fields fields.json --surface readonly --scale 0.8
//!
//! # Same fields as a standalone print page and a PNG
//! docflow render --fields fields.json --html overlay.html --png overlay.png --font NanumGothic.ttf
//!
//! # Print HTML for a backend document
//! docflow print --document 42 --out doc-42.html
//!
//! # PNG preview of one page
//! docflow preview --document 42 --page 2 --png page2.png
//!
//! # Every page (doc-1.png, doc-2.png, ...)
//! docflow preview --document 42 --png doc.png
//!
//! # Run the render service
//! docflow serve --listen 0.0.0.0:3000
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use docflow::{
    DocflowError,
    api::{HttpApi, fetch_page_image, load_document},
    config::ClientConfig,
    document::{DocumentTask, merge_fields},
    field::{SignatureField, decode_fields},
    layout::clamp_zoom,
    render::{
        RenderInput, RenderOptions, RenderedPage, Surface, document_page, document_pages,
        html::print_html, raster::PageCompositor, render_fields,
    },
    server::{ServerConfig, serve},
};

/// docflow - document field overlay renderer
#[derive(Parser, Debug)]
#[command(name = "docflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a local field list
    Render {
        /// Document fields (JSON array, or JSON string holding one)
        #[arg(long, value_name = "FILE")]
        fields: PathBuf,

        /// Template fields the document fields are merged onto
        #[arg(long, value_name = "FILE")]
        template_fields: Option<PathBuf>,

        /// Standalone signature slots (JSON array)
        #[arg(long, value_name = "FILE")]
        signatures: Option<PathBuf>,

        /// Document tasks (JSON array), used for signer names
        #[arg(long, value_name = "FILE")]
        tasks: Option<PathBuf>,

        /// Output surface: interactive, readonly or print
        #[arg(long, default_value = "interactive")]
        surface: Surface,

        /// Zoom level (ignored for print)
        #[arg(long, default_value = "1.0")]
        scale: f64,

        /// 1-based page to render
        #[arg(long, default_value = "1")]
        page: u32,

        /// Write a print page to this file
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,

        /// Write a PNG to this file
        #[arg(long, value_name = "FILE")]
        png: Option<PathBuf>,

        /// Page image to draw under the PNG overlay
        #[arg(long, value_name = "FILE")]
        background: Option<PathBuf>,

        /// Print nodes as JSON (default when no output file is given)
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        client: ClientConfig,
    },

    /// Write print HTML for a backend document
    Print {
        /// Document id
        #[arg(long)]
        document: String,

        /// Output file
        #[arg(long, value_name = "FILE")]
        out: PathBuf,

        #[command(flatten)]
        client: ClientConfig,
    },

    /// Write PNG previews of document pages
    Preview {
        /// Document id
        #[arg(long)]
        document: String,

        /// 1-based page (omit to render every page)
        #[arg(long)]
        page: Option<u32>,

        /// Output file
        #[arg(long, value_name = "FILE")]
        png: PathBuf,

        /// Zoom level
        #[arg(long, default_value = "1.0")]
        scale: f64,

        #[arg(long, default_value = "readonly")]
        surface: Surface,

        #[command(flatten)]
        client: ClientConfig,
    },

    /// Run the render service
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:3000", env = "DOCFLOW_LISTEN")]
        listen: String,

        #[command(flatten)]
        client: ClientConfig,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "docflow=info,tower_http=debug".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), DocflowError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            fields,
            template_fields,
            signatures,
            tasks,
            surface,
            scale,
            page,
            html,
            png,
            background,
            json,
            client,
        } => {
            let document_fields = decode_fields(parse_json(&fields)?)
                .map_err(|e| DocflowError::Decode(format!("{}: {}", fields.display(), e)))?;
            let template_fields = match &template_fields {
                Some(path) => decode_fields(parse_json(path)?)
                    .map_err(|e| DocflowError::Decode(format!("{}: {}", path.display(), e)))?,
                None => Vec::new(),
            };
            let signatures: Vec<SignatureField> = match &signatures {
                Some(path) => parse_json(path)?,
                None => Vec::new(),
            };
            let tasks: Vec<DocumentTask> = match &tasks {
                Some(path) => parse_json(path)?,
                None => Vec::new(),
            };

            let mut opts = match surface {
                Surface::Print => RenderOptions::print(),
                other => RenderOptions::new(other, clamp_zoom(scale)),
            }
            .on_page(page);
            opts.viewer_email = client.viewer_email.clone();

            let merged = merge_fields(&template_fields, &document_fields);
            for fallback in &merged.label_fallbacks {
                eprintln!(
                    "Matched '{}' to template field '{}' by label",
                    fallback.label, fallback.template_id
                );
            }
            let input = RenderInput::new(&merged.fields)
                .with_signatures(&signatures)
                .with_tasks(&tasks);
            let rendered = RenderedPage {
                page,
                image: None,
                scale: opts.scale,
                nodes: render_fields(&input, &opts),
            };

            if json || (html.is_none() && png.is_none()) {
                let out = serde_json::to_string_pretty(&rendered.nodes)
                    .map_err(|e| DocflowError::Decode(e.to_string()))?;
                println!("{}", out);
            }

            if let Some(path) = html {
                std::fs::write(&path, print_html("docflow", std::slice::from_ref(&rendered)))?;
                eprintln!("Saved to {}", path.display());
            }
            if let Some(path) = png {
                let compositor = compositor(&client)?;
                let background = background.as_ref().map(std::fs::read).transpose()?;
                let bytes = compositor.render_png(background.as_deref(), &rendered)?;
                std::fs::write(&path, bytes)?;
                eprintln!("Saved to {}", path.display());
            }
        }

        Commands::Print {
            document,
            out,
            client,
        } => {
            let api = HttpApi::new(client.clone())?;
            let doc = load_document(&api, &document).await?;

            let mut opts = RenderOptions::print();
            opts.viewer_email = client.viewer_email.clone();
            let mut pages = document_pages(&doc, &opts);
            for page in &mut pages {
                page.image = page.image.take().map(|p| client.asset_url(&p));
            }

            let title = if doc.title.is_empty() { &doc.id } else { &doc.title };
            std::fs::write(&out, print_html(title, &pages))?;
            println!("Saved {} pages to {}", pages.len(), out.display());
        }

        Commands::Preview {
            document,
            page,
            png,
            scale,
            surface,
            client,
        } => {
            let api = HttpApi::new(client.clone())?;
            let doc = load_document(&api, &document).await?;

            let mut opts = RenderOptions::new(surface, clamp_zoom(scale));
            opts.viewer_email = client.viewer_email.clone();
            let compositor = compositor(&client)?;

            let Some(page) = page else {
                let pages = document_pages(&doc, &opts);
                let mut jobs = Vec::with_capacity(pages.len());
                for rendered in pages {
                    let background = fetch_page_image(&api, rendered.image.as_deref()).await;
                    jobs.push((background, rendered));
                }
                for ((_, rendered), bytes) in jobs.iter().zip(compositor.render_pages(&jobs)) {
                    let path = page_file(&png, rendered.page);
                    std::fs::write(&path, bytes?)?;
                    println!("Saved to {}", path.display());
                }
                return Ok(());
            };

            let rendered = document_page(&doc, &opts.on_page(page)).ok_or_else(|| {
                DocflowError::NotFound(format!("page {} of document {}", page, document))
            })?;
            let background = fetch_page_image(&api, rendered.image.as_deref()).await;
            let bytes = compositor.render_png(background.as_deref(), &rendered)?;
            std::fs::write(&png, bytes)?;
            println!("Saved to {}", png.display());
        }

        Commands::Serve { listen, client } => {
            serve(ServerConfig {
                listen_addr: listen,
                client,
            })
            .await?;
        }
    }

    Ok(())
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DocflowError> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| DocflowError::Decode(format!("{}: {}", path.display(), e)))
}

/// `out.png` → `out-<page>.png`.
fn page_file(path: &Path, page: u32) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("page");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("png");
    path.with_file_name(format!("{}-{}.{}", stem, page, ext))
}

fn compositor(client: &ClientConfig) -> Result<PageCompositor, DocflowError> {
    match &client.font_path {
        Some(path) => PageCompositor::with_font_file(path),
        None => {
            eprintln!("Warning: no --font given, text will not be drawn");
            Ok(PageCompositor::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_file_names() {
        assert_eq!(page_file(Path::new("out/doc.png"), 2), PathBuf::from("out/doc-2.png"));
        assert_eq!(page_file(Path::new("preview"), 1), PathBuf::from("preview-1.png"));
    }
}
