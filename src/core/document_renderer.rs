use std::io::{Cursor, Read};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::errors::RenderError;
use super::models::{DocumentPayload, UploadedFile};
use super::page_selection::PageSelection;
use super::pdf::{self, RenderedPage};
use super::progress::{self, ProgressReporter};
use super::raster::PageRasterizer;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub const PROGRESS_START: u8 = 5;
pub const PROGRESS_RENDERED: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Image,
    Paginated,
    RichText,
}

/// Resolves the file's MIME type, falling back to its extension when the
/// upload carried none, and classifies it.
pub fn classify(file: &UploadedFile) -> Result<(DocumentKind, String), RenderError> {
    let declared = file.mime_type.trim().to_ascii_lowercase();
    let mime = if declared.is_empty() || declared == "application/octet-stream" {
        mime_guess::from_path(&file.name)
            .first_raw()
            .map(str::to_string)
            .unwrap_or(declared)
    } else {
        declared
    };

    let kind = if mime.starts_with("image/") {
        DocumentKind::Image
    } else if mime == PDF_MIME {
        DocumentKind::Paginated
    } else if mime == DOCX_MIME {
        DocumentKind::RichText
    } else {
        let shown = if mime.is_empty() {
            "unknown".to_string()
        } else {
            mime
        };
        return Err(RenderError::UnsupportedFileType(shown));
    };

    Ok((kind, mime))
}

#[derive(Clone)]
pub struct DocumentRenderer {
    rasterizer: Arc<dyn PageRasterizer>,
    render_scale: f32,
}

impl DocumentRenderer {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, render_scale: f32) -> Self {
        Self {
            rasterizer,
            render_scale,
        }
    }

    /// Page count for paginated documents, `None` for everything else.
    pub async fn page_count(&self, file: &UploadedFile) -> Result<Option<u32>, RenderError> {
        match classify(file)? {
            (DocumentKind::Paginated, _) => {
                Ok(Some(self.rasterizer.page_count(&file.bytes).await?))
            }
            _ => Ok(None),
        }
    }

    /// Produces the AI payload for one file. Progress moves from 5 to 80.
    pub async fn render(
        &self,
        file: &UploadedFile,
        selection: Option<&PageSelection>,
        progress: &dyn ProgressReporter,
    ) -> Result<DocumentPayload, RenderError> {
        let (kind, mime) = classify(file)?;
        progress.report(PROGRESS_START);

        let payload = match kind {
            DocumentKind::Image => DocumentPayload::Image {
                mime_type: mime,
                data_base64: STANDARD.encode(&file.bytes),
            },
            DocumentKind::Paginated => self.render_pages(file, selection, progress).await?,
            DocumentKind::RichText => {
                let text = extract_docx_text(&file.bytes)?;
                if text.trim().is_empty() {
                    return Err(RenderError::EmptyText {
                        file_name: file.name.clone(),
                    });
                }
                DocumentPayload::Text { text }
            }
        };

        progress.report(PROGRESS_RENDERED);
        Ok(payload)
    }

    async fn render_pages(
        &self,
        file: &UploadedFile,
        selection: Option<&PageSelection>,
        progress: &dyn ProgressReporter,
    ) -> Result<DocumentPayload, RenderError> {
        let page_count = self.rasterizer.page_count(&file.bytes).await?;
        let pages = match selection {
            Some(selection) => selection.pages_within(page_count),
            None => PageSelection::all(page_count).pages_within(page_count),
        };

        let mut rendered = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().copied().enumerate() {
            let outcome = match self
                .rasterizer
                .render_page(&file.bytes, page, self.render_scale)
                .await
            {
                Ok(png) => RenderedPage::decode(page, &png),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(page) => rendered.push(page),
                Err(err) => {
                    tracing::warn!(file_name = %file.name, page, error = %err, "skipping page");
                }
            }

            progress.report(progress::scaled(
                PROGRESS_START,
                PROGRESS_RENDERED,
                index + 1,
                pages.len(),
            ));
        }

        if rendered.is_empty() {
            return Err(RenderError::NoPagesRendered {
                file_name: file.name.clone(),
            });
        }

        tracing::debug!(
            file_name = %file.name,
            pages = ?rendered.iter().map(|p| p.number).collect::<Vec<_>>(),
            "stitching rendered pages"
        );

        let png = tokio::task::spawn_blocking(move || {
            let composite = pdf::stitch_vertically(&rendered);
            pdf::encode_png(&composite)
        })
        .await
        .map_err(|err| RenderError::Image(format!("compositing task failed: {err}")))??;

        Ok(DocumentPayload::Image {
            mime_type: "image/png".to_string(),
            data_base64: STANDARD.encode(png),
        })
    }
}

fn extract_docx_text(data: &[u8]) -> Result<String, RenderError> {
    let docx_err = |err: &dyn std::fmt::Display| RenderError::Document(err.to_string());

    let mut archive = zip::ZipArchive::new(Cursor::new(data)).map_err(|e| docx_err(&e))?;
    let mut document_file = archive
        .by_name("word/document.xml")
        .map_err(|e| docx_err(&e))?;
    let mut xml = String::new();
    document_file
        .read_to_string(&mut xml)
        .map_err(|e| docx_err(&e))?;

    let mut reader = Reader::from_str(&xml);
    let mut buf = Vec::new();
    let mut current = String::new();
    let mut lines = Vec::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => current.clear(),
                b"w:t" => in_text_run = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if matches!(e.name().as_ref(), b"w:tab" | b"w:br") {
                    current.push(' ');
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => {
                    let line = current.trim();
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_run {
                    let value = e.xml_content().map_err(|e| docx_err(&e))?;
                    current.push_str(&value);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(docx_err(&err)),
            _ => {}
        }

        buf.clear();
    }

    Ok(lines.join("\n"))
}
