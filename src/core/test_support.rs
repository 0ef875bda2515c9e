use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use super::errors::{AiError, RenderError};
use super::gemini::{GenerationRequest, GenerativeModel};
use super::models::UploadedFile;
use super::raster::PageRasterizer;

pub fn pdf_file(name: &str) -> UploadedFile {
    UploadedFile::new(name, "application/pdf", b"%PDF-1.7 fake".to_vec())
}

pub fn image_file(name: &str) -> UploadedFile {
    UploadedFile::new(name, "image/png", vec![0x89, b'P', b'N', b'G'])
}

pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

pub fn extraction_json(full_name: &str) -> String {
    serde_json::json!({
        "fullName": full_name,
        "email": "Jane@X.com",
        "mobile": "98-76 543210",
        "dob": "",
        "currentCompany": "Acme",
        "designation": "Data Engineer",
        "totalExperience": "5 years",
        "relevantExperience": "3 years 6 months",
        "skills": ["Python", " SQL ", ""],
        "currentCTC": "12 LPA",
        "expectedCTC": "18 LPA",
        "noticePeriod": "30 days",
        "highestQualification": "B.Tech",
        "educationField": "Computer Science",
        "currentLocation": "Pune"
    })
    .to_string()
}

/// Rasterizer that draws each page as a solid block of a page-specific color.
pub struct FakeRasterizer {
    pub page_heights: Vec<u32>,
    pub width: u32,
    pub failing_pages: Vec<u32>,
    pub page_count_delay: Option<Duration>,
    pub rendered: Arc<Mutex<Vec<u32>>>,
}

impl FakeRasterizer {
    pub fn with_heights(page_heights: &[u32]) -> Self {
        Self {
            page_heights: page_heights.to_vec(),
            width: 16,
            failing_pages: Vec::new(),
            page_count_delay: None,
            rendered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn page_color(page: u32) -> Rgb<u8> {
        Rgb([(page * 40) as u8, 0, 0])
    }
}

#[async_trait]
impl PageRasterizer for FakeRasterizer {
    async fn page_count(&self, _pdf_bytes: &[u8]) -> Result<u32, RenderError> {
        if let Some(delay) = self.page_count_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.page_heights.len() as u32)
    }

    async fn render_page(
        &self,
        _pdf_bytes: &[u8],
        page: u32,
        _scale: f32,
    ) -> Result<Vec<u8>, RenderError> {
        if self.failing_pages.contains(&page) {
            return Err(RenderError::Rasterize {
                page,
                reason: "corrupt page".to_string(),
            });
        }

        let height = self.page_heights[(page - 1) as usize];
        let image = RgbImage::from_pixel(self.width, height, Self::page_color(page));
        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();
        self.rendered.lock().unwrap().push(page);
        Ok(png.into_inner())
    }
}

type Responder = dyn Fn(&GenerationRequest<'_>, usize) -> Result<String, AiError> + Send + Sync;

/// Model whose answers come from a closure receiving the request and the
/// zero-based call number.
pub struct FakeModel {
    responder: Box<Responder>,
    pub calls: AtomicUsize,
    pub delay: Option<Duration>,
}

impl FakeModel {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&GenerationRequest<'_>, usize) -> Result<String, AiError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn always(response: String) -> Self {
        Self::new(move |_, _| Ok(response.clone()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeModel for FakeModel {
    async fn generate_json(&self, request: &GenerationRequest<'_>) -> Result<String, AiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(request, call)
    }
}
