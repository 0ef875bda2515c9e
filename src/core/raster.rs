use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use super::errors::RenderError;

/// Points per inch in PDF user space; a scale of 1.0 renders at this DPI.
const PDF_POINTS_PER_INCH: f32 = 72.0;

#[async_trait]
pub trait PageRasterizer: Send + Sync {
    async fn page_count(&self, pdf_bytes: &[u8]) -> Result<u32, RenderError>;

    /// Renders one 1-indexed page to PNG bytes.
    async fn render_page(
        &self,
        pdf_bytes: &[u8],
        page: u32,
        scale: f32,
    ) -> Result<Vec<u8>, RenderError>;
}

#[derive(Clone)]
pub struct PdftoppmRasterizer {
    pub pdftoppm_executable_path: String,
    pub timeout: Duration,
}

impl PdftoppmRasterizer {
    pub fn new(pdftoppm_executable_path: String, timeout: Duration) -> Self {
        Self {
            pdftoppm_executable_path,
            timeout,
        }
    }
}

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    async fn page_count(&self, pdf_bytes: &[u8]) -> Result<u32, RenderError> {
        let document = lopdf::Document::load_mem(pdf_bytes)
            .map_err(|err| RenderError::Pdf(err.to_string()))?;
        Ok(document.get_pages().len() as u32)
    }

    async fn render_page(
        &self,
        pdf_bytes: &[u8],
        page: u32,
        scale: f32,
    ) -> Result<Vec<u8>, RenderError> {
        let rasterize_err = |reason: String| RenderError::Rasterize { page, reason };

        let temp_dir = tempfile::Builder::new()
            .prefix("resume-intake-raster-")
            .tempdir()
            .map_err(|err| rasterize_err(format!("failed to create temp dir: {err}")))?;

        let input_path: PathBuf = temp_dir.path().join("resume.pdf");
        let output_path: PathBuf = temp_dir.path().join("page.png");
        tokio::fs::write(&input_path, pdf_bytes)
            .await
            .map_err(|err| rasterize_err(format!("failed to stage PDF: {err}")))?;

        let dpi = (PDF_POINTS_PER_INCH * scale).round().max(1.0) as u32;
        let page_arg = page.to_string();

        let mut command = Command::new(&self.pdftoppm_executable_path);
        command
            .arg("-png")
            .arg("-singlefile")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(&page_arg)
            .arg("-l")
            .arg(&page_arg)
            .arg(&input_path)
            .arg(temp_dir.path().join("page"))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|err| {
                rasterize_err(format!(
                    "failed to run {}: {err}",
                    self.pdftoppm_executable_path
                ))
            })?,
            Err(_) => return Err(rasterize_err("pdftoppm timed out".to_string())),
        };

        if !output.status.success() {
            return Err(rasterize_err(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        tokio::fs::read(&output_path)
            .await
            .map_err(|err| rasterize_err(format!("missing rendered page: {err}")))
    }
}
