use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Gemini API key is not configured. Set GEMINI_API_KEY first.")]
    MissingApiKey,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("No pages could be rendered from {file_name}")]
    NoPagesRendered { file_name: String },
    #[error("Failed to read PDF: {0}")]
    Pdf(String),
    #[error("Failed to rasterize page {page}: {reason}")]
    Rasterize { page: u32, reason: String },
    #[error("Failed to read document text: {0}")]
    Document(String),
    #[error("No readable text found in {file_name}")]
    EmptyText { file_name: String },
    #[error("Failed to compose page image: {0}")]
    Image(String),
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Gemini API request failed with status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Gemini request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Gemini returned no content")]
    EmptyResponse,
}

impl AiError {
    pub fn is_retryable(&self) -> bool {
        match self {
            AiError::Api { status, .. } => *status == 429 || *status >= 500,
            AiError::Transport(err) => {
                if err.is_timeout() || err.is_connect() {
                    return true;
                }

                err.status()
                    .map(|status| status.as_u16() == 429 || status.is_server_error())
                    .unwrap_or(false)
            }
            AiError::EmptyResponse => false,
        }
    }
}

/// Failure of one file's extraction. The display text is what the file's
/// status entry shows.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("AI service error: {0}")]
    Ai(#[from] AiError),
    #[error("AI response did not match the resume schema: {reason}")]
    InvalidAiResponse { reason: String },
}
