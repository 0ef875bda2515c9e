use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub mobile: String,
    pub date_of_birth: String,
    pub current_company: String,
    pub designation: String,
    pub total_experience: f64,
    pub relevant_experience: f64,
    pub skills: Vec<String>,
    #[serde(rename = "currentCTC")]
    pub current_ctc: String,
    #[serde(rename = "expectedCTC")]
    pub expected_ctc: String,
    pub notice_period: String,
    pub highest_qualification: String,
    pub education_field: String,
    pub current_location: String,
    pub file_name: String,
    #[serde(flatten)]
    pub match_analysis: Option<MatchAnalysis>,
    #[serde(default)]
    pub is_shortlisted: bool,
}

impl Candidate {
    pub fn match_score(&self) -> Option<u8> {
        self.match_analysis.as_ref().map(|analysis| analysis.match_score)
    }
}

/// Score and reason always travel together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchAnalysis {
    pub match_score: u8,
    pub match_reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Parsing,
    Success,
    Error,
}

impl FileState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FileState::Success | FileState::Error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    pub file_name: String,
    pub status: FileState,
    pub progress: u8,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl FileStatus {
    pub fn parsing(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            status: FileState::Parsing,
            progress: 0,
            error: None,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    #[default]
    Auto,
    Manual,
}

impl ProcessingMode {
    pub fn from_auto_parse(auto_parse: bool) -> Self {
        if auto_parse {
            ProcessingMode::Auto
        } else {
            ProcessingMode::Manual
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSnapshot {
    pub file_name: String,
    pub mime_type: String,
    pub page_count: Option<u32>,
}

/// Content handed to the AI capability for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentPayload {
    Image { mime_type: String, data_base64: String },
    Text { text: String },
}

/// Structured output returned by the AI for one resume.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeExtraction {
    pub full_name: String,
    pub email: String,
    pub mobile: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dob: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_company: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub designation: String,
    pub total_experience: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relevant_experience: String,
    pub skills: Vec<String>,
    #[serde(rename = "currentCTC", default, deserialize_with = "null_as_default")]
    pub current_ctc: String,
    #[serde(rename = "expectedCTC", default, deserialize_with = "null_as_default")]
    pub expected_ctc: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notice_period: String,
    pub highest_qualification: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub education_field: String,
    pub current_location: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchVerdict {
    pub match_score: i64,
    pub match_reason: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeSettings {
    pub gemini_model: String,
    pub pdftoppm_path: String,
    pub render_scale: f32,
    pub auto_parse: bool,
    pub max_retries: usize,
    pub retry_delay_seconds: f64,
    pub request_timeout_seconds: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            gemini_model: "gemini-2.5-flash".to_string(),
            pdftoppm_path: "pdftoppm".to_string(),
            render_scale: 1.5,
            auto_parse: true,
            max_retries: 3,
            retry_delay_seconds: 1.0,
            request_timeout_seconds: 120,
        }
    }
}

impl RuntimeSettings {
    pub fn sanitized(self) -> Self {
        let defaults = RuntimeSettings::default();
        Self {
            gemini_model: if self.gemini_model.trim().is_empty() {
                defaults.gemini_model
            } else {
                self.gemini_model.trim().to_string()
            },
            pdftoppm_path: if self.pdftoppm_path.trim().is_empty() {
                defaults.pdftoppm_path
            } else {
                self.pdftoppm_path
            },
            render_scale: if self.render_scale.is_finite() {
                self.render_scale.clamp(0.5, 4.0)
            } else {
                defaults.render_scale
            },
            auto_parse: self.auto_parse,
            max_retries: self.max_retries.max(1),
            retry_delay_seconds: self.retry_delay_seconds.max(0.1),
            request_timeout_seconds: self.request_timeout_seconds.max(5),
        }
    }
}
