use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, RwLock};

use super::candidate_extractor::CandidateExtractor;
use super::candidate_store::CandidateStore;
use super::document_renderer::DocumentRenderer;
use super::errors::CoreError;
use super::export;
use super::gemini::{GeminiClient, GenerativeModel};
use super::ingestion::{IngestionQueue, QueueEvent};
use super::match_scorer::MatchScorer;
use super::models::{
    Candidate, FileStatus, PreviewSnapshot, ProcessingMode, RuntimeSettings, UploadedFile,
};
use super::page_selection::PageSelection;
use super::query::CandidateQuery;
use super::raster::{PageRasterizer, PdftoppmRasterizer};
use super::settings_store::SettingsStore;

pub const API_KEY_ENV: &str = "RESUME_INTAKE_GEMINI_API_KEY";
pub const FALLBACK_API_KEY_ENV: &str = "GEMINI_API_KEY";

const RASTER_TIMEOUT: Duration = Duration::from_secs(120);

/// Entry point for a front end: uploads, preview decisions, the candidate
/// collection and match analysis.
pub struct CoreService {
    settings_store: SettingsStore,
    settings: RwLock<RuntimeSettings>,
    store: Arc<CandidateStore>,
    extractor: Arc<CandidateExtractor>,
    queue: IngestionQueue,
    scorer: MatchScorer,
}

impl CoreService {
    pub async fn new() -> anyhow::Result<Arc<Self>> {
        let settings_store = SettingsStore::new();
        let settings = match settings_store.load().await {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(
                    path = %settings_store.path().display(),
                    error = %err,
                    "falling back to default settings"
                );
                RuntimeSettings::default()
            }
        };

        let api_key = resolve_api_key(
            std::env::var(API_KEY_ENV).ok(),
            std::env::var(FALLBACK_API_KEY_ENV).ok(),
        )
        .ok_or(CoreError::MissingApiKey)?;

        let model = GeminiClient::new(
            api_key,
            settings.gemini_model.clone(),
            Duration::from_secs(settings.request_timeout_seconds),
        )
        .context("failed to build Gemini client")?;
        let rasterizer = PdftoppmRasterizer::new(settings.pdftoppm_path.clone(), RASTER_TIMEOUT);

        tracing::info!(
            model = %settings.gemini_model,
            auto_parse = settings.auto_parse,
            "core service ready"
        );
        Ok(Self::with_components(
            Arc::new(model),
            Arc::new(rasterizer),
            settings,
            settings_store,
            Handle::current(),
        ))
    }

    /// Parsing runs on `runtime`; the other methods may be called from any
    /// thread.
    pub fn with_components(
        model: Arc<dyn GenerativeModel>,
        rasterizer: Arc<dyn PageRasterizer>,
        settings: RuntimeSettings,
        settings_store: SettingsStore,
        runtime: Handle,
    ) -> Arc<Self> {
        let settings = settings.sanitized();
        let renderer = DocumentRenderer::new(rasterizer, settings.render_scale);
        let extractor = Arc::new(CandidateExtractor::new(
            renderer,
            Arc::clone(&model),
            settings.max_retries,
            Duration::from_secs_f64(settings.retry_delay_seconds),
        ));
        let store = Arc::new(CandidateStore::new());
        let queue = IngestionQueue::new(
            Arc::clone(&extractor),
            Arc::clone(&store),
            ProcessingMode::from_auto_parse(settings.auto_parse),
            runtime,
        );

        Arc::new(Self {
            settings_store,
            settings: RwLock::new(settings),
            store,
            extractor,
            queue,
            scorer: MatchScorer::new(model),
        })
    }

    pub async fn get_settings(&self) -> RuntimeSettings {
        self.settings.read().await.clone()
    }

    /// Persists settings. The processing mode switches immediately; model,
    /// retry and rendering settings are picked up on the next start.
    pub async fn save_settings(
        &self,
        new_settings: RuntimeSettings,
    ) -> anyhow::Result<RuntimeSettings> {
        let saved = self.settings_store.save(&new_settings).await?;
        *self.settings.write().await = saved.clone();
        self.queue.set_mode(ProcessingMode::from_auto_parse(saved.auto_parse));
        Ok(saved)
    }

    pub fn processing_mode(&self) -> ProcessingMode {
        self.queue.mode()
    }

    pub fn set_processing_mode(&self, mode: ProcessingMode) {
        self.queue.set_mode(mode);
    }

    /// Returns the names admitted; duplicates of known names are dropped.
    pub fn upload(&self, files: Vec<UploadedFile>) -> Vec<String> {
        self.queue.enqueue(files)
    }

    pub fn preview(&self) -> Option<PreviewSnapshot> {
        self.queue.preview()
    }

    /// Confirms the file in preview. `pages` uses the `"1-3, 5"` syntax;
    /// `None` keeps every page. Non-paginated files ignore it. Fails when the
    /// preview moves on to another file before the page count is known.
    pub async fn confirm_preview(&self, pages: Option<&str>) -> anyhow::Result<String> {
        let (file, known_count) = self.queue.preview_entry().ok_or_else(no_preview)?;

        let selection = match pages.map(str::trim).filter(|p| !p.is_empty()) {
            Some(input) => {
                let page_count = match known_count {
                    Some(count) => Some(count),
                    None => self.page_count_of(&file).await,
                };
                page_count.map(|count| PageSelection::parse(input, count))
            }
            None => None,
        };

        Ok(self
            .queue
            .confirm_preview_of(&file, selection)
            .ok_or_else(no_preview)?)
    }

    pub fn cancel_preview(&self) -> anyhow::Result<String> {
        Ok(self.queue.cancel_preview().ok_or_else(no_preview)?)
    }

    pub fn file_statuses(&self) -> Vec<FileStatus> {
        self.queue.file_statuses()
    }

    pub fn clear_file_statuses(&self) -> usize {
        self.queue.clear_statuses()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.queue.subscribe()
    }

    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await;
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        self.store.all()
    }

    pub fn query_candidates(&self, query: &CandidateQuery) -> Vec<Candidate> {
        query.apply(&self.store.all())
    }

    pub fn set_shortlisted(&self, ids: &[String], shortlisted: bool) -> usize {
        self.store.set_shortlisted(ids, shortlisted)
    }

    pub fn delete_candidates(&self, ids: &[String]) -> usize {
        self.store.delete(ids)
    }

    /// Scores the whole collection against `job_description` and returns it
    /// ordered by score, best first. Per-candidate failures show up as a zero
    /// score rather than an error.
    pub async fn analyze_matches(&self, job_description: &str) -> anyhow::Result<Vec<Candidate>> {
        if job_description.trim().is_empty() {
            return Err(
                CoreError::InvalidRequest("Job description must not be empty".to_string()).into(),
            );
        }

        let candidates = self.store.all();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(candidates = candidates.len(), "starting match analysis");
        let scored = self.scorer.score_all(candidates, job_description).await;
        let applied = self.store.apply_match_results(scored);
        tracing::debug!(applied, "match results stored");
        Ok(self.store.all())
    }

    pub fn clear_match_analysis(&self) -> usize {
        self.store.clear_match_analysis()
    }

    pub fn export_rows(&self, query: &CandidateQuery) -> Vec<Vec<String>> {
        export::export_rows(&self.query_candidates(query))
    }

    pub fn clipboard_tsv(&self, query: &CandidateQuery) -> String {
        export::clipboard_tsv(&self.query_candidates(query))
    }

    // The background page count lookup may not have finished yet.
    async fn page_count_of(&self, file: &UploadedFile) -> Option<u32> {
        match self.extractor.renderer().page_count(file).await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!(file_name = %file.name, error = %err, "page count unavailable");
                None
            }
        }
    }
}

fn no_preview() -> CoreError {
    CoreError::InvalidRequest("No file is awaiting preview".to_string())
}

/// The dedicated variable wins over the generic one; blank values count as
/// unset.
fn resolve_api_key(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    [primary, fallback]
        .into_iter()
        .flatten()
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}
