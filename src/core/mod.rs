pub mod candidate_extractor;
pub mod candidate_store;
pub mod compensation;
pub mod document_renderer;
pub mod errors;
pub mod experience;
pub mod export;
pub mod field_extractor;
pub mod gemini;
pub mod ingestion;
pub mod logging;
pub mod match_scorer;
pub mod models;
pub mod page_selection;
pub mod pdf;
pub mod progress;
pub mod prompts;
pub mod query;
pub mod raster;
pub mod service;
pub mod settings_store;

#[cfg(test)]
pub(crate) mod test_support;
