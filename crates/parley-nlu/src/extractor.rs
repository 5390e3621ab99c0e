//! Model-backed entity extraction.
//!
//! Each language has at most one model, identified in configuration and
//! loaded on first use. Concurrent first calls for the same language share a
//! single load. A language with no usable model extracts nothing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parley_core::{Entity, Language};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{NluError, Result};
use crate::gazetteer::GazetteerModel;

/// A loaded named-entity model.
pub trait EntityModel: Send + Sync {
    /// Spans found in `text`, tagged `EntitySource::Statistical`.
    fn extract(&self, text: &str) -> Vec<Entity>;
}

/// Resolves a model identifier into a loaded model.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, id: &str, language: &Language) -> Result<Arc<dyn EntityModel>>;
}

/// Loader for `builtin:<lang>` and `file:<path>` identifiers.
#[derive(Debug, Default, Clone)]
pub struct BuiltinModelLoader;

#[async_trait]
impl ModelLoader for BuiltinModelLoader {
    async fn load(&self, id: &str, language: &Language) -> Result<Arc<dyn EntityModel>> {
        if let Some(code) = id.strip_prefix("builtin:") {
            let lang = Language::new(code).map_err(|e| NluError::ModelLoad {
                id: id.to_string(),
                reason: e.to_string(),
            })?;
            return Ok(Arc::new(GazetteerModel::builtin(lang)));
        }
        if let Some(path) = id.strip_prefix("file:") {
            let path = PathBuf::from(path);
            let language = language.clone();
            let model = tokio::task::spawn_blocking(move || {
                GazetteerModel::from_file(language, &path)
            })
            .await
            .map_err(|e| NluError::ModelLoad {
                id: id.to_string(),
                reason: e.to_string(),
            })??;
            return Ok(Arc::new(model));
        }
        Err(NluError::UnsupportedModel(id.to_string()))
    }
}

type ModelCell = Arc<OnceCell<Option<Arc<dyn EntityModel>>>>;

/// Per-language statistical extractor with lazy, single-flight model loading.
pub struct StatisticalExtractor {
    loader: Arc<dyn ModelLoader>,
    model_ids: HashMap<Language, String>,
    confidence_floor: f32,
    cells: Mutex<HashMap<Language, ModelCell>>,
}

impl StatisticalExtractor {
    pub fn new(
        loader: Arc<dyn ModelLoader>,
        model_ids: HashMap<Language, String>,
        confidence_floor: f32,
    ) -> Self {
        Self {
            loader,
            model_ids,
            confidence_floor,
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Extract entities at or above the confidence floor.
    ///
    /// Returns an empty list when the language has no usable model.
    pub async fn extract(&self, text: &str, language: &Language) -> Vec<Entity> {
        let Some(model) = self.model(language).await else {
            debug!(language = %language, "No entity model, skipping statistical extraction");
            return Vec::new();
        };
        let floor = self.confidence_floor;
        model
            .extract(text)
            .into_iter()
            .filter(|e| e.confidence >= floor)
            .collect()
    }

    /// Whether a model for `language` has been loaded successfully.
    pub fn is_loaded(&self, language: &Language) -> bool {
        self.cells
            .lock()
            .ok()
            .and_then(|cells| cells.get(language).cloned())
            .and_then(|cell| cell.get().map(Option::is_some))
            .unwrap_or(false)
    }

    async fn model(&self, language: &Language) -> Option<Arc<dyn EntityModel>> {
        let cell = {
            let mut cells = match self.cells.lock() {
                Ok(cells) => cells,
                Err(poisoned) => poisoned.into_inner(),
            };
            cells.entry(language.clone()).or_default().clone()
        };

        cell.get_or_init(|| async {
            let Some(id) = self.model_ids.get(language) else {
                let err = NluError::ModelUnavailable {
                    language: language.clone(),
                    reason: "no entity model configured".to_string(),
                };
                warn!(language = %language, error = %err, "ModelUnavailable");
                return None;
            };
            match self.loader.load(id, language).await {
                Ok(model) => {
                    info!(language = %language, model = %id, "Entity model loaded");
                    Some(model)
                }
                Err(e) => {
                    let err = NluError::ModelUnavailable {
                        language: language.clone(),
                        reason: e.to_string(),
                    };
                    warn!(language = %language, error = %err, "ModelUnavailable");
                    None
                }
            }
        })
        .await
        .clone()
    }
}
