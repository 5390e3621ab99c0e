//! Intent classification against a dynamically declared label set.
//!
//! Labels come from skill declarations only. The engine compiles one
//! classifier per language on first use, scores every label, ranks them
//! (ties keep declaration order) and applies the confidence threshold.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use parley_core::{IntentResult, Language, ScoredLabel};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::analyzer::{Analysis, LinguisticAnalyzer};
use crate::error::{NluError, Result};

// =============================================================================
// Labels
// =============================================================================

/// One intent label as declared by a skill.
///
/// `examples` and `keywords` are keyed by language code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentLabel {
    pub name: String,
    #[serde(default)]
    pub examples: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub keywords: BTreeMap<String, Vec<String>>,
}

impl IntentLabel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn example(mut self, lang: &str, phrase: &str) -> Self {
        self.examples
            .entry(lang.to_string())
            .or_default()
            .push(phrase.to_string());
        self
    }

    pub fn keyword(mut self, lang: &str, keyword: &str) -> Self {
        self.keywords
            .entry(lang.to_string())
            .or_default()
            .push(keyword.to_string());
        self
    }

    fn absorb(&mut self, other: &IntentLabel) {
        for (lang, phrases) in &other.examples {
            self.examples
                .entry(lang.clone())
                .or_default()
                .extend(phrases.iter().cloned());
        }
        for (lang, words) in &other.keywords {
            self.keywords
                .entry(lang.clone())
                .or_default()
                .extend(words.iter().cloned());
        }
    }
}

/// Ordered, de-duplicated candidate labels.
///
/// A label declared twice keeps its first position and accumulates the
/// examples and keywords of every declaration.
#[derive(Debug, Clone, Default)]
pub struct LabelSet {
    labels: Vec<IntentLabel>,
}

impl LabelSet {
    pub fn new(declared: impl IntoIterator<Item = IntentLabel>) -> Self {
        let mut labels: Vec<IntentLabel> = Vec::new();
        for label in declared {
            match labels.iter_mut().find(|l| l.name == label.name) {
                Some(existing) => existing.absorb(&label),
                None => labels.push(label),
            }
        }
        Self { labels }
    }

    pub fn labels(&self) -> &[IntentLabel] {
        &self.labels
    }

    pub fn names(&self) -> Vec<&str> {
        self.labels.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// =============================================================================
// Classifier seam
// =============================================================================

/// A compiled classifier for one language.
pub trait IntentClassifier: Send + Sync {
    /// Score every label. Results must follow the label set's declaration
    /// order so the engine's stable ranking keeps it on ties.
    fn score(&self, analysis: &Analysis) -> Result<Vec<ScoredLabel>>;
}

/// Compiles a classifier for a language from its model id and the label set.
pub trait ClassifierFactory: Send + Sync {
    fn build(
        &self,
        model_id: &str,
        language: &Language,
        labels: &LabelSet,
    ) -> Result<Arc<dyn IntentClassifier>>;
}

// =============================================================================
// Built-in zero-shot classifier
// =============================================================================

const KEYWORD_WEIGHT: f32 = 0.55;
const EXAMPLE_WEIGHT: f32 = 0.45;

/// Factory for `builtin:*` classifiers.
#[derive(Debug, Default, Clone)]
pub struct ZeroShotFactory {
    analyzer: LinguisticAnalyzer,
}

impl ZeroShotFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClassifierFactory for ZeroShotFactory {
    fn build(
        &self,
        model_id: &str,
        language: &Language,
        labels: &LabelSet,
    ) -> Result<Arc<dyn IntentClassifier>> {
        if !model_id.starts_with("builtin:") {
            return Err(NluError::UnsupportedModel(model_id.to_string()));
        }
        let content = |phrase: &str| -> Vec<String> {
            self.analyzer
                .tokenize(phrase, language)
                .into_iter()
                .filter(|t| t.is_content())
                .map(|t| t.lemma)
                .collect()
        };

        let compiled = labels
            .labels()
            .iter()
            .map(|label| CompiledLabel {
                name: label.name.clone(),
                keywords: label
                    .keywords
                    .get(language.code())
                    .map(|ks| {
                        ks.iter()
                            .map(|k| content(k.as_str()))
                            .filter(|k| !k.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
                examples: label
                    .examples
                    .get(language.code())
                    .map(|es| {
                        es.iter()
                            .map(|e| content(e.as_str()).into_iter().collect::<HashSet<_>>())
                            .filter(|e| !e.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();
        Ok(Arc::new(ZeroShotClassifier { labels: compiled }))
    }
}

#[derive(Debug)]
struct CompiledLabel {
    name: String,
    /// Content-lemma sequences; any contiguous occurrence counts.
    keywords: Vec<Vec<String>>,
    examples: Vec<HashSet<String>>,
}

/// Lemma-overlap classifier: keyword presence plus best example coverage.
#[derive(Debug)]
pub struct ZeroShotClassifier {
    labels: Vec<CompiledLabel>,
}

impl IntentClassifier for ZeroShotClassifier {
    fn score(&self, analysis: &Analysis) -> Result<Vec<ScoredLabel>> {
        let sequence: Vec<&str> = analysis.content_lemmas();
        let present: HashSet<&str> = sequence.iter().copied().collect();

        Ok(self
            .labels
            .iter()
            .map(|label| {
                let keyword_hit = label.keywords.iter().any(|k| contains_run(&sequence, k));
                let coverage = label
                    .examples
                    .iter()
                    .map(|e| {
                        let hits = e.iter().filter(|w| present.contains(w.as_str())).count();
                        hits as f32 / e.len() as f32
                    })
                    .fold(0.0_f32, f32::max);
                let keyword = if keyword_hit { 1.0 } else { 0.0 };
                ScoredLabel {
                    label: label.name.clone(),
                    score: KEYWORD_WEIGHT * keyword + EXAMPLE_WEIGHT * coverage,
                }
            })
            .collect())
    }
}

fn contains_run(sequence: &[&str], run: &[String]) -> bool {
    if run.is_empty() || run.len() > sequence.len() {
        return false;
    }
    sequence
        .windows(run.len())
        .any(|w| w.iter().zip(run).all(|(a, b)| *a == b.as_str()))
}

// =============================================================================
// Engine
// =============================================================================

type ClassifierCell = Arc<OnceCell<Option<Arc<dyn IntentClassifier>>>>;

/// Classification policy over lazily compiled per-language classifiers.
pub struct IntentEngine {
    labels: Arc<LabelSet>,
    threshold: f32,
    model_ids: HashMap<Language, String>,
    factory: Arc<dyn ClassifierFactory>,
    cells: Mutex<HashMap<Language, ClassifierCell>>,
}

impl IntentEngine {
    pub fn new(
        labels: LabelSet,
        threshold: f32,
        model_ids: HashMap<Language, String>,
        factory: Arc<dyn ClassifierFactory>,
    ) -> Self {
        Self {
            labels: Arc::new(labels),
            threshold,
            model_ids,
            factory,
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Classify an analyzed utterance.
    ///
    /// Never fails: an unavailable or failing classifier yields `unknown`
    /// with confidence 0.
    pub async fn classify(&self, analysis: &Analysis, language: &Language) -> IntentResult {
        if self.labels.is_empty() {
            return IntentResult::unknown(0.0, Vec::new());
        }
        let Some(classifier) = self.classifier(language).await else {
            return IntentResult::unknown(0.0, Vec::new());
        };
        let mut scores = match classifier.score(analysis) {
            Ok(scores) => scores,
            Err(e) => {
                warn!(language = %language, error = %e, "Intent classifier failed");
                return IntentResult::unknown(0.0, Vec::new());
            }
        };
        for s in &mut scores {
            s.score = if s.score.is_finite() {
                s.score.clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
        // Stable sort: equal scores keep declaration order.
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));

        let Some(best) = scores.first().cloned() else {
            return IntentResult::unknown(0.0, scores);
        };
        debug!(
            language = %language,
            best = %best.label,
            score = best.score,
            threshold = self.threshold,
            "Intent scored"
        );
        if best.score >= self.threshold {
            IntentResult {
                label: best.label,
                confidence: best.score,
                alternates: scores,
            }
        } else {
            IntentResult::unknown(best.score, scores)
        }
    }

    async fn classifier(&self, language: &Language) -> Option<Arc<dyn IntentClassifier>> {
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
                    reason: "no intent model configured".to_string(),
                };
                warn!(language = %language, error = %err, "ModelUnavailable");
                return None;
            };
            match self.factory.build(id, language, &self.labels) {
                Ok(classifier) => {
                    info!(
                        language = %language,
                        model = %id,
                        labels = self.labels.len(),
                        "Intent classifier compiled"
                    );
                    Some(classifier)
                }
                Err(e) => {
                    warn!(language = %language, error = %e, "ModelUnavailable");
                    None
                }
            }
        })
        .await
        .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn weather() -> IntentLabel {
        IntentLabel::new("get_weather")
            .keyword("es", "tiempo")
            .keyword("es", "clima")
            .keyword("en", "weather")
            .example("es", "qué tiempo hace hoy")
            .example("es", "dime el clima en Panamá")
            .example("en", "what's the weather like")
    }

    fn time() -> IntentLabel {
        IntentLabel::new("get_time")
            .keyword("es", "hora")
            .keyword("en", "time")
            .example("es", "qué hora es")
            .example("en", "what time is it")
    }

    fn engine(labels: Vec<IntentLabel>, threshold: f32) -> IntentEngine {
        let ids = [Language::es(), Language::en()]
            .into_iter()
            .map(|l| {
                let id = format!("builtin:{}", l);
                (l, id)
            })
            .collect();
        IntentEngine::new(
            LabelSet::new(labels),
            threshold,
            ids,
            Arc::new(ZeroShotFactory::new()),
        )
    }

    fn analysis(text: &str, lang: &Language) -> Analysis {
        LinguisticAnalyzer::new().analyze(text, lang, Utc::now().date_naive())
    }

    #[test]
    fn test_label_set_merges_duplicates_in_place() {
        let set = LabelSet::new(vec![
            weather(),
            time(),
            IntentLabel::new("get_weather").keyword("es", "lluvia"),
        ]);
        assert_eq!(set.names(), vec!["get_weather", "get_time"]);
        assert_eq!(set.labels()[0].keywords["es"].len(), 3);
    }

    #[tokio::test]
    async fn test_weather_ranked_first() {
        let engine = engine(vec![time(), weather()], 0.35);
        let es = Language::es();
        let result = engine
            .classify(&analysis("qué tiempo hace en Madrid", &es), &es)
            .await;
        assert_eq!(result.label, "get_weather");
        assert!(result.confidence > 0.8);
        assert_eq!(result.alternates[0].label, "get_weather");
        assert_eq!(result.alternates.len(), 2);
    }

    #[tokio::test]
    async fn test_english_time() {
        let engine = engine(vec![weather(), time()], 0.35);
        let en = Language::en();
        let result = engine.classify(&analysis("what time is it", &en), &en).await;
        assert_eq!(result.label, "get_time");
        assert!((result.confidence - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_below_threshold_is_unknown_with_scores() {
        let engine = engine(vec![weather(), time()], 0.35);
        let es = Language::es();
        let result = engine
            .classify(&analysis("cuéntame un chiste", &es), &es)
            .await;
        assert!(result.is_unknown());
        assert_eq!(result.alternates.len(), 2);
        assert!(result.confidence < 0.35);
    }

    #[tokio::test]
    async fn test_ties_keep_declaration_order() {
        let a = IntentLabel::new("first").keyword("es", "hola");
        let b = IntentLabel::new("second").keyword("es", "hola");
        let engine = engine(vec![a, b], 0.35);
        let es = Language::es();
        let result = engine.classify(&analysis("hola", &es), &es).await;
        assert_eq!(result.label, "first");
        assert_eq!(result.alternates[1].label, "second");
    }

    #[tokio::test]
    async fn test_empty_label_set_is_unknown() {
        let engine = engine(vec![], 0.35);
        let es = Language::es();
        let result = engine.classify(&analysis("qué hora es", &es), &es).await;
        assert!(result.is_unknown());
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_unconfigured_language_is_unknown() {
        let engine = engine(vec![weather()], 0.35);
        let fr = Language::new("fr").unwrap();
        let result = engine.classify(&analysis("quel temps", &fr), &fr).await;
        assert!(result.is_unknown());
        assert_eq!(result.confidence, 0.0);
        assert!(result.alternates.is_empty());
    }

    struct FailingClassifier;

    impl IntentClassifier for FailingClassifier {
        fn score(&self, _analysis: &Analysis) -> Result<Vec<ScoredLabel>> {
            Err(NluError::Classifier("exploded".to_string()))
        }
    }

    struct CountingFactory {
        builds: AtomicUsize,
    }

    impl ClassifierFactory for CountingFactory {
        fn build(
            &self,
            _model_id: &str,
            _language: &Language,
            _labels: &LabelSet,
        ) -> Result<Arc<dyn IntentClassifier>> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(FailingClassifier))
        }
    }

    #[tokio::test]
    async fn test_failing_classifier_degrades_and_compiles_once() {
        let factory = Arc::new(CountingFactory {
            builds: AtomicUsize::new(0),
        });
        let ids = HashMap::from([(Language::es(), "custom".to_string())]);
        let engine = IntentEngine::new(LabelSet::new(vec![weather()]), 0.35, ids, factory.clone());
        let es = Language::es();
        for _ in 0..3 {
            let result = engine.classify(&analysis("qué tiempo", &es), &es).await;
            assert!(result.is_unknown());
            assert_eq!(result.confidence, 0.0);
        }
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_shot_rejects_foreign_model_ids() {
        let result = ZeroShotFactory::new().build("onnx:bert", &Language::es(), &LabelSet::default());
        assert!(matches!(result, Err(NluError::UnsupportedModel(_))));
    }
}
