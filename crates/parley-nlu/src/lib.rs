//! Natural-language understanding for Parley.
//!
//! Every component here is stateless per call. The only state is the lazily
//! initialized per-language models held by the extractor and the intent
//! engine, each loaded once under concurrent first use.

pub mod analyzer;
pub mod error;
pub mod extractor;
pub mod gazetteer;
pub mod intent;
pub mod language;
pub mod lexicon;
pub mod merger;

pub use analyzer::{Analysis, LinguisticAnalyzer, Pos, Token};
pub use error::{NluError, Result};
pub use extractor::{BuiltinModelLoader, EntityModel, ModelLoader, StatisticalExtractor};
pub use gazetteer::GazetteerModel;
pub use intent::{
    ClassifierFactory, IntentClassifier, IntentEngine, IntentLabel, LabelSet, ZeroShotFactory,
};
pub use language::{Detection, LanguageDetector, LanguageResolver};
pub use merger::merge_entities;
