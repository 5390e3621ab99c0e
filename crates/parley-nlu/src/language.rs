//! Language detection and resolution.
//!
//! The detector scores each supported language profile by stop-word hits and
//! orthographic cues. The resolver then decides which language the turn runs
//! in, falling back to the session's previous language (or the configured
//! default) when the detector is unsure.

use std::sync::LazyLock;

use parley_core::Language;
use regex::Regex;
use tracing::debug;

use crate::lexicon::fold;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}']+").expect("Invalid word regex"));

/// Outcome of a detection call.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub language: Language,
    /// Winning profile's share of all evidence, in [0, 1].
    pub confidence: f32,
}

struct Profile {
    code: &'static str,
    /// Folded high-frequency words.
    markers: &'static [&'static str],
    /// Characters or digraphs that are strong evidence on their own.
    cues: &'static [&'static str],
}

const PROFILES: &[Profile] = &[
    Profile {
        code: "es",
        markers: &[
            "el", "la", "los", "las", "de", "del", "en", "que", "y", "es", "un", "una", "por",
            "para", "con", "hace", "hoy", "dime", "como", "esta", "hola", "gracias", "buenos",
            "dias", "tiempo", "hora", "clima", "manana", "recuerdame", "cual", "donde", "quiero",
            "puedes", "ayuda",
        ],
        cues: &["ñ", "¿", "¡", "á", "í", "ó", "ú"],
    },
    Profile {
        code: "en",
        markers: &[
            "the", "a", "an", "of", "in", "is", "it", "what", "how", "to", "and", "you", "me",
            "my", "please", "hello", "hi", "thanks", "weather", "time", "today", "tomorrow",
            "remind", "set", "tell", "can", "help", "start", "over",
        ],
        cues: &["th", "'s", "w"],
    },
    Profile {
        code: "fr",
        markers: &[
            "le", "la", "les", "des", "de", "du", "est", "et", "je", "tu", "vous", "nous", "quel",
            "quelle", "bonjour", "merci", "temps", "heure", "il", "fait", "pas", "en",
        ],
        cues: &["è", "ê", "à", "ç", "eau", "oi"],
    },
    Profile {
        code: "pt",
        markers: &[
            "o", "os", "as", "do", "da", "em", "no", "na", "um", "uma", "que", "e", "voce",
            "obrigado", "ola", "tempo", "hora", "hoje", "qual", "esta", "nao",
        ],
        cues: &["ã", "õ", "ç", "ção", "lh", "nh"],
    },
];

const MARKER_WEIGHT: f32 = 1.0;
const CUE_WEIGHT: f32 = 0.5;

/// Stateless statistical language classifier over a fixed profile set.
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    supported: Vec<Language>,
}

impl LanguageDetector {
    /// Create a detector restricted to `supported`. Languages without a
    /// built-in profile can never win.
    pub fn new(supported: Vec<Language>) -> Self {
        Self { supported }
    }

    pub fn supported(&self) -> &[Language] {
        &self.supported
    }

    /// Detect the language of `text`.
    ///
    /// Text with no evidence at all yields the first supported language with
    /// confidence 0.
    pub fn detect(&self, text: &str) -> Detection {
        let lowered = text.to_lowercase();
        let words: Vec<String> = WORD_RE
            .find_iter(&lowered)
            .map(|m| fold(m.as_str()))
            .collect();

        let mut scores: Vec<(Language, f32)> = Vec::new();
        for lang in &self.supported {
            let Some(profile) = PROFILES.iter().find(|p| p.code == lang.code()) else {
                continue;
            };
            let marker_hits = words
                .iter()
                .filter(|w| profile.markers.contains(&w.as_str()))
                .count() as f32;
            let cue_hits = profile
                .cues
                .iter()
                .filter(|cue| lowered.contains(**cue))
                .count() as f32;
            scores.push((lang.clone(), marker_hits * MARKER_WEIGHT + cue_hits * CUE_WEIGHT));
        }

        let total: f32 = scores.iter().map(|(_, s)| s).sum();
        let fallback = self.supported.first().cloned().unwrap_or_else(Language::es);
        if total <= 0.0 {
            return Detection {
                language: fallback,
                confidence: 0.0,
            };
        }

        // First maximum wins so ties keep the configured order.
        let mut best = (fallback, f32::MIN);
        for (lang, score) in scores {
            if score > best.1 {
                best = (lang, score);
            }
        }

        let damping = match words.len() {
            0 | 1 => 0.6,
            2 => 0.8,
            _ => 1.0,
        };
        let confidence = (best.1 / total * damping).clamp(0.0, 1.0);
        debug!(language = %best.0, confidence, "Language detected");
        Detection {
            language: best.0,
            confidence,
        }
    }
}

/// Policy turning a raw detection into the language a turn runs in.
#[derive(Debug, Clone)]
pub struct LanguageResolver {
    floor: f32,
    default: Language,
}

impl LanguageResolver {
    pub fn new(floor: f32, default: Language) -> Self {
        Self { floor, default }
    }

    /// Use the detection if confident, else the previous turn's language,
    /// else the default.
    pub fn resolve(&self, detection: &Detection, previous: Option<&Language>) -> Language {
        if detection.confidence >= self.floor {
            return detection.language.clone();
        }
        match previous {
            Some(lang) => lang.clone(),
            None => self.default.clone(),
        }
    }
}
