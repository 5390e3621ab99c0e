//! Tokenization, coarse annotation, and rule-based entity matching.
//!
//! Rule packs exist for Spanish and English. Any other language still gets
//! tokens and lemmas but no rule entities.
//!
//! Overlapping rule matches resolve by span length (longer wins), then by the
//! rule's position in its pack (earlier wins). The outcome never depends on
//! the order in which matches were found.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use parley_core::text::CharIndex;
use parley_core::{Entity, EntityLabel, EntitySource, Language};
use regex::{Captures, Regex};
use tracing::debug;

use crate::lexicon::{fold, is_function_word, lemmatize};

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:[.,:]\d+)*|[\p{L}\p{M}]+(?:['’][\p{L}]+)?|\S")
        .expect("Invalid token regex")
});

/// Coarse part of speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pos {
    Word,
    ProperNoun,
    Function,
    Number,
    Punct,
}

/// One annotated token. Offsets are character positions, end exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub lemma: String,
    pub pos: Pos,
}

impl Token {
    /// Content-bearing tokens: words, names and numbers.
    pub fn is_content(&self) -> bool {
        matches!(self.pos, Pos::Word | Pos::ProperNoun | Pos::Number)
    }
}

/// Analyzer output for one utterance.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub tokens: Vec<Token>,
    /// Span-disjoint rule entities ordered by start offset.
    pub entities: Vec<Entity>,
}

impl Analysis {
    /// Lemmas of content tokens, in utterance order.
    pub fn content_lemmas(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter(|t| t.is_content())
            .map(|t| t.lemma.as_str())
            .collect()
    }
}

type Normalizer = fn(&Captures<'_>, NaiveDate) -> Option<String>;

/// A single pattern-based entity rule.
struct Rule {
    label: EntityLabel,
    regex: Regex,
    /// Capture group whose span becomes the entity span.
    group: usize,
    normalize: Normalizer,
}

impl Rule {
    fn new(label: EntityLabel, pattern: &str, group: usize, normalize: Normalizer) -> Self {
        Self {
            label,
            regex: Regex::new(pattern).expect("Invalid entity rule regex"),
            group,
            normalize,
        }
    }
}

// =============================================================================
// Rule packs
// =============================================================================

const ES_MONTHS: &str =
    "enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|setiembre|octubre|noviembre|diciembre";
const EN_MONTHS: &str =
    "january|february|march|april|may|june|july|august|september|october|november|december";

static ES_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(EntityLabel::Date, r"\b(\d{4})-(\d{2})-(\d{2})\b", 0, norm_iso_date),
        Rule::new(EntityLabel::Date, r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b", 0, norm_dmy),
        Rule::new(
            EntityLabel::Date,
            &format!(r"(?i)\b(\d{{1,2}}) de ({ES_MONTHS})(?: de (\d{{4}}))?\b"),
            0,
            norm_day_month,
        ),
        Rule::new(
            EntityLabel::Date,
            r"(?i)\b(pasado mañana|anteayer|hoy|mañana|ayer)\b",
            0,
            norm_relative_day,
        ),
        Rule::new(
            EntityLabel::Date,
            r"(?i)\b(?:el |este |próximo |proximo )?(lunes|martes|miércoles|miercoles|jueves|viernes|sábado|sabado|domingo)\b",
            0,
            norm_weekday,
        ),
        Rule::new(
            EntityLabel::Time,
            r"(?i)\b(?:a )?las? (\d{1,2})(?::(\d{2}))?(?: (?:de la |por la )?(mañana|tarde|noche))?\b",
            0,
            norm_clock_es,
        ),
        Rule::new(EntityLabel::Time, r"\b([01]?\d|2[0-3]):([0-5]\d)\b", 0, norm_hh_mm),
        Rule::new(
            EntityLabel::Location,
            r"\b(?:[Ee]n|[Dd]esde|[Hh]acia) (\p{Lu}\p{L}*(?: (?:de |del )?\p{Lu}\p{L}*)*)",
            1,
            norm_place,
        ),
        Rule::new(
            EntityLabel::Quantity,
            r"(?i)\b(\d+(?:[.,]\d+)?) ?(grados|kilómetros|kilometros|km|metros|kilos|litros|minutos|horas|por ciento|%)",
            0,
            norm_quantity,
        ),
    ]
});

static EN_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(EntityLabel::Date, r"\b(\d{4})-(\d{2})-(\d{2})\b", 0, norm_iso_date),
        Rule::new(EntityLabel::Date, r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b", 0, norm_mdy),
        Rule::new(
            EntityLabel::Date,
            &format!(r"(?i)\b({EN_MONTHS}) (\d{{1,2}})(?:st|nd|rd|th)?(?:,? (\d{{4}}))?\b"),
            0,
            norm_month_day,
        ),
        Rule::new(
            EntityLabel::Date,
            &format!(r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)? of ({EN_MONTHS})(?:,? (\d{{4}}))?\b"),
            0,
            norm_day_month,
        ),
        Rule::new(
            EntityLabel::Date,
            r"(?i)\b(the day after tomorrow|today|tonight|tomorrow|yesterday)\b",
            0,
            norm_relative_day,
        ),
        Rule::new(
            EntityLabel::Date,
            r"(?i)\b(?:on |this |next )?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
            0,
            norm_weekday,
        ),
        Rule::new(
            EntityLabel::Time,
            r"(?i)\b(?:at )?(\d{1,2})(?::(\d{2}))? ?(am\b|pm\b|a\.m\.|p\.m\.)",
            0,
            norm_clock_en,
        ),
        Rule::new(
            EntityLabel::Time,
            r"(?i)\b(?:at )?([01]?\d|2[0-3]):([0-5]\d)\b",
            0,
            norm_hh_mm,
        ),
        Rule::new(EntityLabel::Time, r"(?i)\b(noon|midnight)\b", 0, norm_named_time),
        Rule::new(
            EntityLabel::Location,
            r"\b(?:[Ii]n|[Ff]rom|[Ff]or) (\p{Lu}\p{L}*(?: \p{Lu}\p{L}*)*)",
            1,
            norm_place,
        ),
        Rule::new(
            EntityLabel::Quantity,
            r"(?i)\b(\d+(?:\.\d+)?) ?(degrees|kilometers|km|miles|meters|kilos|kg|pounds|liters|minutes|hours|percent|%)",
            0,
            norm_quantity,
        ),
    ]
});

fn rules_for(lang: &Language) -> Option<&'static [Rule]> {
    match lang.code() {
        "es" => Some(ES_RULES.as_slice()),
        "en" => Some(EN_RULES.as_slice()),
        _ => None,
    }
}

// =============================================================================
// Analyzer
// =============================================================================

/// Stateless tokenizer, annotator and rule-based entity matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinguisticAnalyzer;

impl LinguisticAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Whether `lang` has a rule pack.
    pub fn has_rules(&self, lang: &Language) -> bool {
        rules_for(lang).is_some()
    }

    /// Annotate `text` and match rule entities.
    ///
    /// Relative dates ("mañana", "next friday") resolve against `today`, the
    /// speaker's local calendar date. Never fails; unknown languages yield
    /// tokens only.
    pub fn analyze(&self, text: &str, lang: &Language, today: NaiveDate) -> Analysis {
        let index = CharIndex::new(text);
        let tokens = self.tokenize_indexed(text, &index, lang);
        let entities = match rules_for(lang) {
            Some(rules) => match_rules(rules, text, &index, today),
            None => Vec::new(),
        };
        debug!(
            language = %lang,
            tokens = tokens.len(),
            entities = entities.len(),
            "Utterance analyzed"
        );
        Analysis { tokens, entities }
    }

    /// Tokenize and annotate without entity matching.
    pub fn tokenize(&self, text: &str, lang: &Language) -> Vec<Token> {
        self.tokenize_indexed(text, &CharIndex::new(text), lang)
    }

    fn tokenize_indexed(&self, text: &str, index: &CharIndex, lang: &Language) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut sentence_start = true;

        for m in TOKEN_RE.find_iter(text) {
            let surface = m.as_str();
            let first = surface.chars().next().unwrap_or(' ');
            let folded = fold(surface);

            let pos = if first.is_ascii_digit() {
                Pos::Number
            } else if !first.is_alphanumeric() {
                Pos::Punct
            } else if is_function_word(&folded, lang) {
                Pos::Function
            } else if first.is_uppercase() && !sentence_start {
                Pos::ProperNoun
            } else {
                Pos::Word
            };

            let lemma = match pos {
                Pos::Word | Pos::ProperNoun | Pos::Function => lemmatize(&folded, lang),
                Pos::Number | Pos::Punct => surface.to_string(),
            };

            sentence_start = match pos {
                Pos::Punct => matches!(first, '.' | '!' | '?' | '¿' | '¡') || sentence_start,
                _ => false,
            };

            tokens.push(Token {
                text: surface.to_string(),
                start: index.to_char(m.start()),
                end: index.to_char(m.end()),
                lemma,
                pos,
            });
        }
        tokens
    }
}

/// Run every rule, then keep a span-disjoint subset by (length desc, rule
/// order asc, start asc).
fn match_rules(rules: &[Rule], text: &str, index: &CharIndex, today: NaiveDate) -> Vec<Entity> {
    let mut candidates: Vec<(usize, Entity)> = Vec::new();

    for (rule_idx, rule) in rules.iter().enumerate() {
        for caps in rule.regex.captures_iter(text) {
            let Some(span) = caps.get(rule.group) else {
                continue;
            };
            let Some(value) = (rule.normalize)(&caps, today) else {
                continue;
            };
            let start = index.to_char(span.start());
            let end = index.to_char(span.end());
            if start >= end {
                continue;
            }
            candidates.push((
                rule_idx,
                Entity {
                    label: rule.label,
                    value,
                    text: span.as_str().to_string(),
                    start,
                    end,
                    source: EntitySource::Rule,
                    confidence: 1.0,
                },
            ));
        }
    }

    candidates.sort_by(|(ra, a), (rb, b)| {
        b.len()
            .cmp(&a.len())
            .then(ra.cmp(rb))
            .then(a.start.cmp(&b.start))
    });

    let mut kept: Vec<Entity> = Vec::new();
    for (_, candidate) in candidates {
        if kept.iter().all(|k| !k.overlaps(&candidate)) {
            kept.push(candidate);
        }
    }
    kept.sort_by_key(|e| e.start);
    kept
}

// =============================================================================
// Normalizers
// =============================================================================

fn cap_num(caps: &Captures<'_>, i: usize) -> Option<u32> {
    caps.get(i).and_then(|m| m.as_str().parse().ok())
}

fn cap_year(caps: &Captures<'_>, i: usize, today: NaiveDate) -> Option<i32> {
    match caps.get(i) {
        Some(m) => m.as_str().parse().ok(),
        None => Some(today.year()),
    }
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn month_number(name: &str) -> Option<u32> {
    let folded = fold(name);
    let n = match folded.as_str() {
        "enero" | "january" => 1,
        "febrero" | "february" => 2,
        "marzo" | "march" => 3,
        "abril" | "april" => 4,
        "mayo" | "may" => 5,
        "junio" | "june" => 6,
        "julio" | "july" => 7,
        "agosto" | "august" => 8,
        "septiembre" | "setiembre" | "september" => 9,
        "octubre" | "october" => 10,
        "noviembre" | "november" => 11,
        "diciembre" | "december" => 12,
        _ => return None,
    };
    Some(n)
}

fn norm_iso_date(caps: &Captures<'_>, _today: NaiveDate) -> Option<String> {
    let date = NaiveDate::from_ymd_opt(
        caps.get(1)?.as_str().parse().ok()?,
        cap_num(caps, 2)?,
        cap_num(caps, 3)?,
    )?;
    Some(iso(date))
}

fn norm_dmy(caps: &Captures<'_>, _today: NaiveDate) -> Option<String> {
    let year = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, cap_num(caps, 2)?, cap_num(caps, 1)?).map(iso)
}

fn norm_mdy(caps: &Captures<'_>, _today: NaiveDate) -> Option<String> {
    let year = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, cap_num(caps, 1)?, cap_num(caps, 2)?).map(iso)
}

/// "3 de mayo [de 2026]" and "3rd of May [2026]".
fn norm_day_month(caps: &Captures<'_>, today: NaiveDate) -> Option<String> {
    let day = cap_num(caps, 1)?;
    let month = month_number(caps.get(2)?.as_str())?;
    NaiveDate::from_ymd_opt(cap_year(caps, 3, today)?, month, day).map(iso)
}

/// "May 3[rd][, 2026]".
fn norm_month_day(caps: &Captures<'_>, today: NaiveDate) -> Option<String> {
    let month = month_number(caps.get(1)?.as_str())?;
    let day = cap_num(caps, 2)?;
    NaiveDate::from_ymd_opt(cap_year(caps, 3, today)?, month, day).map(iso)
}

fn norm_relative_day(caps: &Captures<'_>, today: NaiveDate) -> Option<String> {
    let offset = match fold(caps.get(1)?.as_str()).as_str() {
        "hoy" | "today" | "tonight" => 0,
        "manana" | "tomorrow" => 1,
        "pasado manana" | "the day after tomorrow" => 2,
        "ayer" | "yesterday" => -1,
        "anteayer" => -2,
        _ => return None,
    };
    Some(iso(today + Duration::days(offset)))
}

/// The next occurrence of the weekday; naming today's weekday means a week
/// from today.
fn norm_weekday(caps: &Captures<'_>, today: NaiveDate) -> Option<String> {
    let target = match fold(caps.get(1)?.as_str()).as_str() {
        "lunes" | "monday" => Weekday::Mon,
        "martes" | "tuesday" => Weekday::Tue,
        "miercoles" | "wednesday" => Weekday::Wed,
        "jueves" | "thursday" => Weekday::Thu,
        "viernes" | "friday" => Weekday::Fri,
        "sabado" | "saturday" => Weekday::Sat,
        "domingo" | "sunday" => Weekday::Sun,
        _ => return None,
    };
    let current = today.weekday().num_days_from_monday() as i64;
    let wanted = target.num_days_from_monday() as i64;
    let mut ahead = (wanted - current).rem_euclid(7);
    if ahead == 0 {
        ahead = 7;
    }
    Some(iso(today + Duration::days(ahead)))
}

fn hh_mm(hour: u32, minute: u32) -> Option<String> {
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(format!("{:02}:{:02}", hour, minute))
}

fn norm_hh_mm(caps: &Captures<'_>, _today: NaiveDate) -> Option<String> {
    hh_mm(cap_num(caps, 1)?, cap_num(caps, 2)?)
}

/// "a las 5 de la tarde", "la 1:30".
fn norm_clock_es(caps: &Captures<'_>, _today: NaiveDate) -> Option<String> {
    let mut hour = cap_num(caps, 1)?;
    let minute = cap_num(caps, 2).unwrap_or(0);
    if hour > 12 && caps.get(3).is_some() {
        return None;
    }
    if let Some(period) = caps.get(3) {
        let afternoon = matches!(fold(period.as_str()).as_str(), "tarde" | "noche");
        if afternoon && hour < 12 {
            hour += 12;
        }
    }
    hh_mm(hour, minute)
}

/// "5pm", "at 7:15 a.m.".
fn norm_clock_en(caps: &Captures<'_>, _today: NaiveDate) -> Option<String> {
    let mut hour = cap_num(caps, 1)?;
    let minute = cap_num(caps, 2).unwrap_or(0);
    if hour == 0 || hour > 12 {
        return None;
    }
    let pm = caps
        .get(3)
        .map(|m| m.as_str().to_ascii_lowercase().starts_with('p'))
        .unwrap_or(false);
    if pm && hour < 12 {
        hour += 12;
    } else if !pm && hour == 12 {
        hour = 0;
    }
    hh_mm(hour, minute)
}

fn norm_named_time(caps: &Captures<'_>, _today: NaiveDate) -> Option<String> {
    match caps.get(1)?.as_str().to_ascii_lowercase().as_str() {
        "noon" => Some("12:00".to_string()),
        "midnight" => Some("00:00".to_string()),
        _ => None,
    }
}

/// Title-case each word, keeping Spanish connectors lowercase.
fn norm_place(caps: &Captures<'_>, _today: NaiveDate) -> Option<String> {
    let raw = caps.get(1)?.as_str();
    let words: Vec<String> = raw
        .split_whitespace()
        .map(|w| {
            let lower = w.to_lowercase();
            if matches!(lower.as_str(), "de" | "del") {
                return lower;
            }
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    Some(words.join(" "))
}

fn norm_quantity(caps: &Captures<'_>, _today: NaiveDate) -> Option<String> {
    let number: f64 = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;
    let unit = caps.get(2)?.as_str().to_lowercase();
    Some(format!("{} {}", number, unit))
}
