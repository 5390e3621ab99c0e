//! Word lists and normalization shared by the analyzer, detector and
//! classifier.

use parley_core::Language;

/// Lowercase `word` and strip diacritics so "Qué" and "que" compare equal.
pub fn fold(word: &str) -> String {
    word.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Light suffix-stripping lemmatizer over a folded word.
///
/// Only plural endings are removed; anything else is returned unchanged.
pub fn lemmatize(folded: &str, lang: &Language) -> String {
    let len = folded.chars().count();
    match lang.code() {
        "es" | "pt" => {
            if len > 5 && folded.ends_with("es") {
                let stem = &folded[..folded.len() - 2];
                if stem.ends_with(['d', 'l', 'n', 'r', 'z']) {
                    return stem.to_string();
                }
            }
            if len > 4 && folded.ends_with('s') {
                let stem = &folded[..folded.len() - 1];
                if stem.ends_with(['a', 'e', 'o']) {
                    return stem.to_string();
                }
            }
            folded.to_string()
        }
        "en" => {
            if len > 4 && folded.ends_with("ies") {
                return format!("{}y", &folded[..folded.len() - 3]);
            }
            if len > 3
                && folded.ends_with('s')
                && !folded.ends_with("ss")
                && !folded.ends_with("us")
                && !folded.ends_with("is")
            {
                return folded[..folded.len() - 1].to_string();
            }
            folded.to_string()
        }
        _ => folded.to_string(),
    }
}

/// Closed-class words (articles, prepositions, pronouns, auxiliaries),
/// already folded.
pub fn function_words(lang: &Language) -> &'static [&'static str] {
    match lang.code() {
        "es" => ES_FUNCTION,
        "en" => EN_FUNCTION,
        "fr" => FR_FUNCTION,
        "pt" => PT_FUNCTION,
        _ => &[],
    }
}

pub fn is_function_word(folded: &str, lang: &Language) -> bool {
    function_words(lang).contains(&folded)
}

const ES_FUNCTION: &[&str] = &[
    "el", "la", "los", "las", "un", "una", "unos", "unas", "de", "del", "a", "al", "en", "con",
    "por", "para", "sin", "sobre", "y", "o", "que", "como", "me", "te", "se", "mi", "tu", "su",
    "lo", "le", "les", "es", "son", "esta", "este", "esto", "hay", "muy", "mas", "pero", "yo",
    "ella", "ellos", "nos", "cual", "cuando", "donde",
];

const EN_FUNCTION: &[&str] = &[
    "the", "a", "an", "of", "in", "on", "at", "to", "for", "with", "by", "from", "and", "or",
    "is", "are", "was", "be", "it", "its", "me", "my", "you", "your", "i", "we", "they", "he",
    "she", "what", "which", "that", "this", "do", "does", "please", "can", "could", "will",
    "would", "how", "when", "where",
];

const FR_FUNCTION: &[&str] = &[
    "le", "la", "les", "un", "une", "des", "de", "du", "en", "dans", "avec", "pour", "sur", "et",
    "ou", "est", "je", "tu", "il", "elle", "nous", "vous", "ils", "ce", "que", "qui", "quel",
    "quelle", "ne", "pas", "au", "aux",
];

const PT_FUNCTION: &[&str] = &[
    "o", "a", "os", "as", "um", "uma", "de", "do", "da", "dos", "das", "em", "no", "na", "com",
    "por", "para", "e", "ou", "que", "eu", "voce", "ele", "ela", "nos", "me", "meu", "minha",
    "esta", "isso", "qual", "nao",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_strips_accents_and_case() {
        assert_eq!(fold("Qué"), "que");
        assert_eq!(fold("RECUÉRDAME"), "recuerdame");
        assert_eq!(fold("Panamá"), "panama");
        assert_eq!(fold("français"), "francais");
    }

    #[test]
    fn test_lemmatize_spanish_plurals() {
        let es = Language::es();
        assert_eq!(lemmatize("ciudades", &es), "ciudad");
        assert_eq!(lemmatize("horas", &es), "hora");
        assert_eq!(lemmatize("tiempo", &es), "tiempo");
        assert_eq!(lemmatize("es", &es), "es");
        assert_eq!(lemmatize("mes", &es), "mes");
    }

    #[test]
    fn test_lemmatize_english_plurals() {
        let en = Language::en();
        assert_eq!(lemmatize("reminders", &en), "reminder");
        assert_eq!(lemmatize("cities", &en), "city");
        assert_eq!(lemmatize("is", &en), "is");
        assert_eq!(lemmatize("glass", &en), "glass");
    }

    #[test]
    fn test_function_words() {
        assert!(is_function_word("en", &Language::es()));
        assert!(is_function_word("the", &Language::en()));
        assert!(!is_function_word("tiempo", &Language::es()));
        assert!(!is_function_word("el", &Language::new("de").unwrap()));
    }
}
