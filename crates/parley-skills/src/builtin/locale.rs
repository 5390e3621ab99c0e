//! Localized wording shared by the built-in skills.

use chrono::{Datelike, NaiveDate, Weekday};
use parley_core::Language;

/// Pick the Spanish or English variant; other languages get English.
pub fn pick<'a>(language: &Language, es: &'a str, en: &'a str) -> &'a str {
    if language.code() == "es" {
        es
    } else {
        en
    }
}

pub fn weekday_name(language: &Language, day: Weekday) -> &'static str {
    let (es, en) = match day {
        Weekday::Mon => ("lunes", "Monday"),
        Weekday::Tue => ("martes", "Tuesday"),
        Weekday::Wed => ("miércoles", "Wednesday"),
        Weekday::Thu => ("jueves", "Thursday"),
        Weekday::Fri => ("viernes", "Friday"),
        Weekday::Sat => ("sábado", "Saturday"),
        Weekday::Sun => ("domingo", "Sunday"),
    };
    pick(language, es, en)
}

const ES_MONTHS: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto", "septiembre",
    "octubre", "noviembre", "diciembre",
];
const EN_MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

pub fn month_name(language: &Language, month: u32) -> &'static str {
    let idx = (month.clamp(1, 12) - 1) as usize;
    if language.code() == "es" {
        ES_MONTHS[idx]
    } else {
        EN_MONTHS[idx]
    }
}

/// "1 de mayo de 2026" or "May 1, 2026".
pub fn long_date(language: &Language, date: NaiveDate) -> String {
    let month = month_name(language, date.month());
    if language.code() == "es" {
        format!("{} de {} de {}", date.day(), month, date.year())
    } else {
        format!("{} {}, {}", month, date.day(), date.year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_date() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 3).unwrap();
        assert_eq!(long_date(&Language::es(), date), "3 de mayo de 2026");
        assert_eq!(long_date(&Language::en(), date), "May 3, 2026");
    }

    #[test]
    fn test_pick_defaults_to_english() {
        let fr = Language::new("fr").unwrap();
        assert_eq!(pick(&fr, "hola", "hello"), "hello");
        assert_eq!(pick(&Language::es(), "hola", "hello"), "hola");
    }

    #[test]
    fn test_weekday_name() {
        assert_eq!(weekday_name(&Language::es(), Weekday::Wed), "miércoles");
        assert_eq!(weekday_name(&Language::en(), Weekday::Sun), "Sunday");
    }
}
