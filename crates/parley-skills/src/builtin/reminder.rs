//! Reminders, filled over as many turns as it takes.
//!
//! The task and the time are kept in the `reminder.task` and `reminder.when`
//! slots until both are known. Completed reminders are appended to the
//! `reminders` list in the context's extra data.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use parley_core::{EntityLabel, Language};
use parley_dialog::ContextDelta;
use parley_nlu::IntentLabel;
use regex::Regex;
use serde_json::{json, Value};

use super::locale::{long_date, pick};
use crate::error::SkillError;
use crate::skill::{Skill, SkillDescriptor, SkillOutcome, SkillRequest};

pub const INTENT: &str = "set_reminder";
pub const TASK_SLOT: &str = "reminder.task";
pub const WHEN_SLOT: &str = "reminder.when";
pub const REMINDERS_KEY: &str = "reminders";

static ES_TRIGGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:por favor,?\s+)?(?:recu[eé]rdame|recordarme|(?:pon(?:me)?|crea|añade) un recordatorio(?:\s+para)?)\s*(?:que\s+|de\s+)?",
    )
    .expect("Invalid Spanish reminder regex")
});

static EN_TRIGGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:please\s+)?(?:remind me|(?:set|create|add) a reminder)(?:\s+to)?\s*")
        .expect("Invalid English reminder regex")
});

const CONNECTORS: &[&str] = &[
    "el", "la", "las", "a", "al", "para", "en", "de", "que", "y", "on", "at", "to", "in", "for",
    "by", "and", "the",
];

pub fn descriptor() -> SkillDescriptor {
    SkillDescriptor::new("reminder")
        .description("Stores reminders")
        .capability("entity:DATE")
        .capability("entity:TIME")
        .intent(
            IntentLabel::new(INTENT)
                .keyword("es", "recuérdame")
                .keyword("es", "recordatorio")
                .keyword("es", "recordar")
                .keyword("en", "remind")
                .keyword("en", "reminder")
                .example("es", "recuérdame llamar a mamá mañana")
                .example("es", "pon un recordatorio para el lunes")
                .example("en", "remind me to call mom tomorrow")
                .example("en", "set a reminder for monday"),
        )
}

pub struct ReminderSkill {
    descriptor: SkillDescriptor,
}

impl ReminderSkill {
    pub fn new(descriptor: SkillDescriptor) -> Self {
        Self { descriptor }
    }
}

/// A reminder time assembled from DATE and TIME values.
#[derive(Debug, Default, Clone, PartialEq)]
struct When {
    date: Option<String>,
    time: Option<String>,
}

impl When {
    fn from_request(request: &SkillRequest) -> Self {
        Self {
            date: request
                .first_entity(EntityLabel::Date)
                .map(|e| e.value.clone()),
            time: request
                .first_entity(EntityLabel::Time)
                .map(|e| e.value.clone()),
        }
    }

    /// Parse the slot form written by [`When::to_slot`].
    fn from_slot(slot: &str) -> Self {
        let mut when = When::default();
        for part in slot.split_whitespace() {
            if part.contains(':') {
                when.time = Some(part.to_string());
            } else {
                when.date = Some(part.to_string());
            }
        }
        when
    }

    fn to_slot(&self) -> String {
        [self.date.as_deref(), self.time.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn is_empty(&self) -> bool {
        self.date.is_none() && self.time.is_none()
    }

    fn describe(&self, language: &Language) -> String {
        let date = self.date.as_deref().map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map(|parsed| long_date(language, parsed))
                .unwrap_or_else(|_| d.to_string())
        });
        let es = language.code() == "es";
        match (date, self.time.as_deref()) {
            (Some(d), Some(t)) if es => format!("el {} a las {}", d, t),
            (Some(d), Some(t)) => format!("on {} at {}", d, t),
            (Some(d), None) if es => format!("el {}", d),
            (Some(d), None) => format!("on {}", d),
            (None, Some(t)) if es => format!("a las {}", t),
            (None, Some(t)) => format!("at {}", t),
            (None, None) => String::new(),
        }
    }
}

/// The reminder task: the utterance minus trigger words and time spans.
fn extract_task(request: &SkillRequest) -> Option<String> {
    let mut remaining = String::new();
    for (i, c) in request.text.chars().enumerate() {
        let in_time_span = request.entities.iter().any(|e| {
            matches!(e.label, EntityLabel::Date | EntityLabel::Time) && e.start <= i && i < e.end
        });
        remaining.push(if in_time_span { ' ' } else { c });
    }

    let trigger: &Regex = if request.language.code() == "es" {
        &ES_TRIGGER
    } else {
        &EN_TRIGGER
    };
    let stripped = trigger.replace(&remaining, "");

    let mut words: Vec<&str> = stripped
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| matches!(c, '.' | ',' | '!' | '?' | '¿' | '¡')))
        .filter(|w| !w.is_empty())
        .collect();
    while words
        .last()
        .is_some_and(|w| CONNECTORS.contains(&w.to_lowercase().as_str()))
    {
        words.pop();
    }
    while words
        .first()
        .is_some_and(|w| CONNECTORS.contains(&w.to_lowercase().as_str()))
    {
        words.remove(0);
    }

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

#[async_trait]
impl Skill for ReminderSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn can_handle(&self, request: &SkillRequest) -> Result<bool, SkillError> {
        if self.descriptor.declares(&request.intent.label) {
            return Ok(true);
        }
        if !request.intent.is_unknown() {
            return Ok(false);
        }
        let ctx = &request.context;
        let claims = (ctx.is_awaiting(WHEN_SLOT) && !When::from_request(request).is_empty())
            || (ctx.is_awaiting(TASK_SLOT) && extract_task(request).is_some());
        Ok(claims)
    }

    async fn handle(&self, request: &SkillRequest) -> Result<SkillOutcome, SkillError> {
        let lang = &request.language;
        let ctx = &request.context;

        let task = extract_task(request)
            .filter(|_| !ctx.is_awaiting(WHEN_SLOT) || ctx.is_awaiting(TASK_SLOT))
            .or_else(|| ctx.slot(TASK_SLOT).filter(|s| !s.is_empty()).map(str::to_string));
        let mut when = When::from_request(request);
        if when.is_empty() {
            if let Some(slot) = ctx.slot(WHEN_SLOT).filter(|s| !s.is_empty()) {
                when = When::from_slot(slot);
            }
        }

        let Some(task) = task else {
            let mut delta = ContextDelta::new().await_slot(TASK_SLOT);
            if !when.is_empty() {
                delta = delta.set_slot(WHEN_SLOT, when.to_slot());
            }
            let ask = pick(
                lang,
                "¿Qué quieres que te recuerde?",
                "What would you like me to remind you about?",
            );
            return Ok(SkillOutcome::new(ask, delta));
        };

        if when.is_empty() {
            let ask = pick(
                lang,
                "¿Cuándo quieres que te lo recuerde?",
                "When should I remind you?",
            );
            let delta = ContextDelta::new()
                .set_slot(TASK_SLOT, task)
                .await_slot(WHEN_SLOT);
            return Ok(SkillOutcome::new(ask, delta));
        }

        let mut reminders = match ctx.extra.get(REMINDERS_KEY) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        reminders.push(json!({
            "task": task,
            "date": when.date,
            "time": when.time,
            "created_at": request.received_at.to_rfc3339(),
        }));

        let mut delta = ContextDelta::new().set_extra(REMINDERS_KEY, Value::Array(reminders));
        for slot in [TASK_SLOT, WHEN_SLOT] {
            if ctx.slot(slot).is_some() {
                delta = delta.clear_slot(slot);
            }
        }

        let response = if lang.code() == "es" {
            format!("Listo, te recordaré {} {}.", task, when.describe(lang))
        } else {
            format!("Done, I'll remind you to {} {}.", task, when.describe(lang))
        };
        Ok(SkillOutcome::new(response, delta))
    }
}
