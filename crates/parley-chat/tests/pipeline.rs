//! End-to-end turns through the orchestrator with the built-in skills.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, FixedOffset, TimeZone, Utc};
use parley_chat::response::{not_understood, timed_out};
use parley_chat::{ChatError, Orchestrator};
use parley_core::{
    EntityLabel, EntitySource, InputError, Language, ManualClock, ParleyConfig, ParleyError,
    SessionId,
};
use parley_nlu::{BuiltinModelLoader, IntentLabel, ZeroShotFactory};
use parley_skills::{
    OfflineForecast, Skill, SkillDescriptor, SkillError, SkillFactory, SkillOutcome,
    SkillRegistry, SkillRequest,
};
use parley_storage::{Database, InteractionLog, InteractionRecord, SkillCount, SqliteInteractionLog};

// =============================================================================
// Fixtures
// =============================================================================

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap(),
    ))
}

fn factory() -> SkillFactory {
    SkillFactory::new(Arc::new(OfflineForecast)).with_offset(FixedOffset::east_opt(0).unwrap())
}

fn registry_with(extra_first: Vec<Arc<dyn Skill>>) -> Arc<SkillRegistry> {
    let mut registry = SkillRegistry::new();
    for skill in extra_first {
        registry.register(skill).unwrap();
    }
    for skill in factory().builtin_set().unwrap() {
        registry.register(skill).unwrap();
    }
    Arc::new(registry)
}

fn orchestrator(
    config: &ParleyConfig,
    registry: Arc<SkillRegistry>,
    clock: Arc<ManualClock>,
) -> Orchestrator {
    Orchestrator::with_components(
        config,
        registry,
        Arc::new(BuiltinModelLoader),
        Arc::new(ZeroShotFactory::new()),
        clock,
    )
    .unwrap()
    .with_utc_offset(FixedOffset::east_opt(0).unwrap())
}

fn default_orchestrator() -> Orchestrator {
    orchestrator(&ParleyConfig::default(), registry_with(vec![]), clock())
}

enum Behaviour {
    Panic,
    Fail,
    Sleep,
}

/// A skill that claims weather questions and then misbehaves.
struct Misbehaving {
    descriptor: SkillDescriptor,
    behaviour: Behaviour,
}

impl Misbehaving {
    fn new(name: &str, behaviour: Behaviour) -> Arc<dyn Skill> {
        Arc::new(Self {
            descriptor: SkillDescriptor::new(name).intent(
                IntentLabel::new("get_weather")
                    .keyword("es", "tiempo")
                    .keyword("en", "weather"),
            ),
            behaviour,
        })
    }
}

#[async_trait]
impl Skill for Misbehaving {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn can_handle(&self, request: &SkillRequest) -> Result<bool, SkillError> {
        Ok(self.descriptor.declares(&request.intent.label))
    }

    async fn handle(&self, _request: &SkillRequest) -> Result<SkillOutcome, SkillError> {
        match self.behaviour {
            Behaviour::Panic => panic!("skill blew up"),
            Behaviour::Fail => Err(SkillError::failed(self.name(), "service unavailable")),
            Behaviour::Sleep => {
                tokio::time::sleep(StdDuration::from_secs(10)).await;
                Ok(SkillOutcome::reply("too late"))
            }
        }
    }
}

/// Answers any turn the classifier could not place.
struct CatchAll {
    descriptor: SkillDescriptor,
}

#[async_trait]
impl Skill for CatchAll {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    fn can_handle(&self, request: &SkillRequest) -> Result<bool, SkillError> {
        Ok(request.intent.is_unknown())
    }

    async fn handle(&self, _request: &SkillRequest) -> Result<SkillOutcome, SkillError> {
        Ok(SkillOutcome::reply("noted"))
    }
}

// =============================================================================
// Understanding and dispatch
// =============================================================================

#[tokio::test]
async fn test_weather_in_madrid() {
    let orch = default_orchestrator();
    let session = SessionId::new("madrid");

    let turn = orch.handle(&session, "qué tiempo hace en Madrid").await.unwrap();

    assert_eq!(turn.language, Language::es());
    assert_eq!(turn.intent.label, "get_weather");
    assert_eq!(turn.intent.alternates[0].label, "get_weather");
    let locations: Vec<_> = turn
        .entities
        .iter()
        .filter(|e| e.label == EntityLabel::Location)
        .collect();
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].value, "Madrid");
    assert!(turn.handled);
    assert_eq!(turn.skill_name.as_deref(), Some("weather"));
    assert!(turn.response_text.contains("Madrid"));
    assert_eq!(turn.turn_count, 1);

    let ctx = orch.contexts().get(&session).await;
    assert_eq!(ctx.last_intent.as_deref(), Some("get_weather"));
    assert_eq!(ctx.last_language, Some(Language::es()));
}

#[tokio::test]
async fn test_weather_in_english() {
    let orch = default_orchestrator();
    let turn = orch
        .handle(&SessionId::new("en"), "what is the weather in London")
        .await
        .unwrap();
    assert_eq!(turn.language, Language::en());
    assert_eq!(turn.skill_name.as_deref(), Some("weather"));
    assert_eq!(
        turn.response_text,
        "I don't have a weather service configured, so I can't check the weather in London."
    );
}

#[tokio::test]
async fn test_rule_date_wins_over_statistical_date() {
    let orch = default_orchestrator();
    let text = "recuérdame llamar a mamá el 3 de mayo";
    let turn = orch.handle(&SessionId::new("date"), text).await.unwrap();

    let dates: Vec<_> = turn
        .entities
        .iter()
        .filter(|e| e.label == EntityLabel::Date)
        .collect();
    assert_eq!(dates.len(), 1);
    assert_eq!(dates[0].source, EntitySource::Rule);
    assert_eq!(dates[0].text, "3 de mayo");
    assert_eq!(dates[0].value, "2026-05-03");

    let len = text.chars().count();
    for pair in turn.entities.windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }
    assert!(turn.entities.iter().all(|e| e.is_within(len)));

    assert_eq!(turn.skill_name.as_deref(), Some("reminder"));
    assert_eq!(
        turn.response_text,
        "Listo, te recordaré llamar a mamá el 3 de mayo de 2026."
    );
}

#[tokio::test]
async fn test_relative_dates_follow_the_local_calendar() {
    // 03:30 UTC on Saturday is still Friday evening at UTC-5.
    let offset = FixedOffset::west_opt(5 * 3600).unwrap();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 5, 2, 3, 30, 0).unwrap(),
    ));
    let mut registry = SkillRegistry::new();
    let local = SkillFactory::new(Arc::new(OfflineForecast)).with_offset(offset);
    for skill in local.builtin_set().unwrap() {
        registry.register(skill).unwrap();
    }
    let orch = orchestrator(&ParleyConfig::default(), Arc::new(registry), clock)
        .with_utc_offset(offset);

    let today = orch
        .handle(&SessionId::new("tz-date"), "qué fecha es hoy")
        .await
        .unwrap();
    assert_eq!(today.skill_name.as_deref(), Some("date"));
    assert_eq!(today.response_text, "Hoy es viernes, 1 de mayo de 2026.");

    let reminder = orch
        .handle(&SessionId::new("tz-reminder"), "recuérdame llamar a mamá mañana")
        .await
        .unwrap();
    let tomorrow = reminder
        .entities
        .iter()
        .find(|e| e.label == EntityLabel::Date)
        .unwrap();
    assert_eq!(tomorrow.value, "2026-05-02");
    assert_eq!(
        reminder.response_text,
        "Listo, te recordaré llamar a mamá el 2 de mayo de 2026."
    );
}

#[tokio::test]
async fn test_city_follow_up_across_turns() {
    let orch = default_orchestrator();
    let session = SessionId::new("follow-up");

    let first = orch.handle(&session, "qué tiempo hace").await.unwrap();
    assert_eq!(first.response_text, "¿Para qué ciudad te gustaría saber el clima?");
    let ctx = orch.contexts().get(&session).await;
    assert!(ctx.is_awaiting("city"));

    let second = orch.handle(&session, "Lima").await.unwrap();
    assert!(second.intent.is_unknown());
    assert_eq!(second.skill_name.as_deref(), Some("weather"));
    assert!(second.response_text.contains("Lima"));

    let ctx = orch.contexts().get(&session).await;
    assert!(ctx.pending_slots.is_empty());
    assert_eq!(ctx.last_intent.as_deref(), Some("get_weather"));
    assert_eq!(ctx.turn_count, 2);
}

#[tokio::test]
async fn test_handled_unknown_turn_updates_language_only() {
    let catch_all: Arc<dyn Skill> = Arc::new(CatchAll {
        descriptor: SkillDescriptor::new("catch-all"),
    });
    let orch = orchestrator(&ParleyConfig::default(), registry_with(vec![catch_all]), clock());
    let session = SessionId::new("switch");

    let first = orch
        .handle(&session, "what is the weather in London")
        .await
        .unwrap();
    assert_eq!(first.skill_name.as_deref(), Some("weather"));

    let second = orch
        .handle(&session, "mi perro juega en el parque con los niños")
        .await
        .unwrap();
    assert!(second.intent.is_unknown());
    assert_eq!(second.language, Language::es());
    assert_eq!(second.skill_name.as_deref(), Some("catch-all"));

    let ctx = orch.contexts().get(&session).await;
    assert_eq!(ctx.last_language, Some(Language::es()));
    assert_eq!(ctx.last_intent.as_deref(), Some("get_weather"));
}

#[tokio::test]
async fn test_dispatch_is_deterministic() {
    let orch = default_orchestrator();
    let mut seen = Vec::new();
    for i in 0..5 {
        let session = SessionId::new(format!("det-{}", i));
        let turn = orch.handle(&session, "qué hora es").await.unwrap();
        seen.push((turn.skill_name, turn.response_text));
    }
    assert_eq!(seen[0].0.as_deref(), Some("time"));
    assert!(seen.windows(2).all(|w| w[0] == w[1]));
}

// =============================================================================
// Fallbacks and context bookkeeping
// =============================================================================

#[tokio::test]
async fn test_not_understood_turns_only_advance_the_count() {
    let orch = default_orchestrator();
    let session = SessionId::new("lost");

    let known = orch.handle(&session, "qué hora es").await.unwrap();
    assert_eq!(known.skill_name.as_deref(), Some("time"));

    for n in 1..=3u64 {
        let turn = orch.handle(&session, "zzz qqq").await.unwrap();
        assert!(!turn.handled);
        assert!(turn.intent.is_unknown());
        assert_eq!(turn.response_text, not_understood(&Language::es()));
        assert_eq!(turn.turn_count, 1 + n);
    }

    let ctx = orch.contexts().get(&session).await;
    assert_eq!(ctx.turn_count, 4);
    assert_eq!(ctx.last_intent.as_deref(), Some("get_time"));
}

#[tokio::test]
async fn test_fresh_session_not_understood_count() {
    let orch = default_orchestrator();
    let session = SessionId::new("fresh");
    for _ in 0..4 {
        orch.handle(&session, "zzz qqq").await.unwrap();
    }
    let ctx = orch.contexts().get(&session).await;
    assert_eq!(ctx.turn_count, 4);
    assert_eq!(ctx.last_intent, None);
}

#[tokio::test]
async fn test_unhandled_turn_changes_only_bookkeeping() {
    let clock = clock();
    let orch = orchestrator(&ParleyConfig::default(), registry_with(vec![]), clock.clone());
    let session = SessionId::new("bookkeeping");

    orch.handle(&session, "qué tiempo hace").await.unwrap();
    let before = orch.contexts().get(&session).await;

    clock.advance(Duration::seconds(5));
    orch.handle(&session, "zzz qqq").await.unwrap();
    let after = orch.contexts().get(&session).await;

    assert_eq!(after.turn_count, before.turn_count + 1);
    assert!(after.last_updated_at > before.last_updated_at);
    assert_eq!(after.pending_slots, before.pending_slots);
    assert_eq!(after.extra, before.extra);
    assert_eq!(after.last_intent, before.last_intent);
    assert_eq!(after.last_language, before.last_language);
    assert_eq!(after.created_at, before.created_at);
}

#[tokio::test]
async fn test_idle_session_expires() {
    let clock = clock();
    let orch = orchestrator(&ParleyConfig::default(), registry_with(vec![]), clock.clone());
    let session = SessionId::new("idle");

    orch.handle(&session, "qué tiempo hace").await.unwrap();
    assert!(orch.contexts().get(&session).await.is_awaiting("city"));

    clock.advance(Duration::seconds(301));
    let ctx = orch.contexts().get(&session).await;
    assert_eq!(ctx.turn_count, 0);
    assert!(ctx.pending_slots.is_empty());
    assert_eq!(ctx.last_intent, None);

    // A LOCATION alone no longer completes the stale weather question.
    let turn = orch.handle(&session, "Lima").await.unwrap();
    assert!(!turn.handled);
    assert_eq!(turn.turn_count, 1);
}

// =============================================================================
// Faulty skills
// =============================================================================

#[tokio::test]
async fn test_panicking_skill_falls_through() {
    let registry = registry_with(vec![Misbehaving::new("unstable", Behaviour::Panic)]);
    let orch = orchestrator(&ParleyConfig::default(), registry, clock());

    let turn = orch
        .handle(&SessionId::new("panic"), "qué tiempo hace en Madrid")
        .await
        .unwrap();
    assert!(turn.handled);
    assert_eq!(turn.skill_name.as_deref(), Some("weather"));
    assert_eq!(turn.turn_count, 1);
}

#[tokio::test]
async fn test_failing_skill_never_aborts_the_turn() {
    let mut registry = SkillRegistry::new();
    registry
        .register(Misbehaving::new("flaky", Behaviour::Fail))
        .unwrap();
    let orch = orchestrator(&ParleyConfig::default(), Arc::new(registry), clock());
    let session = SessionId::new("fail");

    let turn = orch.handle(&session, "qué tiempo hace en Madrid").await.unwrap();
    assert_eq!(turn.intent.label, "get_weather");
    assert!(!turn.handled);
    assert_eq!(turn.response_text, not_understood(&Language::es()));

    let ctx = orch.contexts().get(&session).await;
    assert_eq!(ctx.turn_count, 1);
    assert_eq!(ctx.last_intent, None);
}

#[tokio::test]
async fn test_slow_turn_times_out_without_partial_delta() {
    let mut config = ParleyConfig::default();
    config.orchestrator.turn_timeout_ms = 50;
    let registry = registry_with(vec![Misbehaving::new("slow", Behaviour::Sleep)]);
    let orch = orchestrator(&config, registry, clock());
    let session = SessionId::new("slow");

    let turn = orch.handle(&session, "qué tiempo hace en Madrid").await.unwrap();
    assert!(turn.timed_out);
    assert!(!turn.handled);
    assert_eq!(turn.response_text, timed_out(&Language::es()));

    let ctx = orch.contexts().get(&session).await;
    assert_eq!(ctx.turn_count, 1);
    assert_eq!(ctx.last_intent, None);
    assert!(ctx.pending_slots.is_empty());
}

// =============================================================================
// Input validation
// =============================================================================

#[tokio::test]
async fn test_input_errors_are_surfaced() {
    let orch = default_orchestrator();
    let session = SessionId::new("input");

    let err = orch.handle(&session, "   ").await.unwrap_err();
    assert!(matches!(err, ChatError::Input(InputError::Empty)));

    let long = "a".repeat(501);
    let err = orch.handle(&session, &long).await.unwrap_err();
    assert!(matches!(err, ChatError::Input(InputError::TooLong(500))));

    let err = orch.handle(&SessionId::new(" "), "hola").await.unwrap_err();
    assert!(matches!(err, ChatError::Input(InputError::EmptySession)));

    let parley: ParleyError = err.into();
    assert!(matches!(parley, ParleyError::Input(_)));
    assert_eq!(orch.contexts().session_count(), 0);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = ParleyConfig::default();
    config.nlu.intent_threshold = 1.5;
    let result = Orchestrator::from_config(&config, registry_with(vec![]));
    assert!(matches!(result, Err(ChatError::Setup(_))));
}

// =============================================================================
// Interaction log
// =============================================================================

#[tokio::test]
async fn test_turns_are_recorded() {
    let log = Arc::new(SqliteInteractionLog::new(Arc::new(Database::in_memory().unwrap())));
    let orch = default_orchestrator().with_interaction_log(log.clone());
    let session = SessionId::new("logged");

    orch.handle(&session, "qué tiempo hace en Madrid").await.unwrap();
    orch.handle(&session, "zzz qqq").await.unwrap();

    let recent = log.recent(&session, 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[1].utterance, "qué tiempo hace en Madrid");
    assert_eq!(recent[1].skill.as_deref(), Some("weather"));
    assert_eq!(recent[1].intent, "get_weather");
    assert_eq!(recent[0].skill, None);
    assert_eq!(recent[0].intent, "unknown");

    assert_eq!(
        log.skill_counts().await.unwrap(),
        vec![SkillCount {
            skill: "weather".to_string(),
            turns: 1
        }]
    );
}

struct BrokenLog;

#[async_trait]
impl InteractionLog for BrokenLog {
    async fn record(&self, _record: InteractionRecord) -> Result<(), ParleyError> {
        Err(ParleyError::Storage("disk full".to_string()))
    }

    async fn recent(
        &self,
        _session: &SessionId,
        _limit: usize,
    ) -> Result<Vec<InteractionRecord>, ParleyError> {
        Ok(Vec::new())
    }

    async fn skill_counts(&self) -> Result<Vec<SkillCount>, ParleyError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_failing_log_does_not_break_turns() {
    let orch = default_orchestrator().with_interaction_log(Arc::new(BrokenLog));
    let turn = orch
        .handle(&SessionId::new("broken-log"), "qué hora es")
        .await
        .unwrap();
    assert!(turn.handled);
}
