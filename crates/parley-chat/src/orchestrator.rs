//! Orchestrator: runs one utterance through the whole pipeline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use parley_core::config::{OrchestratorConfig, ParleyConfig};
use parley_core::text::char_len;
use parley_core::{
    Clock, Entity, InputError, IntentResult, Language, SessionId, SystemClock, Utterance,
};
use parley_dialog::{ContextDelta, ContextManager, ConversationContext};
use parley_nlu::{
    merge_entities, BuiltinModelLoader, ClassifierFactory, IntentEngine, LanguageDetector,
    LanguageResolver, LinguisticAnalyzer, ModelLoader, StatisticalExtractor, ZeroShotFactory,
};
use parley_skills::{DispatchResult, Dispatcher, SkillRegistry, SkillRequest};
use parley_storage::{InteractionLog, InteractionRecord};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ChatError;
use crate::response;

/// What the caller gets back for one turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    pub response_text: String,
    pub language: Language,
    pub intent: IntentResult,
    pub entities: Vec<Entity>,
    /// Whether a skill produced the response.
    pub handled: bool,
    pub skill_name: Option<String>,
    /// Turns the session has completed, this one included.
    pub turn_count: u64,
    pub timed_out: bool,
}

/// The understanding and dispatch part of a turn, computed before anything
/// is committed to the context.
struct Draft {
    entities: Vec<Entity>,
    intent: IntentResult,
    dispatch: DispatchResult,
}

/// Central coordinator wiring NLU, context and skills.
pub struct Orchestrator {
    config: OrchestratorConfig,
    detector: LanguageDetector,
    resolver: LanguageResolver,
    analyzer: LinguisticAnalyzer,
    extractor: StatisticalExtractor,
    intents: IntentEngine,
    contexts: ContextManager,
    dispatcher: Dispatcher,
    log: Option<Arc<dyn InteractionLog>>,
    clock: Arc<dyn Clock>,
    /// Offset of the speaker's calendar; "hoy" and "mañana" resolve in it.
    utc_offset: FixedOffset,
}

impl Orchestrator {
    /// Pipeline with the built-in model loader and zero-shot classifier on
    /// the system clock.
    pub fn from_config(
        config: &ParleyConfig,
        registry: Arc<SkillRegistry>,
    ) -> Result<Self, ChatError> {
        Self::with_components(
            config,
            registry,
            Arc::new(BuiltinModelLoader),
            Arc::new(ZeroShotFactory::new()),
            Arc::new(SystemClock),
        )
    }

    pub fn with_components(
        config: &ParleyConfig,
        registry: Arc<SkillRegistry>,
        loader: Arc<dyn ModelLoader>,
        classifiers: Arc<dyn ClassifierFactory>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ChatError> {
        config.validate()?;

        let supported = config.language.supported_languages()?;
        let default = config.language.default_language()?;

        let mut entity_models = HashMap::new();
        let mut intent_models = HashMap::new();
        for language in &supported {
            if let Some(id) = config.nlu.entity_model(language) {
                entity_models.insert(language.clone(), id.to_string());
            }
            if let Some(id) = config.nlu.intent_model(language) {
                intent_models.insert(language.clone(), id.to_string());
            }
        }

        let labels = registry.label_set();
        debug!(labels = ?labels.names(), "Intent labels from skills");

        Ok(Self {
            config: config.orchestrator.clone(),
            detector: LanguageDetector::new(supported),
            resolver: LanguageResolver::new(config.language.confidence_floor, default),
            analyzer: LinguisticAnalyzer::new(),
            extractor: StatisticalExtractor::new(
                loader,
                entity_models,
                config.nlu.entity_confidence_floor,
            ),
            intents: IntentEngine::new(
                labels,
                config.nlu.intent_threshold,
                intent_models,
                classifiers,
            ),
            contexts: ContextManager::new(&config.context, clock.clone()),
            dispatcher: Dispatcher::new(registry),
            log: None,
            clock,
            utc_offset: Local::now().offset().fix(),
        })
    }

    /// Record every turn to `log`. Failures to record are logged and ignored.
    pub fn with_interaction_log(mut self, log: Arc<dyn InteractionLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Resolve relative dates in `offset` instead of the host's offset.
    /// Should match the offset the time and date skills answer in.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn contexts(&self) -> &ContextManager {
        &self.contexts
    }

    pub fn registry(&self) -> &SkillRegistry {
        self.dispatcher.registry()
    }

    /// Process one utterance.
    ///
    /// Only input validation errors are returned; every later failure
    /// degrades to a fallback response. The context is updated exactly once
    /// per accepted utterance, after dispatch.
    pub async fn handle(&self, session: &SessionId, text: &str) -> Result<TurnResponse, ChatError> {
        self.validate(session, text)?;
        let received_at = self.clock.now();

        let snapshot = self.contexts.get(session).await;
        let detection = self.detector.detect(text);
        let language = self
            .resolver
            .resolve(&detection, snapshot.last_language.as_ref());
        debug!(
            session = %session,
            detected = %detection.language,
            confidence = detection.confidence,
            language = %language,
            "Language resolved"
        );
        let utterance = Utterance::new(text, language, received_at);

        let budget = Duration::from_millis(self.config.turn_timeout_ms);
        let turn = self.understand_and_dispatch(&utterance, snapshot);
        let (draft, timed_out) = match tokio::time::timeout(budget, turn).await {
            Ok(draft) => (draft, false),
            Err(_) => {
                warn!(session = %session, budget_ms = self.config.turn_timeout_ms, "Turn timed out");
                let draft = Draft {
                    entities: Vec::new(),
                    intent: IntentResult::unknown(0.0, Vec::new()),
                    dispatch: DispatchResult::miss(),
                };
                (draft, true)
            }
        };

        let language = utterance.language().clone();
        let Draft {
            entities,
            intent,
            dispatch,
        } = draft;

        let (response_text, delta) = if timed_out {
            (response::timed_out(&language).to_string(), ContextDelta::new())
        } else if dispatch.handled {
            let mut delta = dispatch.delta.with_last_language(language.clone());
            if !intent.is_unknown() {
                delta = delta.with_last_intent(intent.label.clone());
            }
            (dispatch.response_text, delta)
        } else {
            (
                response::not_understood(&language).to_string(),
                ContextDelta::new(),
            )
        };

        let turn_count = match self.contexts.apply(session, delta).await {
            Ok(ctx) => ctx.turn_count,
            Err(e) => {
                debug!(session = %session, error = %e, "Turn committed without its delta");
                self.contexts
                    .snapshot(session)
                    .await
                    .map(|ctx| ctx.turn_count)
                    .unwrap_or_default()
            }
        };

        info!(
            session = %session,
            language = %language,
            intent = %intent.label,
            confidence = intent.confidence,
            skill = dispatch.skill_name.as_deref().unwrap_or("-"),
            turn = turn_count,
            "Turn complete"
        );

        let turn = TurnResponse {
            response_text,
            language,
            intent,
            entities,
            handled: dispatch.handled,
            skill_name: dispatch.skill_name,
            turn_count,
            timed_out,
        };
        self.record(session, &utterance, &turn, received_at).await;
        Ok(turn)
    }

    fn validate(&self, session: &SessionId, text: &str) -> Result<(), InputError> {
        if session.is_empty() {
            return Err(InputError::EmptySession);
        }
        if text.trim().is_empty() {
            return Err(InputError::Empty);
        }
        let max = self.config.max_utterance_chars;
        if char_len(text) > max {
            return Err(InputError::TooLong(max));
        }
        Ok(())
    }

    async fn understand_and_dispatch(
        &self,
        utterance: &Utterance,
        snapshot: ConversationContext,
    ) -> Draft {
        let text = utterance.text();
        let language = utterance.language();

        let today = utterance
            .received_at()
            .with_timezone(&self.utc_offset)
            .date_naive();

        let (analysis, statistical) = tokio::join!(
            async { self.analyzer.analyze(text, language, today) },
            self.extractor.extract(text, language),
        );

        let entities = merge_entities(analysis.entities.clone(), statistical, char_len(text));
        let intent = self.intents.classify(&analysis, language).await;
        debug!(
            intent = %intent.label,
            confidence = intent.confidence,
            entities = entities.len(),
            "Utterance understood"
        );

        let request = SkillRequest {
            text: text.to_string(),
            language: language.clone(),
            entities: entities.clone(),
            intent: intent.clone(),
            context: snapshot,
            received_at: utterance.received_at(),
        };
        let dispatch = self.dispatcher.dispatch(&request).await;

        Draft {
            entities,
            intent,
            dispatch,
        }
    }

    async fn record(
        &self,
        session: &SessionId,
        utterance: &Utterance,
        turn: &TurnResponse,
        at: DateTime<Utc>,
    ) {
        let Some(log) = &self.log else {
            return;
        };
        let record = InteractionRecord {
            id: Uuid::new_v4(),
            session_id: session.clone(),
            utterance: utterance.text().to_string(),
            language: turn.language.code().to_string(),
            intent: turn.intent.label.clone(),
            intent_confidence: turn.intent.confidence,
            entities: turn.entities.clone(),
            skill: turn.skill_name.clone(),
            response: turn.response_text.clone(),
            timestamp: at,
        };
        if let Err(e) = log.record(record).await {
            warn!(session = %session, error = %e, "Failed to record interaction");
        }
    }
}
