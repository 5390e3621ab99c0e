//! Conversation context management.
//!
//! Each session owns one [`ConversationContext`] behind its own async mutex,
//! so turns on one session serialize while different sessions never wait on
//! each other. The outer map lock is only held to look up or insert a
//! session's handle.
//!
//! Expiry is lazy: a context idle longer than the configured duration is
//! replaced by a fresh `NEW` context the next time it is touched.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use parley_core::config::ContextConfig;
use parley_core::{Clock, Language, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::error::DialogError;

/// Key names that would shadow context fields.
const RESERVED_KEYS: &[&str] = &[
    "session_id",
    "state",
    "last_intent",
    "last_language",
    "turn_count",
    "created_at",
    "last_updated_at",
];

// =============================================================================
// Types
// =============================================================================

/// Lifecycle state of a context. Expired contexts are never observed: they
/// are replaced by a `New` one on access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContextState {
    New,
    Active,
}

/// Conversational state for one session.
///
/// Skills only ever see a copy; changes go back through a [`ContextDelta`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub session_id: SessionId,
    pub state: ContextState,
    pub last_intent: Option<String>,
    pub last_language: Option<Language>,
    /// Slot name to value. An empty value means the slot was asked for and
    /// is still unfilled.
    pub pending_slots: BTreeMap<String, String>,
    /// Opaque skill-owned data.
    pub extra: BTreeMap<String, Value>,
    pub turn_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl ConversationContext {
    pub fn new(session_id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            state: ContextState::New,
            last_intent: None,
            last_language: None,
            pending_slots: BTreeMap::new(),
            extra: BTreeMap::new(),
            turn_count: 0,
            created_at: now,
            last_updated_at: now,
        }
    }

    pub fn slot(&self, name: &str) -> Option<&str> {
        self.pending_slots.get(name).map(String::as_str)
    }

    /// Whether `name` was asked for and has no value yet.
    pub fn is_awaiting(&self, name: &str) -> bool {
        self.slot(name).is_some_and(str::is_empty)
    }
}

/// Changes a skill (or the orchestrator) wants applied to a context.
///
/// Keys present in the delta overwrite, absent keys persist, and a `None`
/// value removes the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextDelta {
    pub last_intent: Option<String>,
    pub last_language: Option<Language>,
    pub pending_slots: BTreeMap<String, Option<String>>,
    pub extra: BTreeMap<String, Option<Value>>,
    /// Drop intent, language, slots and extra before applying the rest.
    pub reset: bool,
}

impl ContextDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_last_intent(mut self, intent: impl Into<String>) -> Self {
        self.last_intent = Some(intent.into());
        self
    }

    pub fn with_last_language(mut self, language: Language) -> Self {
        self.last_language = Some(language);
        self
    }

    pub fn set_slot(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.pending_slots.insert(name.into(), Some(value.into()));
        self
    }

    /// Mark `name` as asked for and unfilled.
    pub fn await_slot(self, name: impl Into<String>) -> Self {
        self.set_slot(name, "")
    }

    pub fn clear_slot(mut self, name: impl Into<String>) -> Self {
        self.pending_slots.insert(name.into(), None);
        self
    }

    pub fn set_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), Some(value));
        self
    }

    pub fn clear_extra(mut self, key: impl Into<String>) -> Self {
        self.extra.insert(key.into(), None);
        self
    }

    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.last_intent.is_none()
            && self.last_language.is_none()
            && self.pending_slots.is_empty()
            && self.extra.is_empty()
            && !self.reset
    }
}

// =============================================================================
// ContextManager
// =============================================================================

type SessionHandle = Arc<AsyncMutex<ConversationContext>>;

/// Owner of every session's context.
pub struct ContextManager {
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
    clock: Arc<dyn Clock>,
    idle_expiry: Duration,
    max_pending_slots: usize,
    max_extra_entries: usize,
}

impl ContextManager {
    pub fn new(config: &ContextConfig, clock: Arc<dyn Clock>) -> Self {
        let idle_expiry = i64::try_from(config.idle_expiry_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self {
            sessions: Mutex::new(HashMap::new()),
            clock,
            idle_expiry,
            max_pending_slots: config.max_pending_slots,
            max_extra_entries: config.max_extra_entries,
        }
    }

    /// Copy of the session's context, creating a `NEW` one if the session is
    /// unknown or expired.
    pub async fn get(&self, session: &SessionId) -> ConversationContext {
        let handle = self.handle(session);
        let mut ctx = handle.lock().await;
        self.expire_if_idle(&mut ctx);
        ctx.clone()
    }

    /// Merge `delta` and advance the turn.
    ///
    /// The turn always advances. An invalid delta is rejected as a whole,
    /// leaving every other field as it was, and reported as
    /// [`DialogError::ContextCorruption`].
    pub async fn apply(
        &self,
        session: &SessionId,
        delta: ContextDelta,
    ) -> Result<ConversationContext, DialogError> {
        let handle = self.handle(session);
        let mut ctx = handle.lock().await;
        self.expire_if_idle(&mut ctx);

        let outcome = self.validate(&ctx, &delta);
        if outcome.is_ok() {
            merge(&mut ctx, delta);
        }

        ctx.turn_count += 1;
        ctx.last_updated_at = self.clock.now();
        ctx.state = ContextState::Active;

        match outcome {
            Ok(()) => {
                debug!(session = %session, turn = ctx.turn_count, "Context delta applied");
                Ok(ctx.clone())
            }
            Err(e) => {
                warn!(session = %session, error = %e, "Rejected context delta");
                Err(e)
            }
        }
    }

    /// Reset the session to a fresh `NEW` context.
    pub async fn clear(&self, session: &SessionId) {
        let handle = self.handle(session);
        let mut ctx = handle.lock().await;
        *ctx = ConversationContext::new(session.clone(), self.clock.now());
        debug!(session = %session, "Context cleared");
    }

    /// The stored context as-is, without creating or expiring anything.
    pub async fn snapshot(&self, session: &SessionId) -> Option<ConversationContext> {
        let handle = self.lock_sessions().get(session).cloned()?;
        let ctx = handle.lock().await;
        Some(ctx.clone())
    }

    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, SessionHandle>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn handle(&self, session: &SessionId) -> SessionHandle {
        let mut sessions = self.lock_sessions();
        if let Some(handle) = sessions.get(session) {
            return handle.clone();
        }
        self.prune_idle(&mut sessions);
        let handle = Arc::new(AsyncMutex::new(ConversationContext::new(
            session.clone(),
            self.clock.now(),
        )));
        sessions.insert(session.clone(), handle.clone());
        handle
    }

    /// Drop expired sessions nobody else holds. Runs when a new session is
    /// inserted, so the map stays bounded by the sessions active within the
    /// idle window.
    fn prune_idle(&self, sessions: &mut HashMap<SessionId, SessionHandle>) {
        let now = self.clock.now();
        let before = sessions.len();
        sessions.retain(|_, handle| {
            if Arc::strong_count(handle) > 1 {
                return true;
            }
            match handle.try_lock() {
                Ok(ctx) => now - ctx.last_updated_at <= self.idle_expiry,
                Err(_) => true,
            }
        });
        let dropped = before - sessions.len();
        if dropped > 0 {
            debug!(dropped, "Pruned idle sessions");
        }
    }

    fn expire_if_idle(&self, ctx: &mut ConversationContext) {
        let now = self.clock.now();
        if now - ctx.last_updated_at > self.idle_expiry {
            debug!(session = %ctx.session_id, "Context expired");
            *ctx = ConversationContext::new(ctx.session_id.clone(), now);
        }
    }

    fn validate(&self, ctx: &ConversationContext, delta: &ContextDelta) -> Result<(), DialogError> {
        if delta.last_intent.as_deref().is_some_and(|i| i.trim().is_empty()) {
            return Err(DialogError::ContextCorruption(
                "empty intent label".to_string(),
            ));
        }
        check_keys("slot", delta.pending_slots.keys())?;
        check_keys("extra", delta.extra.keys())?;

        let (slots, extra) = if delta.reset {
            (BTreeMap::new(), BTreeMap::new())
        } else {
            (ctx.pending_slots.clone(), ctx.extra.clone())
        };
        let slot_count = merged_len(&slots, &delta.pending_slots);
        if slot_count > self.max_pending_slots {
            return Err(DialogError::ContextCorruption(format!(
                "{} pending slots exceeds limit of {}",
                slot_count, self.max_pending_slots
            )));
        }
        let extra_count = merged_len(&extra, &delta.extra);
        if extra_count > self.max_extra_entries {
            return Err(DialogError::ContextCorruption(format!(
                "{} extra entries exceeds limit of {}",
                extra_count, self.max_extra_entries
            )));
        }
        Ok(())
    }
}

fn check_keys<'a>(kind: &str, keys: impl Iterator<Item = &'a String>) -> Result<(), DialogError> {
    for key in keys {
        if key.trim().is_empty() {
            return Err(DialogError::ContextCorruption(format!("empty {} key", kind)));
        }
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(DialogError::ContextCorruption(format!(
                "reserved {} key {:?}",
                kind, key
            )));
        }
    }
    Ok(())
}

fn merged_len<V, D>(current: &BTreeMap<String, V>, delta: &BTreeMap<String, Option<D>>) -> usize {
    let mut count = current.len();
    for (key, value) in delta {
        match (current.contains_key(key), value.is_some()) {
            (false, true) => count += 1,
            (true, false) => count -= 1,
            _ => {}
        }
    }
    count
}

fn merge(ctx: &mut ConversationContext, delta: ContextDelta) {
    if delta.reset {
        ctx.last_intent = None;
        ctx.last_language = None;
        ctx.pending_slots.clear();
        ctx.extra.clear();
    }
    if let Some(intent) = delta.last_intent {
        ctx.last_intent = Some(intent);
    }
    if let Some(language) = delta.last_language {
        ctx.last_language = Some(language);
    }
    for (name, value) in delta.pending_slots {
        match value {
            Some(v) => {
                ctx.pending_slots.insert(name, v);
            }
            None => {
                ctx.pending_slots.remove(&name);
            }
        }
    }
    for (key, value) in delta.extra {
        match value {
            Some(v) => {
                ctx.extra.insert(key, v);
            }
            None => {
                ctx.extra.remove(&key);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
