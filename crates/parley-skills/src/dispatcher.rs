//! Routing a turn to the first skill that accepts it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parley_dialog::ContextDelta;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::registry::SkillRegistry;
use crate::skill::{Skill, SkillOutcome, SkillRequest};

/// Outcome of routing one turn.
#[derive(Debug, Clone, Default)]
pub struct DispatchResult {
    pub response_text: String,
    pub delta: ContextDelta,
    pub handled: bool,
    pub skill_name: Option<String>,
}

impl DispatchResult {
    /// No skill handled the turn.
    pub fn miss() -> Self {
        Self::default()
    }
}

/// Aborts the spawned handler if the dispatching future is dropped.
struct AbortGuard(AbortHandle);

impl Drop for AbortGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Walks the registry in order; the first skill whose `can_handle` returns
/// true and whose `handle` succeeds wins.
///
/// A skill that errors or panics in either call is logged and skipped, so
/// one faulty skill never takes the turn down with it.
pub struct Dispatcher {
    registry: Arc<SkillRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<SkillRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, request: &SkillRequest) -> DispatchResult {
        for skill in self.registry.skills() {
            if !self.accepts(skill.as_ref(), request) {
                continue;
            }
            debug!(skill = skill.name(), intent = %request.intent.label, "Dispatching");

            match Self::run(skill.clone(), request.clone()).await {
                Ok(outcome) => {
                    return DispatchResult {
                        response_text: outcome.response,
                        delta: outcome.delta,
                        handled: true,
                        skill_name: Some(skill.name().to_string()),
                    };
                }
                Err(reason) => {
                    warn!(skill = skill.name(), error = %reason, "Skill failed, trying next");
                }
            }
        }
        DispatchResult::miss()
    }

    fn accepts(&self, skill: &dyn Skill, request: &SkillRequest) -> bool {
        match catch_unwind(AssertUnwindSafe(|| skill.can_handle(request))) {
            Ok(Ok(accepts)) => accepts,
            Ok(Err(e)) => {
                warn!(skill = skill.name(), error = %e, "can_handle failed");
                false
            }
            Err(_) => {
                warn!(skill = skill.name(), "can_handle panicked");
                false
            }
        }
    }

    /// Run `handle` on its own task so a panic surfaces as a join error.
    async fn run(
        skill: Arc<dyn Skill>,
        request: SkillRequest,
    ) -> Result<SkillOutcome, String> {
        let task = tokio::spawn(async move { skill.handle(&request).await });
        let _guard = AbortGuard(task.abort_handle());
        match task.await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => Err(e.to_string()),
            Err(join) if join.is_panic() => Err("handler panicked".to_string()),
            Err(join) => Err(join.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::testing::request;
    use crate::error::SkillError;
    use crate::skill::SkillDescriptor;
    use async_trait::async_trait;
    use parley_nlu::IntentLabel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Reply(&'static str),
        Fail,
        PanicInHandle,
        PanicInCanHandle,
        ErrInCanHandle,
    }

    struct TestSkill {
        descriptor: SkillDescriptor,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl TestSkill {
        fn new(name: &str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                descriptor: SkillDescriptor::new(name).intent(IntentLabel::new("ping")),
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Skill for TestSkill {
        fn descriptor(&self) -> &SkillDescriptor {
            &self.descriptor
        }

        fn can_handle(&self, request: &SkillRequest) -> Result<bool, SkillError> {
            match self.behaviour {
                Behaviour::PanicInCanHandle => panic!("boom"),
                Behaviour::ErrInCanHandle => Err(SkillError::failed(self.name(), "bad state")),
                _ => Ok(self.descriptor.declares(&request.intent.label)),
            }
        }

        async fn handle(&self, _request: &SkillRequest) -> Result<SkillOutcome, SkillError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Reply(text) => Ok(SkillOutcome::reply(text)),
                Behaviour::Fail => Err(SkillError::failed(self.name(), "backend down")),
                Behaviour::PanicInHandle => panic!("handler exploded"),
                _ => unreachable!(),
            }
        }
    }

    fn dispatcher(skills: Vec<Arc<TestSkill>>) -> Dispatcher {
        let mut registry = SkillRegistry::new();
        for skill in skills {
            registry.register(skill).unwrap();
        }
        Dispatcher::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let first = TestSkill::new("first", Behaviour::Reply("one"));
        let second = TestSkill::new("second", Behaviour::Reply("two"));
        let d = dispatcher(vec![first.clone(), second.clone()]);

        let result = d.dispatch(&request("ping", "ping")).await;
        assert!(result.handled);
        assert_eq!(result.response_text, "one");
        assert_eq!(result.skill_name.as_deref(), Some("first"));
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_skill_falls_through() {
        let failing = TestSkill::new("failing", Behaviour::Fail);
        let backup = TestSkill::new("backup", Behaviour::Reply("ok"));
        let d = dispatcher(vec![failing.clone(), backup]);

        let result = d.dispatch(&request("ping", "ping")).await;
        assert_eq!(result.skill_name.as_deref(), Some("backup"));
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_handler_falls_through() {
        let d = dispatcher(vec![
            TestSkill::new("panics", Behaviour::PanicInHandle),
            TestSkill::new("backup", Behaviour::Reply("ok")),
        ]);
        let result = d.dispatch(&request("ping", "ping")).await;
        assert!(result.handled);
        assert_eq!(result.response_text, "ok");
    }

    #[tokio::test]
    async fn test_panicking_or_failing_can_handle_is_skipped() {
        let d = dispatcher(vec![
            TestSkill::new("panics", Behaviour::PanicInCanHandle),
            TestSkill::new("errs", Behaviour::ErrInCanHandle),
            TestSkill::new("backup", Behaviour::Reply("ok")),
        ]);
        let result = d.dispatch(&request("ping", "ping")).await;
        assert_eq!(result.skill_name.as_deref(), Some("backup"));
    }

    #[tokio::test]
    async fn test_miss_when_nobody_accepts() {
        let d = dispatcher(vec![TestSkill::new("only", Behaviour::Reply("x"))]);
        let result = d.dispatch(&request("hola", "greet")).await;
        assert!(!result.handled);
        assert!(result.response_text.is_empty());
        assert!(result.delta.is_empty());
        assert!(result.skill_name.is_none());
    }

    #[tokio::test]
    async fn test_all_failing_is_a_miss() {
        let d = dispatcher(vec![
            TestSkill::new("a", Behaviour::Fail),
            TestSkill::new("b", Behaviour::PanicInHandle),
        ]);
        assert!(!d.dispatch(&request("ping", "ping")).await.handled);
    }

    #[tokio::test]
    async fn test_dispatch_is_deterministic() {
        let d = dispatcher(vec![
            TestSkill::new("a", Behaviour::Reply("a")),
            TestSkill::new("b", Behaviour::Reply("b")),
        ]);
        let req = request("ping", "ping");
        for _ in 0..10 {
            assert_eq!(d.dispatch(&req).await.skill_name.as_deref(), Some("a"));
        }
    }
}
