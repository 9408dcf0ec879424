//! Optimistic toggle/update protocol.
//!
//! A change is shown immediately, confirmed with the server, and undone if the
//! server refuses or cannot be reached. Every request is stamped with a
//! per-control sequence number; only the answer to the latest request may touch
//! the control, so overlapping clicks cannot leave it in a stale state.

use crate::alerts::{AlertCenter, AlertLevel};
use crate::errors::{ConsoleError, Failure};
use crate::models::{ActionEnvelope, ControlKey, ControlValue, Endpoint};
use crate::remote::Remote;
use crate::state::{Badge, BoardState, ControlState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// What happens when a control is changed again before its previous change
/// was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Send the new request; answers to older ones are discarded.
    #[default]
    Supersede,
    /// Refuse the interaction until the pending request settles.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub policy: OverlapPolicy,
    pub timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            policy: OverlapPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Alert texts for the three ways a confirmation can end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    pub confirmed: String,
    pub rejected: String,
    pub failed: String,
}

#[derive(Debug, Clone)]
pub struct ToggleRequest {
    pub key: ControlKey,
    pub proposed: ControlValue,
    pub endpoint: Endpoint,
    pub messages: Messages,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Confirmed,
    RolledBack(Failure),
    /// A newer change to the same control was issued before this one settled.
    Superseded,
    /// Refused under [`OverlapPolicy::Reject`]; nothing was sent.
    Busy,
}

/// A change between the moment it is shown and the moment it is settled.
#[derive(Debug)]
struct ToggleAction {
    key: ControlKey,
    proposed: ControlValue,
    endpoint: Endpoint,
    seq: u64,
}

pub struct OptimisticActionController<R> {
    remote: Arc<R>,
    alerts: AlertCenter,
    board: Arc<Mutex<BoardState>>,
    config: ControllerConfig,
}

impl<R> Clone for OptimisticActionController<R> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            alerts: self.alerts.clone(),
            board: Arc::clone(&self.board),
            config: self.config,
        }
    }
}

impl<R: Remote> OptimisticActionController<R> {
    pub fn new(remote: Arc<R>, alerts: AlertCenter, config: ControllerConfig) -> Self {
        Self {
            remote,
            alerts,
            board: Arc::new(Mutex::new(BoardState::default())),
            config,
        }
    }

    pub fn alerts(&self) -> &AlertCenter {
        &self.alerts
    }

    pub fn config(&self) -> ControllerConfig {
        self.config
    }

    /// Declares a control together with the value the page rendered it with.
    pub fn register(&self, key: ControlKey, value: ControlValue) {
        self.board()
            .controls
            .entry(key)
            .and_modify(|control| {
                control.displayed = value.clone();
                control.confirmed = value.clone();
            })
            .or_insert_with(|| ControlState::new(value));
    }

    pub fn bind_badge(&self, key: ControlKey, badge: Badge) {
        self.board().badges.insert(key, badge);
    }

    pub fn displayed(&self, key: &ControlKey) -> Option<ControlValue> {
        self.board().displayed(key).cloned()
    }

    pub fn badge(&self, key: &ControlKey) -> Option<Badge> {
        self.board().badges.get(key).cloned()
    }

    pub fn is_pending(&self, key: &ControlKey) -> bool {
        self.board()
            .controls
            .get(key)
            .is_some_and(|control| control.pending.is_some())
    }

    pub async fn apply_toggle(&self, request: ToggleRequest) -> ToggleOutcome {
        let ToggleRequest {
            key,
            proposed,
            endpoint,
            messages,
        } = request;

        let Some(action) = self.begin(key, proposed, endpoint) else {
            return ToggleOutcome::Busy;
        };
        let mut in_flight = InFlight {
            board: &self.board,
            key: action.key.clone(),
            seq: action.seq,
            settled: false,
        };

        info!(
            control = %action.key,
            seq = action.seq,
            path = %action.endpoint.path,
            "confirming change"
        );

        let body = action.endpoint.body(&action.proposed);
        let answer = tokio::time::timeout(
            self.config.timeout,
            self.remote.post_json(&action.endpoint.path, Some(body)),
        )
        .await;

        let result = match answer {
            Ok(Ok(value)) => ActionEnvelope::from_value(value),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(ConsoleError::Timeout(self.config.timeout)),
        };

        in_flight.settled = true;
        self.settle(action, result, &messages)
    }

    fn begin(
        &self,
        key: ControlKey,
        proposed: ControlValue,
        endpoint: Endpoint,
    ) -> Option<ToggleAction> {
        let mut board = self.board();
        let control = board.controls.entry(key.clone()).or_insert_with(|| {
            let prior = match &proposed {
                ControlValue::Flag(flag) => ControlValue::Flag(!flag),
                ControlValue::Choice(_) => proposed.clone(),
            };
            ControlState::new(prior)
        });

        if self.config.policy == OverlapPolicy::Reject && control.pending.is_some() {
            debug!(control = %key, "change refused while a confirmation is pending");
            return None;
        }

        control.displayed = proposed.clone();
        control.latest += 1;
        control.pending = Some(control.latest);

        Some(ToggleAction {
            key,
            proposed,
            endpoint,
            seq: control.latest,
        })
    }

    fn settle(
        &self,
        action: ToggleAction,
        result: Result<ActionEnvelope, ConsoleError>,
        messages: &Messages,
    ) -> ToggleOutcome {
        let mut guard = self.board();
        let board = &mut *guard;

        let Some(control) = board.controls.get_mut(&action.key) else {
            return ToggleOutcome::Superseded;
        };
        if control.latest != action.seq {
            if matches!(&result, Ok(envelope) if envelope.success) {
                control.confirm(action.seq, &action.proposed);
            }
            debug!(
                control = %action.key,
                seq = action.seq,
                latest = control.latest,
                "discarding stale answer"
            );
            return ToggleOutcome::Superseded;
        }
        control.pending = None;

        let failure = match result {
            Ok(envelope) if envelope.success => {
                control.confirm(action.seq, &action.proposed);
                if let (Some(value), Some(badge)) = (
                    action.proposed.as_choice(),
                    board.badges.get_mut(&action.key),
                ) {
                    badge.show(value);
                }
                drop(guard);

                info!(control = %action.key, seq = action.seq, "change confirmed");
                self.alerts.show(&messages.confirmed, AlertLevel::Success);
                return ToggleOutcome::Confirmed;
            }
            Ok(_) => Failure::Rejected,
            Err(err) => Failure::from(err),
        };

        control.roll_back();
        drop(guard);

        warn!(control = %action.key, seq = action.seq, ?failure, "change rolled back");
        let message = if failure.is_rejection() {
            &messages.rejected
        } else {
            &messages.failed
        };
        self.alerts.show(message, AlertLevel::Danger);
        ToggleOutcome::RolledBack(failure)
    }

    fn board(&self) -> MutexGuard<'_, BoardState> {
        lock(&self.board)
    }
}

fn lock(board: &Mutex<BoardState>) -> MutexGuard<'_, BoardState> {
    board.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Undoes an optimistic change whose confirmation was abandoned before it
/// settled, e.g. when the caller drops the future.
struct InFlight<'a> {
    board: &'a Mutex<BoardState>,
    key: ControlKey,
    seq: u64,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut board = lock(self.board);
        if let Some(control) = board.controls.get_mut(&self.key) {
            if control.pending == Some(self.seq) {
                control.pending = None;
                control.roll_back();
                debug!(control = %self.key, seq = self.seq, "abandoned change rolled back");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{ControlKind, SubjectId};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use tokio::sync::oneshot;

    type Reply = Result<Value, ConsoleError>;

    /// In-memory server whose answers are queued by the test.
    #[derive(Default)]
    pub(crate) struct ScriptedRemote {
        replies: Mutex<VecDeque<oneshot::Receiver<Reply>>>,
        pub(crate) calls: Mutex<Vec<(String, Option<Value>)>>,
    }

    impl ScriptedRemote {
        pub(crate) fn reply(&self, reply: Reply) {
            let (tx, rx) = oneshot::channel();
            let _ = tx.send(reply);
            self.replies.lock().unwrap().push_back(rx);
        }

        pub(crate) fn gate(&self) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.replies.lock().unwrap().push_back(rx);
            tx
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        async fn next(&self, path: &str, body: Option<Value>) -> Reply {
            self.calls.lock().unwrap().push((path.to_string(), body));
            let rx = self.replies.lock().unwrap().pop_front();
            match rx {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(ConsoleError::malformed("reply dropped"))),
                None => Err(ConsoleError::malformed("no scripted reply")),
            }
        }
    }

    #[async_trait]
    impl Remote for ScriptedRemote {
        async fn post_json(&self, path: &str, body: Option<Value>) -> Result<Value, ConsoleError> {
            self.next(path, body).await
        }

        async fn get_json(
            &self,
            path: &str,
            query: &[(&str, &str)],
        ) -> Result<Value, ConsoleError> {
            let query: serde_json::Map<String, Value> = query
                .iter()
                .map(|(k, v)| (k.to_string(), Value::from(*v)))
                .collect();
            self.next(path, Some(Value::Object(query))).await
        }

        async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<(), ConsoleError> {
            let fields: serde_json::Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.to_string(), Value::from(*v)))
                .collect();
            self.next(path, Some(Value::Object(fields))).await.map(|_| ())
        }
    }

    pub(crate) async fn wait_for_calls(remote: &ScriptedRemote, count: usize) {
        for _ in 0..1_000 {
            if remote.call_count() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {count} calls, saw {}", remote.call_count());
    }

    fn breaking(id: &str) -> ControlKey {
        ControlKey::new(ControlKind::BreakingFlag, SubjectId::new(id).unwrap())
    }

    fn messages() -> Messages {
        Messages {
            confirmed: "saved".into(),
            rejected: "refused".into(),
            failed: "broken".into(),
        }
    }

    fn toggle(key: &ControlKey, value: bool) -> ToggleRequest {
        ToggleRequest {
            key: key.clone(),
            proposed: ControlValue::Flag(value),
            endpoint: Endpoint::new("/toggle_breaking", "is_breaking"),
            messages: messages(),
        }
    }

    fn controller(
        remote: &Arc<ScriptedRemote>,
        policy: OverlapPolicy,
    ) -> OptimisticActionController<ScriptedRemote> {
        OptimisticActionController::new(
            Arc::clone(remote),
            AlertCenter::default(),
            ControllerConfig {
                policy,
                timeout: DEFAULT_TIMEOUT,
            },
        )
    }

    #[tokio::test]
    async fn confirmed_change_keeps_proposed_value() {
        let remote = Arc::new(ScriptedRemote::default());
        remote.reply(Ok(json!({ "success": true })));
        let ctrl = controller(&remote, OverlapPolicy::Supersede);
        let key = breaking("42");
        ctrl.register(key.clone(), ControlValue::Flag(false));

        let outcome = ctrl.apply_toggle(toggle(&key, true)).await;

        assert_eq!(outcome, ToggleOutcome::Confirmed);
        assert_eq!(ctrl.displayed(&key), Some(ControlValue::Flag(true)));
        assert!(!ctrl.is_pending(&key));
        let calls = remote.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, Some(json!({ "is_breaking": true })));
        let alert = ctrl.alerts().latest().unwrap();
        assert_eq!(alert.level, AlertLevel::Success);
        assert_eq!(alert.message, "saved");
    }

    #[tokio::test]
    async fn rejected_change_rolls_back() {
        let remote = Arc::new(ScriptedRemote::default());
        remote.reply(Ok(json!({ "success": false })));
        let ctrl = controller(&remote, OverlapPolicy::Supersede);
        let key = breaking("42");
        ctrl.register(key.clone(), ControlValue::Flag(false));

        let outcome = ctrl.apply_toggle(toggle(&key, true)).await;

        assert_eq!(outcome, ToggleOutcome::RolledBack(Failure::Rejected));
        assert_eq!(ctrl.displayed(&key), Some(ControlValue::Flag(false)));
        assert_eq!(ctrl.alerts().latest().unwrap().message, "refused");
    }

    #[tokio::test]
    async fn transport_errors_take_the_rollback_path() {
        let remote = Arc::new(ScriptedRemote::default());
        remote.reply(Err(ConsoleError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
        remote.reply(Ok(json!({ "status": "ok" })));
        let ctrl = controller(&remote, OverlapPolicy::Supersede);
        let key = breaking("9");

        let first = ctrl.apply_toggle(toggle(&key, true)).await;
        assert_eq!(first, ToggleOutcome::RolledBack(Failure::Status(500)));
        assert_eq!(ctrl.displayed(&key), Some(ControlValue::Flag(false)));

        let second = ctrl.apply_toggle(toggle(&key, true)).await;
        assert!(matches!(
            second,
            ToggleOutcome::RolledBack(Failure::Malformed(_))
        ));
        assert_eq!(ctrl.displayed(&key), Some(ControlValue::Flag(false)));

        let alerts = ctrl.alerts().snapshot();
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|alert| alert.message == "broken"));
    }

    #[tokio::test]
    async fn repeated_success_shows_two_alerts() {
        let remote = Arc::new(ScriptedRemote::default());
        remote.reply(Ok(json!({ "success": true })));
        remote.reply(Ok(json!({ "success": true })));
        let ctrl = controller(&remote, OverlapPolicy::Supersede);
        let key = breaking("42");
        ctrl.register(key.clone(), ControlValue::Flag(false));

        ctrl.apply_toggle(toggle(&key, true)).await;
        ctrl.apply_toggle(toggle(&key, true)).await;

        assert_eq!(ctrl.displayed(&key), Some(ControlValue::Flag(true)));
        assert_eq!(ctrl.alerts().snapshot().len(), 2);
    }

    #[tokio::test]
    async fn stale_answer_is_discarded() {
        let remote = Arc::new(ScriptedRemote::default());
        let first_gate = remote.gate();
        let second_gate = remote.gate();
        let ctrl = controller(&remote, OverlapPolicy::Supersede);
        let key = breaking("42");
        ctrl.register(key.clone(), ControlValue::Flag(false));

        let first = tokio::spawn({
            let ctrl = ctrl.clone();
            let request = toggle(&key, true);
            async move { ctrl.apply_toggle(request).await }
        });
        wait_for_calls(&remote, 1).await;

        let second = tokio::spawn({
            let ctrl = ctrl.clone();
            let request = toggle(&key, false);
            async move { ctrl.apply_toggle(request).await }
        });
        wait_for_calls(&remote, 2).await;

        second_gate.send(Ok(json!({ "success": true }))).unwrap();
        assert_eq!(second.await.unwrap(), ToggleOutcome::Confirmed);

        first_gate.send(Ok(json!({ "success": false }))).unwrap();
        assert_eq!(first.await.unwrap(), ToggleOutcome::Superseded);

        assert_eq!(ctrl.displayed(&key), Some(ControlValue::Flag(false)));
        assert!(!ctrl.is_pending(&key));
        assert_eq!(ctrl.alerts().snapshot().len(), 1);
    }

    /// Issues two overlapping toggles (true, then false) on a control shown as
    /// false and returns their gates in issue order.
    async fn overlapping(
        remote: &Arc<ScriptedRemote>,
        ctrl: &OptimisticActionController<ScriptedRemote>,
        key: &ControlKey,
    ) -> [(
        oneshot::Sender<Reply>,
        tokio::task::JoinHandle<ToggleOutcome>,
    ); 2] {
        let first_gate = remote.gate();
        let second_gate = remote.gate();
        let first = tokio::spawn({
            let ctrl = ctrl.clone();
            let request = toggle(key, true);
            async move { ctrl.apply_toggle(request).await }
        });
        wait_for_calls(remote, 1).await;
        let second = tokio::spawn({
            let ctrl = ctrl.clone();
            let request = toggle(key, false);
            async move { ctrl.apply_toggle(request).await }
        });
        wait_for_calls(remote, 2).await;
        [(first_gate, first), (second_gate, second)]
    }

    #[tokio::test]
    async fn both_rejected_overlap_reverts_to_confirmed() {
        let remote = Arc::new(ScriptedRemote::default());
        let ctrl = controller(&remote, OverlapPolicy::Supersede);
        let key = breaking("42");
        ctrl.register(key.clone(), ControlValue::Flag(false));

        let [(first_gate, first), (second_gate, second)] =
            overlapping(&remote, &ctrl, &key).await;

        first_gate.send(Ok(json!({ "success": false }))).unwrap();
        assert_eq!(first.await.unwrap(), ToggleOutcome::Superseded);
        second_gate.send(Ok(json!({ "success": false }))).unwrap();
        assert_eq!(
            second.await.unwrap(),
            ToggleOutcome::RolledBack(Failure::Rejected)
        );

        assert_eq!(ctrl.displayed(&key), Some(ControlValue::Flag(false)));
        assert!(!ctrl.is_pending(&key));
    }

    #[tokio::test]
    async fn stale_success_becomes_rollback_target() {
        let remote = Arc::new(ScriptedRemote::default());
        let ctrl = controller(&remote, OverlapPolicy::Supersede);
        let key = breaking("42");
        ctrl.register(key.clone(), ControlValue::Flag(false));

        let [(first_gate, first), (second_gate, second)] =
            overlapping(&remote, &ctrl, &key).await;

        first_gate.send(Ok(json!({ "success": true }))).unwrap();
        assert_eq!(first.await.unwrap(), ToggleOutcome::Superseded);
        assert_eq!(ctrl.displayed(&key), Some(ControlValue::Flag(false)));

        second_gate.send(Ok(json!({ "success": false }))).unwrap();
        assert_eq!(
            second.await.unwrap(),
            ToggleOutcome::RolledBack(Failure::Rejected)
        );
        assert_eq!(ctrl.displayed(&key), Some(ControlValue::Flag(true)));
        assert_eq!(ctrl.alerts().snapshot().len(), 1);
    }

    #[tokio::test]
    async fn late_stale_success_leaves_display_alone() {
        let remote = Arc::new(ScriptedRemote::default());
        let ctrl = controller(&remote, OverlapPolicy::Supersede);
        let key = breaking("42");
        ctrl.register(key.clone(), ControlValue::Flag(false));

        let [(first_gate, first), (second_gate, second)] =
            overlapping(&remote, &ctrl, &key).await;

        second_gate.send(Ok(json!({ "success": false }))).unwrap();
        assert_eq!(
            second.await.unwrap(),
            ToggleOutcome::RolledBack(Failure::Rejected)
        );
        first_gate.send(Ok(json!({ "success": true }))).unwrap();
        assert_eq!(first.await.unwrap(), ToggleOutcome::Superseded);

        assert_eq!(ctrl.displayed(&key), Some(ControlValue::Flag(false)));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_request_releases_the_control() {
        let remote = Arc::new(ScriptedRemote::default());
        let _held = remote.gate();
        let ctrl = controller(&remote, OverlapPolicy::Reject);
        let key = breaking("42");
        ctrl.register(key.clone(), ControlValue::Flag(false));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            ctrl.apply_toggle(toggle(&key, true)),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!ctrl.is_pending(&key));
        assert_eq!(ctrl.displayed(&key), Some(ControlValue::Flag(false)));

        remote.reply(Ok(json!({ "success": true })));
        assert_eq!(
            ctrl.apply_toggle(toggle(&key, true)).await,
            ToggleOutcome::Confirmed
        );
        assert_eq!(ctrl.displayed(&key), Some(ControlValue::Flag(true)));
    }

    #[tokio::test]
    async fn reject_policy_refuses_while_pending() {
        let remote = Arc::new(ScriptedRemote::default());
        let gate = remote.gate();
        let ctrl = controller(&remote, OverlapPolicy::Reject);
        let key = breaking("42");
        ctrl.register(key.clone(), ControlValue::Flag(false));

        let first = tokio::spawn({
            let ctrl = ctrl.clone();
            let request = toggle(&key, true);
            async move { ctrl.apply_toggle(request).await }
        });
        wait_for_calls(&remote, 1).await;
        assert!(ctrl.is_pending(&key));

        let refused = ctrl.apply_toggle(toggle(&key, false)).await;
        assert_eq!(refused, ToggleOutcome::Busy);
        assert_eq!(remote.call_count(), 1);
        assert_eq!(ctrl.displayed(&key), Some(ControlValue::Flag(true)));

        gate.send(Ok(json!({ "success": true }))).unwrap();
        assert_eq!(first.await.unwrap(), ToggleOutcome::Confirmed);
        assert!(!ctrl.is_pending(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_request_times_out() {
        let remote = Arc::new(ScriptedRemote::default());
        let _held = remote.gate();
        let ctrl = controller(&remote, OverlapPolicy::Supersede);
        let key = breaking("42");
        ctrl.register(key.clone(), ControlValue::Flag(true));

        let outcome = ctrl.apply_toggle(toggle(&key, false)).await;

        assert_eq!(outcome, ToggleOutcome::RolledBack(Failure::TimedOut));
        assert_eq!(ctrl.displayed(&key), Some(ControlValue::Flag(true)));
        assert!(!ctrl.is_pending(&key));
    }

    #[tokio::test]
    async fn confirmed_choice_rewrites_badge() {
        let remote = Arc::new(ScriptedRemote::default());
        remote.reply(Ok(json!({ "success": true })));
        remote.reply(Ok(json!({ "success": false })));
        let ctrl = controller(&remote, OverlapPolicy::Supersede);
        let key = ControlKey::new(ControlKind::TicketStatus, SubjectId::new("7").unwrap());
        ctrl.register(key.clone(), ControlValue::Choice("open".into()));
        ctrl.bind_badge(key.clone(), Badge::new("ticket-status", "open"));

        let request = |status: &str| ToggleRequest {
            key: key.clone(),
            proposed: ControlValue::Choice(status.into()),
            endpoint: Endpoint::new("/update_status", "status"),
            messages: messages(),
        };

        assert_eq!(
            ctrl.apply_toggle(request("resolved")).await,
            ToggleOutcome::Confirmed
        );
        assert_eq!(ctrl.badge(&key).unwrap().label, "Resolved");

        ctrl.apply_toggle(request("closed")).await;
        assert_eq!(
            ctrl.displayed(&key),
            Some(ControlValue::Choice("resolved".into()))
        );
        assert_eq!(ctrl.badge(&key).unwrap().class, "ticket-status resolved");
    }
}
