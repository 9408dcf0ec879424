use crate::alerts::{AlertCenter, AlertLevel};
use crate::controller::{
    ControllerConfig, Messages, OptimisticActionController, ToggleOutcome, ToggleRequest,
};
use crate::errors::{ConsoleError, ValidationError};
use crate::models::{
    ActionEnvelope, BroadcastDraft, ControlKey, ControlKind, ControlValue, Endpoint,
    PublishAction, Scope, SubjectId, TicketStatus, UserCountResponse,
};
use crate::remote::Remote;
use crate::state::Badge;
use crate::ui::{publish_prompt, user_status_prompt};
use crate::format::{DEFAULT_TRUNCATE, truncate};
use crate::validation::{validate_broadcast, validate_search, validate_ticket_response};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

const GENERIC_FAILURE: &str = "An error occurred";

/// The dashboard's user actions, wired to one server.
pub struct Console<R> {
    remote: Arc<R>,
    controller: OptimisticActionController<R>,
    alerts: AlertCenter,
    translating: Arc<Mutex<HashSet<SubjectId>>>,
}

impl<R> Clone for Console<R> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            controller: self.controller.clone(),
            alerts: self.alerts.clone(),
            translating: Arc::clone(&self.translating),
        }
    }
}

impl<R: Remote> Console<R> {
    pub fn new(remote: Arc<R>, config: ControllerConfig) -> Self {
        let alerts = AlertCenter::default();
        let controller =
            OptimisticActionController::new(Arc::clone(&remote), alerts.clone(), config);
        Self {
            remote,
            controller,
            alerts,
            translating: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn controller(&self) -> &OptimisticActionController<R> {
        &self.controller
    }

    pub fn alerts(&self) -> &AlertCenter {
        &self.alerts
    }

    /// Registers an article's breaking-news checkbox as the page rendered it.
    pub fn show_article(&self, article_id: &str, is_breaking: bool) -> Result<ControlKey, ConsoleError> {
        let key = ControlKey::new(ControlKind::BreakingFlag, SubjectId::new(article_id)?);
        self.controller
            .register(key.clone(), ControlValue::Flag(is_breaking));
        Ok(key)
    }

    /// Registers a ticket's status select and its badge.
    pub fn show_ticket(&self, ticket_id: &str, status: TicketStatus) -> Result<ControlKey, ConsoleError> {
        let key = ControlKey::new(ControlKind::TicketStatus, SubjectId::new(ticket_id)?);
        self.controller.register(
            key.clone(),
            ControlValue::Choice(status.as_str().to_string()),
        );
        self.controller
            .bind_badge(key.clone(), Badge::new("ticket-status", status.as_str()));
        Ok(key)
    }

    pub async fn toggle_breaking(
        &self,
        scope: Scope,
        article_id: &str,
        is_breaking: bool,
    ) -> Result<ToggleOutcome, ConsoleError> {
        let subject = SubjectId::new(article_id)?;
        let endpoint = Endpoint::new(
            format!("{}/news/{subject}/toggle_breaking", scope.prefix()),
            "is_breaking",
        );
        let messages = match scope {
            Scope::Admin => messages(
                "News status updated successfully",
                "Failed to update news status",
                GENERIC_FAILURE,
            ),
            Scope::Staff => messages(
                "Breaking news status updated",
                "Failed to update breaking news status",
                GENERIC_FAILURE,
            ),
        };

        Ok(self
            .controller
            .apply_toggle(ToggleRequest {
                key: ControlKey::new(ControlKind::BreakingFlag, subject),
                proposed: ControlValue::Flag(is_breaking),
                endpoint,
                messages,
            })
            .await)
    }

    pub async fn update_ticket_status(
        &self,
        ticket_id: &str,
        status: TicketStatus,
    ) -> Result<ToggleOutcome, ConsoleError> {
        let subject = SubjectId::new(ticket_id)?;
        let endpoint = Endpoint::new(format!("/admin/tickets/{subject}/update_status"), "status");
        // The select must be on the page; otherwise there is no status to fall back to.
        let key = ControlKey::new(ControlKind::TicketStatus, subject);
        if self.controller.displayed(&key).is_none() {
            return Err(ConsoleError::UnknownControl(key.to_string()));
        }

        Ok(self
            .controller
            .apply_toggle(ToggleRequest {
                key,
                proposed: ControlValue::Choice(status.as_str().to_string()),
                endpoint,
                messages: messages(
                    "Ticket status updated successfully",
                    "Failed to update ticket status",
                    GENERIC_FAILURE,
                ),
            })
            .await)
    }

    /// Number of users a broadcast to `country` would reach. Failures are only
    /// logged; the count display keeps its previous text.
    pub async fn audience_count(&self, country: &str) -> Result<u64, ConsoleError> {
        let result = self
            .bounded(
                self.remote
                    .get_json("/admin/broadcast/user_count", &[("country", country)]),
            )
            .await
            .and_then(|value| Ok(serde_json::from_value::<UserCountResponse>(value)?.count));

        if let Err(err) = &result {
            warn!(country, "audience count failed: {err}");
        }
        result
    }

    pub async fn submit_broadcast(&self, draft: &BroadcastDraft) -> Result<(), ConsoleError> {
        self.check(validate_broadcast(draft))?;
        self.bounded(self.remote.post_form(
            "/admin/broadcast",
            &[
                ("title", draft.title.as_str()),
                ("message", draft.message.as_str()),
                ("countries", draft.countries.as_str()),
            ],
        ))
        .await?;
        info!(
            title = %draft.title,
            countries = %draft.countries,
            preview = %truncate(&draft.message, DEFAULT_TRUNCATE),
            "broadcast submitted"
        );
        Ok(())
    }

    pub async fn submit_ticket_response(
        &self,
        ticket_id: &str,
        message: &str,
    ) -> Result<(), ConsoleError> {
        let subject = SubjectId::new(ticket_id)?;
        self.check(validate_ticket_response(message))?;
        self.bounded(
            self.remote
                .post_form(&format!("/staff/support/{subject}"), &[("message", message)]),
        )
        .await
    }

    /// Requests a translation of an article. A second request for the same
    /// article is refused until the first one settles.
    pub async fn translate_article(&self, article_id: &str) -> Result<bool, ConsoleError> {
        let subject = SubjectId::new(article_id)?;
        let _running = Running::claim(&self.translating, subject.clone())
            .ok_or_else(|| ConsoleError::Busy(format!("translation of article {subject}")))?;

        let result = self
            .bounded(
                self.remote
                    .post_json(&format!("/staff/news/{subject}/translate"), None),
            )
            .await
            .and_then(ActionEnvelope::from_value);

        match result {
            Ok(envelope) if envelope.success => {
                self.alerts
                    .show("News article translated successfully", AlertLevel::Success);
                Ok(true)
            }
            Ok(_) => {
                self.alerts
                    .show("Failed to translate news article", AlertLevel::Danger);
                Ok(false)
            }
            Err(err) => {
                warn!(article = %subject, "translation failed: {err}");
                self.alerts
                    .show("An error occurred during translation", AlertLevel::Danger);
                Err(err)
            }
        }
    }

    /// Publishes or unpublishes an article once `confirm` accepts the prompt.
    /// Returns whether the form was submitted.
    pub async fn publish_article(
        &self,
        article_id: &str,
        action: PublishAction,
        title: &str,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<bool, ConsoleError> {
        let subject = SubjectId::new(article_id)?;
        if !confirm(&publish_prompt(action, title)) {
            return Ok(false);
        }
        self.bounded(
            self.remote
                .post_form(&format!("/staff/news/{subject}/{}", action.as_str()), &[]),
        )
        .await?;
        Ok(true)
    }

    pub async fn toggle_user_status(
        &self,
        user_id: &str,
        username: &str,
        is_active: bool,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<bool, ConsoleError> {
        let subject = SubjectId::new(user_id)?;
        if !confirm(&user_status_prompt(is_active, username)) {
            return Ok(false);
        }
        self.bounded(
            self.remote
                .post_form(&format!("/admin/users/{subject}/toggle_status"), &[]),
        )
        .await?;
        Ok(true)
    }

    /// Path of the public search page for `query`. Blank queries are refused
    /// without an alert; the search field is only marked invalid.
    pub fn search_path(&self, query: &str) -> Result<String, ConsoleError> {
        let query = validate_search(query)?;
        Ok(format!("/search?q={}", urlencoding::encode(query)))
    }

    pub async fn fetch_news(&self) -> Result<(), ConsoleError> {
        self.bounded(self.remote.post_form("/admin/fetch_news", &[]))
            .await
    }

    fn check(&self, verdict: Result<(), ValidationError>) -> Result<(), ConsoleError> {
        verdict.map_err(|err| {
            self.alerts.show(err.to_string(), AlertLevel::Danger);
            ConsoleError::from(err)
        })
    }

    async fn bounded<T>(
        &self,
        request: impl Future<Output = Result<T, ConsoleError>>,
    ) -> Result<T, ConsoleError> {
        let limit = self.controller.config().timeout;
        tokio::time::timeout(limit, request)
            .await
            .unwrap_or(Err(ConsoleError::Timeout(limit)))
    }
}

fn messages(confirmed: &str, rejected: &str, failed: &str) -> Messages {
    Messages {
        confirmed: confirmed.to_string(),
        rejected: rejected.to_string(),
        failed: failed.to_string(),
    }
}

/// Marks a subject busy for as long as it is held.
struct Running<'a> {
    set: &'a Mutex<HashSet<SubjectId>>,
    subject: SubjectId,
}

impl<'a> Running<'a> {
    fn claim(set: &'a Mutex<HashSet<SubjectId>>, subject: SubjectId) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(subject.clone());
        inserted.then_some(Self { set, subject })
    }
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.subject);
    }
}
