use crate::alerts::Alert;
use crate::models::PublishAction;
use crate::state::Badge;

pub fn render_alert(alert: &Alert) -> String {
    ALERT_HTML
        .replace("{{LEVEL}}", alert.level.as_str())
        .replace("{{ID}}", &alert.id.to_string())
        .replace("{{MESSAGE}}", &escape(&alert.message))
}

pub fn render_alerts(alerts: &[Alert]) -> String {
    let body: String = alerts.iter().map(render_alert).collect();
    format!("<div id=\"alertsContainer\">{body}</div>")
}

pub fn render_badge(badge: &Badge) -> String {
    format!(
        "<span class=\"{}\">{}</span>",
        escape(&badge.class),
        escape(&badge.label)
    )
}

pub fn audience_text(count: u64) -> String {
    format!("This message will be sent to {count} user(s)")
}

pub fn publish_prompt(action: PublishAction, title: &str) -> String {
    format!("Are you sure you want to {} \"{title}\"?", action.as_str())
}

pub fn user_status_prompt(is_active: bool, username: &str) -> String {
    let action = if is_active { "deactivate" } else { "activate" };
    format!("Are you sure you want to {action} user \"{username}\"?")
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

const ALERT_HTML: &str = r#"<div class="alert alert-{{LEVEL}} alert-dismissible fade show" role="alert" data-alert-id="{{ID}}">
  {{MESSAGE}}
  <button type="button" class="btn-close" data-bs-dismiss="alert" aria-label="Close"></button>
</div>
"#;
