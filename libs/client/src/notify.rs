//! Alerts shown to the user, and where they are sent.

use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Success,
    Info,
    Warning,
    Danger,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Success => "success",
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Danger => "danger",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
    pub dismissible: bool,
}

impl Alert {
    pub fn new(level: AlertLevel, message: impl Into<String>) -> Self {
        Alert {
            level,
            message: message.into(),
            dismissible: true,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Warning, message)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Danger, message)
    }

    pub fn sticky(self) -> Self {
        Alert {
            dismissible: false,
            ..self
        }
    }

    /// Bootstrap alert markup for this alert.
    pub fn render_html(&self) -> String {
        let (class, button) = if self.dismissible {
            (
                " alert-dismissible",
                r#"<button type="button" class="btn-close" data-bs-dismiss="alert" aria-label="Close"></button>"#,
            )
        } else {
            ("", "")
        };
        format!(
            r#"<div class="alert alert-{}{} fade show" role="alert">{}{}</div>"#,
            self.level,
            class,
            escape_html(&self.message),
            button
        )
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Receives every alert the client raises.
pub trait Notifier: Send + Sync {
    fn notify(&self, alert: Alert);
}

impl<F> Notifier for F
where
    F: Fn(Alert) + Send + Sync,
{
    fn notify(&self, alert: Alert) {
        self(alert)
    }
}

/// Writes alerts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, alert: Alert) {
        match alert.level {
            AlertLevel::Success | AlertLevel::Info => info!(level = %alert.level, "{}", alert.message),
            AlertLevel::Warning => warn!("{}", alert.message),
            AlertLevel::Danger => error!("{}", alert.message),
        }
    }
}

/// The page wide alert region. Only the most recent alert is shown.
#[derive(Debug, Default)]
pub struct NotificationArea {
    current: Mutex<Option<Alert>>,
}

impl NotificationArea {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Alert> {
        match self.current.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn clear(&self) {
        self.replace(None);
    }

    /// Markup for the region, empty when nothing is shown.
    pub fn render_html(&self) -> String {
        self.current()
            .map(|alert| alert.render_html())
            .unwrap_or_default()
    }

    fn replace(&self, alert: Option<Alert>) {
        match self.current.lock() {
            Ok(mut guard) => *guard = alert,
            Err(poisoned) => *poisoned.into_inner() = alert,
        }
    }
}

impl Notifier for NotificationArea {
    fn notify(&self, alert: Alert) {
        trace!(%alert, "notification area updated");
        self.replace(Some(alert));
    }
}
