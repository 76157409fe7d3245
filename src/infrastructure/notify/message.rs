//! Human-readable rendering of an alert

use crate::domain::detection::AlertEvent;
use crate::domain::monitor::{AlertContext, MonitorKind};
use crate::shared::utils::{asset_ticker, describe_window, format_amount, format_change};

/// An alert event plus the context needed to present it.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub event: AlertEvent,
    pub context: AlertContext,
}

impl AlertMessage {
    pub fn new(event: AlertEvent, context: AlertContext) -> Self {
        Self { event, context }
    }

    fn amount(&self, value: &num_bigint::BigInt) -> String {
        let body = format_amount(value, self.context.decimals, self.context.precision);
        match self.context.monitor {
            MonitorKind::Prices => format!("${}", body),
            MonitorKind::VaultBalance => format!("{} {}", body, asset_ticker(&self.context.subject)),
            _ => body,
        }
    }

    pub fn title(&self) -> String {
        let pct = &self.event.pct_change;
        let subject = &self.context.subject;
        match self.context.monitor {
            MonitorKind::VaultBalance => {
                format!("{} {}% Asgard Vault Change", asset_ticker(subject), pct)
            }
            MonitorKind::Pool => format!(
                "{} {}% Pool Change in {}",
                asset_ticker(subject),
                pct,
                self.context.detail.as_deref().unwrap_or("balance")
            ),
            MonitorKind::Prices => format!("{}: {}% Change", asset_ticker(subject), pct),
            MonitorKind::NetworkPrice => {
                format!("{} {}% Change", subject.replace('_', " ").to_uppercase(), pct)
            }
            MonitorKind::WalletBalance => format!(
                "{}: {} {}% Change",
                self.context.detail.as_deref().unwrap_or("Wallet"),
                subject,
                pct
            ),
        }
    }

    pub fn description(&self) -> String {
        let pct = &self.event.pct_change;
        let subject = &self.context.subject;
        let window = describe_window(self.event.window_minutes);
        match self.context.monitor {
            MonitorKind::VaultBalance => format!(
                "**{}** vault balance has changed by **{}%** compared to **{} ago**.",
                subject, pct, window
            ),
            MonitorKind::Pool => format!(
                "The **{}** of **{}** pool has changed by **{}%** compared to **{} ago**.",
                self.context.detail.as_deref().unwrap_or("balance"),
                subject,
                pct,
                window
            ),
            MonitorKind::Prices | MonitorKind::NetworkPrice => format!(
                "The price of **{}** has changed by **{}%** in the last {}.",
                subject, pct, window
            ),
            MonitorKind::WalletBalance => format!(
                "The balance of **{}** in wallet **{}** has changed by **{}%** compared to **{} ago**.",
                subject,
                self.context.detail.as_deref().unwrap_or("?"),
                pct,
                window
            ),
        }
    }

    /// `(name, value)` pairs: Before, Now, Change.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Before", self.amount(&self.event.historical)),
            ("Now", self.amount(&self.event.current)),
            (
                "Change",
                format_change(&self.event.delta(), self.context.decimals, self.context.precision),
            ),
        ]
    }

    /// One-line summary for logs and the log channel.
    pub fn summary(&self) -> String {
        let fields = self.fields();
        format!(
            "{} ({} -> {}, {}) over the last {}",
            self.title(),
            fields[0].1,
            fields[1].1,
            fields[2].1,
            describe_window(self.event.window_minutes)
        )
    }
}
