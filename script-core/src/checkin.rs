//! Scheduled super-topic check-in
//!
//! Walks the configured account table in order, issuing one check-in call
//! per account and awaiting it before starting the next so the shared
//! session cookie is never used concurrently. Every account ends in exactly
//! one notification; nothing is retried.

use crate::config::CheckinConfig;
use crate::error::ScriptError;
use crate::host::{HostContext, HttpRequest};
use crate::notify::Notification;
use crate::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

/// Server code: behaviour abnormal, re-verification required
pub const CODE_REVERIFY: i64 = 100003;
/// Server code: checked in
pub const CODE_SUCCESS: i64 = 100000;
/// Server code: already checked in today
pub const CODE_ALREADY_CHECKED_IN: i64 = 382004;

/// A (display name, super-topic id) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub name: String,
    pub id: String,
}

/// Ordered, validated list of accounts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountTable {
    accounts: Vec<Account>,
}

impl AccountTable {
    /// Validate raw `[name, id]` rows. Any malformed row rejects the whole
    /// table, with the offending row index in the error.
    pub fn from_rows(rows: &[Vec<String>]) -> Result<Self> {
        let mut accounts = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            if row.len() != 2 {
                return Err(ScriptError::invalid_account(
                    index,
                    &format!("expected [name, id], found {} columns", row.len()),
                ));
            }
            let name = row[0].trim();
            let id = row[1].trim();
            if name.is_empty() {
                return Err(ScriptError::invalid_account(index, "name is empty"));
            }
            if id.is_empty() {
                return Err(ScriptError::invalid_account(index, "id is empty"));
            }
            if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ScriptError::invalid_account(index, "id must be alphanumeric"));
            }
            accounts.push(Account {
                name: name.to_string(),
                id: id.to_string(),
            });
        }
        Ok(Self { accounts })
    }

    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Classified check-in response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckinStatus {
    Success {
        tip_message: String,
        alert_title: String,
        alert_subtitle: String,
    },
    Reverify {
        message: String,
        location: String,
    },
    AlreadyCheckedIn {
        message: String,
    },
    Other {
        code: Option<i64>,
        message: String,
    },
}

impl CheckinStatus {
    /// Classify a decoded response body by its `code` field.
    ///
    /// The code may arrive as a number or a numeric string.
    pub fn from_json(value: &Value) -> Self {
        let code = match value.get("code") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        let message = str_field(value, &["msg"]);

        match code {
            Some(CODE_REVERIFY) => CheckinStatus::Reverify {
                message,
                location: str_field(value, &["data", "location"]),
            },
            Some(CODE_SUCCESS) => CheckinStatus::Success {
                tip_message: str_field(value, &["data", "tipMessage"]),
                alert_title: str_field(value, &["data", "alert_title"]),
                alert_subtitle: str_field(value, &["data", "alert_subtitle"]),
            },
            Some(CODE_ALREADY_CHECKED_IN) => CheckinStatus::AlreadyCheckedIn {
                message: message.replace(&format!("({})", CODE_ALREADY_CHECKED_IN), ""),
            },
            code => CheckinStatus::Other { code, message },
        }
    }

    /// Notification shape for this outcome
    pub fn notification(&self, account: &Account) -> Notification {
        let title = checkin_title(account);
        match self {
            CheckinStatus::Reverify { message, location } => {
                Notification::new(title, format!("❕{}", message), location.clone())
            }
            CheckinStatus::Success {
                alert_title,
                alert_subtitle,
                ..
            } => Notification::new(
                title,
                "Checked in 🎉",
                format!("{}\n{}", alert_title, alert_subtitle),
            ),
            CheckinStatus::AlreadyCheckedIn { message } => {
                Notification::new(title, "", format!("{} 🎉", message))
            }
            CheckinStatus::Other { message, .. } => Notification::new(title, "", message.clone()),
        }
    }
}

fn str_field(value: &Value, path: &[&str]) -> String {
    let mut current = value;
    for key in path {
        match current.get(key) {
            Some(next) => current = next,
            None => return String::new(),
        }
    }
    match current {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn checkin_title(account: &Account) -> String {
    format!("{} super-topic check-in", account.name)
}

fn failure_notification(account: &Account, error: &str) -> Notification {
    Notification::new(
        format!("{} super-topic check-in error!", account.name),
        "",
        error.to_string(),
    )
}

/// What happened to one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckinOutcome {
    Completed(CheckinStatus),
    TransportFailed(String),
    MalformedResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinEntry {
    pub account: Account,
    pub outcome: CheckinOutcome,
}

/// Per-account results of one run, in account order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckinReport {
    pub entries: Vec<CheckinEntry>,
}

impl CheckinReport {
    pub fn succeeded(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e.outcome,
                    CheckinOutcome::Completed(CheckinStatus::Success { .. })
                        | CheckinOutcome::Completed(CheckinStatus::AlreadyCheckedIn { .. })
                )
            })
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| !matches!(e.outcome, CheckinOutcome::Completed(_)))
            .count()
    }
}

pub struct CheckinRunner {
    config: CheckinConfig,
    accounts: AccountTable,
}

impl CheckinRunner {
    pub fn new(config: CheckinConfig, accounts: AccountTable) -> Self {
        Self { config, accounts }
    }

    /// Build the runner from configuration, validating the account rows
    pub fn from_config(config: CheckinConfig) -> Result<Self> {
        let accounts = config.account_table()?;
        Ok(Self::new(config, accounts))
    }

    pub fn accounts(&self) -> &AccountTable {
        &self.accounts
    }

    /// Check-in URL for one account
    pub fn checkin_url(&self, account: &Account) -> Result<Url> {
        let params = [
            ("ajwvr", "6"),
            ("api", "http://i.huati.weibo.com/aj/super/checkin"),
            ("texta", "签到"),
            ("textb", "已签到"),
            ("status", "0"),
            ("id", account.id.as_str()),
            ("location", "page_100808_super_index"),
            ("timezone", "GMT+0800"),
            ("lang", "zh-cn"),
            ("plat", "MacIntel"),
            (
                "ua",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/13.0.4 Safari/605.1.15",
            ),
            ("screen", "375*812"),
            ("__rnd", "1576850070506"),
        ];
        Url::parse_with_params(&self.config.endpoint, params.iter()).map_err(|e| {
            ScriptError::Configuration(format!("Invalid check-in endpoint: {}", e))
        })
    }

    /// Check in every account, one at a time, in table order
    pub async fn run(&self, host: &HostContext) -> CheckinReport {
        info!(accounts = self.accounts.len(), "Starting check-in run");
        let mut report = CheckinReport::default();

        for account in self.accounts.iter() {
            let outcome = self.check_in(host, account).await;
            report.entries.push(CheckinEntry {
                account: account.clone(),
                outcome,
            });
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            total = report.entries.len(),
            "Check-in run finished"
        );
        report
    }

    async fn check_in(&self, host: &HostContext, account: &Account) -> CheckinOutcome {
        let url = match self.checkin_url(account) {
            Ok(url) => url,
            Err(e) => {
                let reason = e.to_string();
                host.notifier.post(failure_notification(account, &reason));
                return CheckinOutcome::TransportFailed(reason);
            }
        };

        let mut request = HttpRequest::get(url.as_str());
        match host.store.read(&self.config.cookie_key) {
            Ok(Some(cookie)) => request = request.with_header("Cookie", &cookie),
            Ok(None) => warn!(
                account = %account.name,
                key = %self.config.cookie_key,
                "No session cookie stored, checking in without one"
            ),
            Err(e) => warn!(account = %account.name, "Failed to read session cookie: {}", e),
        }

        debug!(account = %account.name, id = %account.id, "Issuing check-in request");
        let response = match host.http.get(request).await {
            Ok(response) => response,
            Err(e) => {
                let reason = e.to_string();
                warn!(account = %account.name, "Check-in request failed: {}", reason);
                host.notifier.post(failure_notification(account, &reason));
                return CheckinOutcome::TransportFailed(reason);
            }
        };

        let value: Value = match serde_json::from_str(&response.body) {
            Ok(value) => value,
            Err(e) => {
                let reason = format!("Malformed response (HTTP {}): {}", response.status, e);
                warn!(account = %account.name, "{}", reason);
                host.notifier.post(failure_notification(account, &reason));
                return CheckinOutcome::MalformedResponse(reason);
            }
        };

        let status = CheckinStatus::from_json(&value);
        info!(account = %account.name, status = ?status, "Check-in response classified");
        host.notifier.post(status.notification(account));
        CheckinOutcome::Completed(status)
    }
}
