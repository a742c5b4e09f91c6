use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Alert type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Suspicious transaction flagged by fraud scoring
    Fraud,
    /// Spending pattern deviates from history
    UnusualSpending,
    /// Category budget approaching its limit
    BudgetWarning,
    /// Category budget over its limit
    BudgetExceeded,
    /// Savings goal milestone reached
    GoalMilestone,
    /// Upcoming subscription renewal
    SubscriptionReminder,
    /// Detected opportunity to save
    SavingsOpportunity,
    /// Gamification badge earned
    Achievement,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Fraud => "fraud",
            AlertType::UnusualSpending => "unusual_spending",
            AlertType::BudgetWarning => "budget_warning",
            AlertType::BudgetExceeded => "budget_exceeded",
            AlertType::GoalMilestone => "goal_milestone",
            AlertType::SubscriptionReminder => "subscription_reminder",
            AlertType::SavingsOpportunity => "savings_opportunity",
            AlertType::Achievement => "achievement",
        }
    }

    /// Parse a wire-format type string, e.g. from a query parameter.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fraud" => Some(AlertType::Fraud),
            "unusual_spending" => Some(AlertType::UnusualSpending),
            "budget_warning" => Some(AlertType::BudgetWarning),
            "budget_exceeded" => Some(AlertType::BudgetExceeded),
            "goal_milestone" => Some(AlertType::GoalMilestone),
            "subscription_reminder" => Some(AlertType::SubscriptionReminder),
            "savings_opportunity" => Some(AlertType::SavingsOpportunity),
            "achievement" => Some(AlertType::Achievement),
            _ => None,
        }
    }
}

/// Alert severity level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Fraud score at or above this is delivered as critical.
const FRAUD_CRITICAL_SCORE: f64 = 0.8;

/// Persisted notification record with a typed payload and read state.
///
/// Immutable after creation except for the `read` flag, which only ever
/// transitions false -> true. The `data` field carries the variant-specific
/// payload flattened into one wire shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    /// Server-generated unique id
    pub alert_id: String,

    /// Owner user id
    pub user_id: String,

    #[serde(rename = "type")]
    pub alert_type: AlertType,

    pub severity: Severity,

    pub title: String,

    pub message: String,

    /// Creation instant, RFC 3339 on the wire
    pub timestamp: DateTime<Utc>,

    /// Variant-specific structured payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Optional client navigation target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,

    #[serde(default)]
    pub read: bool,
}

impl Alert {
    /// Build a base alert with a fresh id and the current instant.
    pub fn custom(
        user_id: impl Into<String>,
        alert_type: AlertType,
        severity: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            alert_id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            alert_type,
            severity,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            data: None,
            action_url: None,
            read: false,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    /// Fraud alert for a flagged transaction.
    pub fn fraud(
        user_id: impl Into<String>,
        fraud_score: f64,
        fraud_indicators: Vec<String>,
        transaction_id: impl Into<String>,
        amount: f64,
        vendor: impl Into<String>,
    ) -> Self {
        let transaction_id = transaction_id.into();
        let vendor = vendor.into();
        let severity = if fraud_score >= FRAUD_CRITICAL_SCORE {
            Severity::Critical
        } else {
            Severity::Warning
        };

        let message = format!(
            "A transaction of ${:.2} at {} was flagged as potentially fraudulent (risk score {:.0}%)",
            amount,
            vendor,
            fraud_score * 100.0
        );

        Alert::custom(
            user_id,
            AlertType::Fraud,
            severity,
            "Suspicious transaction detected",
            message,
        )
        .with_data(json!({
            "fraud_score": fraud_score,
            "fraud_indicators": fraud_indicators,
            "transaction_id": transaction_id,
            "amount": amount,
            "vendor": vendor,
        }))
    }

    /// Budget alert for a spending category. Picks warning vs exceeded from
    /// how much of the limit has been used.
    pub fn budget(
        user_id: impl Into<String>,
        category: impl Into<String>,
        spent: f64,
        budget_limit: f64,
    ) -> Self {
        let category = category.into();
        let percentage_used = if budget_limit <= 0.0 {
            0.0
        } else {
            spent / budget_limit * 100.0
        };

        let (alert_type, severity, title) = if percentage_used >= 100.0 {
            (
                AlertType::BudgetExceeded,
                Severity::Critical,
                format!("Budget exceeded: {}", category),
            )
        } else {
            (
                AlertType::BudgetWarning,
                Severity::Warning,
                format!("Budget warning: {}", category),
            )
        };

        let message = format!(
            "You've spent ${:.2} of your ${:.2} {} budget ({:.0}%)",
            spent, budget_limit, category, percentage_used
        );

        Alert::custom(user_id, alert_type, severity, title, message).with_data(json!({
            "category": category,
            "spent": spent,
            "budget_limit": budget_limit,
            "percentage_used": percentage_used,
        }))
    }

    /// Achievement alert for an earned badge.
    pub fn achievement(
        user_id: impl Into<String>,
        badge_name: impl Into<String>,
        badge_icon: impl Into<String>,
        points_earned: i64,
    ) -> Self {
        let badge_name = badge_name.into();
        let badge_icon = badge_icon.into();

        let message = format!(
            "You earned the {} badge (+{} points)",
            badge_name, points_earned
        );

        Alert::custom(
            user_id,
            AlertType::Achievement,
            Severity::Info,
            "Achievement unlocked!",
            message,
        )
        .with_data(json!({
            "badge_name": badge_name,
            "badge_icon": badge_icon,
            "points_earned": points_earned,
        }))
    }
}
