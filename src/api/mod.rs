//! ShareASale affiliate API
//!
//! Types describing a report request (action, date range, credentials) and the
//! submodules that sign it, send it, and turn the XML reply into a tree.

pub mod client;
pub mod request;
pub mod transport;
pub mod xml;

pub use client::{ApiError, ReportClient};
pub use request::{build_request, SignedRequest};
pub use transport::{HttpTransport, Transport};
pub use xml::{parse_xml, ApiResponse};

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};

/// Date format used by every ShareASale date parameter (`mm/dd/yyyy`)
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Formats a date the way the API expects it
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Affiliate credentials issued by ShareASale
///
/// Nothing here is validated locally; bad values surface as an upstream error.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub affiliate_id: String,
    pub api_token: String,
    pub secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("affiliate_id", &self.affiliate_id)
            .field("api_token", &mask(&self.api_token))
            .field("secret_key", &mask(&self.secret_key))
            .finish()
    }
}

/// Hides all but the last four characters of a secret
pub fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return String::new();
    }
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}

/// Report action requested from the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ApiAction {
    #[default]
    Traffic,
    Activity,
    PaymentSummary,
    ApiTokenCount,
    /// Any other action name, passed through verbatim
    Other(String),
}

impl ApiAction {
    /// Name of the action on the wire
    pub fn as_str(&self) -> &str {
        match self {
            ApiAction::Traffic => "traffic",
            ApiAction::Activity => "activity",
            ApiAction::PaymentSummary => "paymentSummary",
            ApiAction::ApiTokenCount => "apitokencount",
            ApiAction::Other(name) => name,
        }
    }

    /// Whether the action takes a `dateStart`/`dateEnd` range
    pub fn uses_date_range(&self) -> bool {
        matches!(self, ApiAction::Traffic | ApiAction::Activity)
    }

    /// Whether the action takes a `paymentDate`
    pub fn uses_payment_date(&self) -> bool {
        matches!(self, ApiAction::PaymentSummary)
    }
}

impl FromStr for ApiAction {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "traffic" => ApiAction::Traffic,
            "activity" => ApiAction::Activity,
            "paymentSummary" => ApiAction::PaymentSummary,
            "apitokencount" => ApiAction::ApiTokenCount,
            other => ApiAction::Other(other.to_string()),
        })
    }
}

impl fmt::Display for ApiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments for a single report request, as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestArgs {
    pub action: ApiAction,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
}

impl RequestArgs {
    /// Creates arguments for an action with no explicit dates
    pub fn new(action: ApiAction) -> Self {
        Self {
            action,
            ..Self::default()
        }
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_start = Some(start);
        self.date_end = Some(end);
        self
    }

    pub fn with_payment_date(mut self, date: NaiveDate) -> Self {
        self.payment_date = Some(date);
        self
    }

    /// Fills in the dates the action needs but the caller left out
    ///
    /// Traffic and activity default to the whole month containing `today`;
    /// payment summaries default to the day before `today`.
    pub fn resolve(&self, today: NaiveDate) -> ResolvedArgs {
        let mut resolved = ResolvedArgs {
            action: self.action.clone(),
            date_start: self.date_start,
            date_end: self.date_end,
            payment_date: self.payment_date,
        };

        if self.action.uses_date_range() {
            resolved.date_start.get_or_insert_with(|| first_day_of_month(today));
            resolved.date_end.get_or_insert_with(|| last_day_of_month(today));
        }
        if self.action.uses_payment_date() {
            resolved
                .payment_date
                .get_or_insert_with(|| today - Duration::days(1));
        }

        resolved
    }
}

/// Request arguments after date defaulting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArgs {
    pub action: ApiAction,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
}

impl ResolvedArgs {
    /// Derives the cache key for these arguments
    ///
    /// Fields are collected into a sorted map before serializing, so the key
    /// depends only on the values and never on the order they were set in.
    pub fn cache_key(&self) -> String {
        let mut fields: BTreeMap<&str, String> = BTreeMap::new();
        fields.insert("action", self.action.as_str().to_string());
        if let Some(date) = self.date_start {
            fields.insert("date_start", format_date(date));
        }
        if let Some(date) = self.date_end {
            fields.insert("date_end", format_date(date));
        }
        if let Some(date) = self.payment_date {
            fields.insert("payment_date", format_date(date));
        }

        let serialized = serde_json::to_string(&fields).unwrap_or_default();
        format!("{}-{}", self.action, serialized)
    }
}

fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}
