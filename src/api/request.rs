//! Request builder and signer for the ShareASale API
//!
//! Every call carries the credentials in the query string plus two headers: the
//! request timestamp and a SHA-256 digest binding token, timestamp, action and
//! secret key together.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::{format_date, Credentials, ResolvedArgs};

/// Base URL of the ShareASale affiliate API
pub const API_BASE_URL: &str = "https://shareasale.com/x.cfm";

/// API version sent with every request
pub const API_VERSION: &str = "1.8";

/// Header carrying the request timestamp
pub const DATE_HEADER: &str = "x-ShareASale-Date";

/// Header carrying the request signature
pub const AUTH_HEADER: &str = "x-ShareASale-Authentication";

/// Timestamp layout for the date header (RFC 1123 with a numeric zone)
const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

/// A fully formed outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub url: String,
    /// Header name/value pairs: the date header first, then the signature
    pub headers: Vec<(&'static str, String)>,
}

impl SignedRequest {
    /// Looks up a header value by name (case-insensitive)
    #[cfg(test)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Builds the signed request for `args` against `base_url` at time `now`
pub fn build_request(
    base_url: &str,
    credentials: &Credentials,
    args: &ResolvedArgs,
    now: DateTime<Utc>,
) -> SignedRequest {
    let action = args.action.as_str();
    let mut url = format!(
        "{}?affiliateId={}&token={}&version={}&action={}&XMLFormat=1",
        base_url, credentials.affiliate_id, credentials.api_token, API_VERSION, action
    );

    if args.action.uses_date_range() {
        if let (Some(start), Some(end)) = (args.date_start, args.date_end) {
            url.push_str(&format!(
                "&dateStart={}&dateEnd={}",
                format_date(start),
                format_date(end)
            ));
        }
    } else if args.action.uses_payment_date() {
        if let Some(payment_date) = args.payment_date {
            url.push_str(&format!("&paymentDate={}", format_date(payment_date)));
        }
    }

    let timestamp = format_timestamp(now);
    let signature = sign(
        &credentials.api_token,
        &timestamp,
        action,
        &credentials.secret_key,
    );

    SignedRequest {
        url,
        headers: vec![(DATE_HEADER, timestamp), (AUTH_HEADER, signature)],
    }
}

/// Formats the value of the date header
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Computes the authentication digest: hex SHA-256 of `token:timestamp:action:secret`
pub fn sign(token: &str, timestamp: &str, action: &str, secret_key: &str) -> String {
    let payload = format!("{}:{}:{}:{}", token, timestamp, action, secret_key);
    hex::encode(Sha256::digest(payload.as_bytes()))
}
