//! Command-line interface parsing for the ShareASale reports CLI
//!
//! This module handles parsing of CLI arguments using clap: report fetching
//! with optional `mm/dd/yyyy` dates, settings management and cache clearing.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::api::{ApiAction, RequestArgs, DATE_FORMAT};
use crate::config::StoredSettings;
use crate::report::{RenderOptions, DEFAULT_PAGE_LIMIT};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The date is not in the API's `mm/dd/yyyy` format
    #[error("Invalid date: '{0}'. Expected mm/dd/yyyy, e.g. 03/15/2024")]
    InvalidDate(String),
}

/// ShareASale reports - view cached affiliate traffic, activity and payments
#[derive(Parser, Debug)]
#[command(name = "shareasale")]
#[command(about = "View ShareASale affiliate reports with on-disk caching")]
#[command(version)]
pub struct Cli {
    /// Settings file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a report (traffic, activity, paymentSummary, apitokencount, ...)
    Report(ReportArgs),
    /// Show how many API calls remain this month
    TokenCount(OutputArgs),
    /// Show or change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    /// Manage the report cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

/// Arguments for `report`
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Report action name as the API expects it
    #[arg(default_value = "traffic")]
    pub action: String,

    /// First day of the range (traffic, activity); defaults to the first of this month
    #[arg(long, value_name = "MM/DD/YYYY", value_parser = parse_date_arg)]
    pub date_start: Option<NaiveDate>,

    /// Last day of the range (traffic, activity); defaults to the end of this month
    #[arg(long, value_name = "MM/DD/YYYY", value_parser = parse_date_arg)]
    pub date_end: Option<NaiveDate>,

    /// Payment date (paymentSummary); defaults to yesterday
    #[arg(long, value_name = "MM/DD/YYYY", value_parser = parse_date_arg)]
    pub payment_date: Option<NaiveDate>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl ReportArgs {
    /// Converts the parsed arguments into a report request
    pub fn to_request_args(&self) -> RequestArgs {
        let action: ApiAction = self.action.parse().unwrap_or_default();
        RequestArgs {
            action,
            date_start: self.date_start,
            date_end: self.date_end,
            payment_date: self.payment_date,
        }
    }
}

/// Output and caching flags shared by report commands
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Bypass the cache for this call (counts against the monthly quota)
    #[arg(long)]
    pub no_cache: bool,

    /// Print the report tree as JSON
    #[arg(long)]
    pub json: bool,

    /// Page of repeated rows to show
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub page: u64,

    /// Rows per page
    #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT as u64, value_parser = clap::value_parser!(u64).range(1..))]
    pub limit: u64,
}

impl OutputArgs {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            page: usize::try_from(self.page).unwrap_or(usize::MAX),
            limit: usize::try_from(self.limit).unwrap_or(usize::MAX),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the effective settings (secrets masked)
    Show,
    /// Store new setting values
    Set(SettingsSetArgs),
}

/// Values accepted by `settings set`
#[derive(Args, Debug)]
pub struct SettingsSetArgs {
    #[arg(long)]
    pub affiliate_id: Option<String>,
    #[arg(long)]
    pub api_token: Option<String>,
    #[arg(long)]
    pub secret_key: Option<String>,
    /// Enable or disable report caching
    #[arg(long, value_name = "true|false")]
    pub caching: Option<bool>,
    /// Seconds to keep a cached report
    #[arg(long, value_name = "SECS")]
    pub cache_time: Option<u64>,
    /// Seconds to wait on the API before giving up
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
    /// Directory for cached reports
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,
}

impl SettingsSetArgs {
    /// Converts the given flags into a settings layer
    pub fn to_stored(&self) -> StoredSettings {
        StoredSettings {
            affiliate_id: self.affiliate_id.clone(),
            api_token: self.api_token.clone(),
            secret_key: self.secret_key.clone(),
            caching: self.caching,
            cache_time: self.cache_time,
            timeout_secs: self.timeout,
            cache_dir: self.cache_dir.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_stored() == StoredSettings::default()
    }
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Delete every cached report
    Clear,
}

/// Parses a `mm/dd/yyyy` date argument.
///
/// # Arguments
/// * `s` - The date string from CLI
///
/// # Returns
/// * `Ok(NaiveDate)` if the string is a valid calendar date
/// * `Err(CliError::InvalidDate)` otherwise
pub fn parse_date_arg(s: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| CliError::InvalidDate(s.to_string()))
}

/// Builds the request for `token-count`
pub fn token_count_args() -> RequestArgs {
    RequestArgs::new(ApiAction::ApiTokenCount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_arg_valid() {
        assert_eq!(
            parse_date_arg("03/15/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
        assert_eq!(
            parse_date_arg("3/5/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
    }

    #[test]
    fn test_parse_date_arg_invalid() {
        for input in ["2024-03-15", "13/01/2024", "02/30/2024", "yesterday"] {
            let err = parse_date_arg(input).unwrap_err();
            assert!(err.to_string().contains("mm/dd/yyyy"));
            assert!(err.to_string().contains(input));
        }
    }

    #[test]
    fn test_cli_parse_report_defaults_to_traffic() {
        let cli = Cli::parse_from(["shareasale", "report"]);
        let Command::Report(args) = cli.command else {
            panic!("expected report command");
        };

        assert_eq!(args.to_request_args(), RequestArgs::new(ApiAction::Traffic));
        assert!(!args.output.no_cache);
        assert_eq!(args.output.page, 1);
        assert_eq!(args.output.limit, DEFAULT_PAGE_LIMIT as u64);
    }

    #[test]
    fn test_cli_parse_report_with_dates() {
        let cli = Cli::parse_from([
            "shareasale",
            "report",
            "activity",
            "--date-start",
            "03/01/2024",
            "--date-end",
            "03/07/2024",
            "--json",
        ]);
        let Command::Report(args) = cli.command else {
            panic!("expected report command");
        };

        let request = args.to_request_args();
        assert_eq!(request.action, ApiAction::Activity);
        assert_eq!(request.date_start, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(request.date_end, NaiveDate::from_ymd_opt(2024, 3, 7));
        assert!(args.output.json);
    }

    #[test]
    fn test_cli_parse_unknown_action_passes_through() {
        let cli = Cli::parse_from(["shareasale", "report", "merchantStatus"]);
        let Command::Report(args) = cli.command else {
            panic!("expected report command");
        };

        assert_eq!(
            args.to_request_args().action,
            ApiAction::Other("merchantStatus".to_string())
        );
    }

    #[test]
    fn test_cli_rejects_bad_date_and_zero_page() {
        assert!(Cli::try_parse_from(["shareasale", "report", "--date-start", "2024-03-01"]).is_err());
        assert!(Cli::try_parse_from(["shareasale", "report", "--page", "0"]).is_err());
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["shareasale", "token-count", "--config", "/tmp/s.json", "-vv"]);

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.json")));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::TokenCount(_)));
        assert_eq!(token_count_args().action, ApiAction::ApiTokenCount);
    }

    #[test]
    fn test_settings_set_builds_stored_layer() {
        let cli = Cli::parse_from([
            "shareasale",
            "settings",
            "set",
            "--affiliate-id",
            "123",
            "--caching",
            "false",
            "--cache-time",
            "600",
        ]);
        let Command::Settings {
            action: SettingsCommand::Set(args),
        } = cli.command
        else {
            panic!("expected settings set");
        };

        let stored = args.to_stored();
        assert_eq!(stored.affiliate_id.as_deref(), Some("123"));
        assert_eq!(stored.caching, Some(false));
        assert_eq!(stored.cache_time, Some(600));
        assert!(stored.api_token.is_none());
        assert!(!args.is_empty());
    }

    #[test]
    fn test_settings_set_without_flags_is_empty() {
        let cli = Cli::parse_from(["shareasale", "settings", "set"]);
        let Command::Settings {
            action: SettingsCommand::Set(args),
        } = cli.command
        else {
            panic!("expected settings set");
        };

        assert!(args.is_empty());
    }

    #[test]
    fn test_settings_set_rejects_zero_timeout() {
        let result = Cli::try_parse_from(["shareasale", "settings", "set", "--timeout", "0"]);
        assert!(result.is_err(), "a zero timeout would fail every request");

        let cli = Cli::parse_from(["shareasale", "settings", "set", "--timeout", "5"]);
        let Command::Settings {
            action: SettingsCommand::Set(args),
        } = cli.command
        else {
            panic!("expected settings set");
        };
        assert_eq!(args.to_stored().timeout_secs, Some(5));
    }
}
