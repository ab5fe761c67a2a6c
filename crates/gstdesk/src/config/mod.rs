use crate::workflows::deadlines::{
    DeadlineWindows, EngineConfig, SeverityWindow, MAX_TREND_MONTHS,
};
use chrono::{FixedOffset, Offset, Utc};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;

/// Ten years; larger day counts only serve to overflow date arithmetic.
const MAX_WINDOW_DAYS: u32 = 3650;
const WINDOW_DAYS: RangeInclusive<u32> = 0..=MAX_WINDOW_DAYS;
const TREND_MONTHS: RangeInclusive<u32> = 1..=MAX_TREND_MONTHS;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: load_engine()?,
        })
    }
}

fn load_engine() -> Result<EngineConfig, ConfigError> {
    let defaults = EngineConfig::default();
    let windows = DeadlineWindows::default();

    let timezone = match env::var("DEADLINE_TZ_OFFSET") {
        Ok(raw) => parse_offset(&raw).ok_or(ConfigError::InvalidTimezone { value: raw })?,
        Err(_) => defaults.timezone,
    };

    let return_critical = number_or(
        "DEADLINE_RETURN_CRITICAL_DAYS",
        windows.returns.critical_days,
        WINDOW_DAYS,
    )?;

    let include_info = match env::var("DEADLINE_INCLUDE_INFO") {
        Ok(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidValue {
            variable: "DEADLINE_INCLUDE_INFO",
            value: raw,
        })?,
        Err(_) => defaults.include_info,
    };

    Ok(EngineConfig {
        timezone,
        windows: DeadlineWindows {
            returns: SeverityWindow::new(
                return_critical,
                days_or("DEADLINE_RETURN_WARNING_DAYS", windows.returns.warning_days)?,
            ),
            notices: SeverityWindow::new(
                windows.notices.critical_days,
                days_or("DEADLINE_NOTICE_WARNING_DAYS", windows.notices.warning_days)?,
            ),
            invoices: SeverityWindow::new(
                windows.invoices.critical_days,
                days_or("DEADLINE_INVOICE_WARNING_DAYS", windows.invoices.warning_days)?,
            ),
        },
        include_info,
        info_horizon_days: days_or("DEADLINE_INFO_HORIZON_DAYS", defaults.info_horizon_days)?,
        trend_months: number_or(
            "REPORT_TREND_MONTHS",
            Some(defaults.trend_months),
            TREND_MONTHS,
        )?
        .unwrap_or(defaults.trend_months),
    })
}

fn days_or(variable: &'static str, default: u32) -> Result<u32, ConfigError> {
    Ok(number_or(variable, Some(default), WINDOW_DAYS)?.unwrap_or(default))
}

/// Reads a bounded count; an empty value clears an optional threshold.
fn number_or(
    variable: &'static str,
    default: Option<u32>,
    bounds: RangeInclusive<u32>,
) -> Result<Option<u32>, ConfigError> {
    match env::var(variable) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => match raw.trim().parse::<u32>() {
            Ok(value) if bounds.contains(&value) => Ok(Some(value)),
            _ => Err(ConfigError::InvalidValue {
                variable,
                value: raw,
            }),
        },
        Err(_) => Ok(default),
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_offset(value: &str) -> Option<FixedOffset> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
        return Some(Utc.fix());
    }
    trimmed.parse::<FixedOffset>().ok()
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimezone { value: String },
    InvalidValue { variable: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimezone { value } => write!(
                f,
                "DEADLINE_TZ_OFFSET must look like +05:30 or UTC, got '{value}'"
            ),
            ConfigError::InvalidValue { variable, value } => {
                write!(f, "{variable} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimezone { .. }
            | ConfigError::InvalidValue { .. } => None,
        }
    }
}
