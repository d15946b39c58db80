use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::model::{Granularity, HistoryWindow};
use crate::series::DEFAULT_MIN_POINTS;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".into()
}

fn default_static_dir() -> String {
    "static".into()
}

fn default_base_url() -> String {
    "https://api.coingecko.com/api/v3".into()
}

fn default_vs_currency() -> String {
    "usd".into()
}

fn default_history_days() -> u32 {
    365
}

fn default_granularity() -> String {
    "1d".into()
}

fn default_requests_per_minute() -> u32 {
    25
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_min_points() -> usize {
    DEFAULT_MIN_POINTS
}

fn default_ma_periods() -> Vec<usize> {
    vec![20, 50, 200]
}

fn default_rsi_period() -> usize {
    14
}

fn default_range_window() -> usize {
    30
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Directory holding `index.html` for the browser terminal.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            static_dir: default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,
    #[serde(default = "default_history_days")]
    pub history_days: u32,
    /// Accepted values: `"1h"` | `"1d"`
    #[serde(default = "default_granularity")]
    pub granularity: String,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// History window to request. Call after validation.
    pub fn history_window(&self) -> HistoryWindow {
        HistoryWindow {
            days: self.history_days,
            granularity: Granularity::from_str(&self.granularity).unwrap_or(Granularity::Daily),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            vs_currency: default_vs_currency(),
            history_days: default_history_days(),
            granularity: default_granularity(),
            requests_per_minute: default_requests_per_minute(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Series shorter than this abort the request.
    #[serde(default = "default_min_points")]
    pub min_points: usize,
    #[serde(default = "default_ma_periods")]
    pub sma_periods: Vec<usize>,
    #[serde(default = "default_ma_periods")]
    pub ema_periods: Vec<usize>,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default)]
    pub macd: MacdConfig,
    #[serde(default)]
    pub bollinger: BollingerConfig,
    #[serde(default)]
    pub volume: VolumeConfig,
    /// Trailing window for the recent low/high range.
    #[serde(default = "default_range_window")]
    pub range_window: usize,
    #[serde(default)]
    pub levels: LevelsConfig,
    #[serde(default)]
    pub trend: TrendConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_points: default_min_points(),
            sma_periods: default_ma_periods(),
            ema_periods: default_ma_periods(),
            rsi_period: default_rsi_period(),
            macd: MacdConfig::default(),
            bollinger: BollingerConfig::default(),
            volume: VolumeConfig::default(),
            range_window: default_range_window(),
            levels: LevelsConfig::default(),
            trend: TrendConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MacdConfig {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BollingerConfig {
    pub period: usize,
    pub std_dev_multiplier: f64,
}

impl Default for BollingerConfig {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub period: usize,
    /// Latest volume above `surge_multiplier * average` counts as a surge.
    pub surge_multiplier: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            period: 20,
            surge_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct LevelsConfig {
    /// Half-width of the local-extremum window.
    pub radius: usize,
    /// Relative distance under which two levels count as the same level.
    pub tolerance: f64,
    /// Maximum levels reported per side.
    pub max_levels: usize,
}

impl Default for LevelsConfig {
    fn default() -> Self {
        Self {
            radius: 3,
            tolerance: 0.005,
            max_levels: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Number of glyphs in the sparkline.
    pub width: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self { width: 60 }
    }
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    parse(&content)
}

/// Like [`load`], but a missing file yields the built-in defaults.
pub fn load_or_default(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    load(path)
}

fn parse(content: &str) -> Result<AppConfig, Report<ConfigError>> {
    let config: AppConfig = toml::from_str(content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_general(config)?;
    validate_provider(config)?;
    validate_periods(config)?;
    validate_levels(config)?;
    validate_trend(config)?;
    Ok(())
}

fn invalid(field: String) -> Report<ConfigError> {
    Report::new(ConfigError::Validation { field })
}

fn validate_general(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if !VALID_LOG_FORMATS.contains(&config.general.log_format.as_str()) {
        return Err(invalid(format!(
            "general.log_format \"{}\" is not valid",
            config.general.log_format
        )));
    }
    Ok(())
}

fn validate_provider(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let provider = &config.provider;
    if Granularity::from_str(&provider.granularity).is_none() {
        return Err(invalid(format!(
            "provider.granularity: unknown granularity \"{}\"",
            provider.granularity
        )));
    }
    if provider.history_days == 0 {
        return Err(invalid("provider.history_days must be > 0".into()));
    }
    if provider.requests_per_minute == 0 {
        return Err(invalid("provider.requests_per_minute must be > 0".into()));
    }
    Ok(())
}

fn validate_periods(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let analysis = &config.analysis;

    if analysis.min_points < 2 {
        return Err(invalid("analysis.min_points must be >= 2".into()));
    }

    let named_periods = analysis
        .sma_periods
        .iter()
        .map(|&p| ("analysis.sma_periods", p))
        .chain(analysis.ema_periods.iter().map(|&p| ("analysis.ema_periods", p)))
        .chain([
            ("analysis.rsi_period", analysis.rsi_period),
            ("analysis.macd.fast", analysis.macd.fast),
            ("analysis.macd.slow", analysis.macd.slow),
            ("analysis.macd.signal", analysis.macd.signal),
            ("analysis.bollinger.period", analysis.bollinger.period),
            ("analysis.volume.period", analysis.volume.period),
            ("analysis.range_window", analysis.range_window),
        ]);
    for (name, period) in named_periods {
        if period == 0 {
            return Err(invalid(format!("{name} must be > 0")));
        }
    }

    if analysis.macd.fast >= analysis.macd.slow {
        return Err(invalid("analysis.macd.fast must be < analysis.macd.slow".into()));
    }
    if !(analysis.bollinger.std_dev_multiplier > 0.0) {
        return Err(invalid(
            "analysis.bollinger.std_dev_multiplier must be > 0".into(),
        ));
    }
    if !(analysis.volume.surge_multiplier > 0.0) {
        return Err(invalid("analysis.volume.surge_multiplier must be > 0".into()));
    }
    Ok(())
}

fn validate_levels(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let levels = &config.analysis.levels;
    if levels.radius == 0 {
        return Err(invalid("analysis.levels.radius must be > 0".into()));
    }
    if !(0.0..1.0).contains(&levels.tolerance) {
        return Err(invalid(format!(
            "analysis.levels.tolerance {} must be in [0, 1)",
            levels.tolerance
        )));
    }
    Ok(())
}

fn validate_trend(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.analysis.trend.width == 0 {
        return Err(invalid("analysis.trend.width must be > 0".into()));
    }
    Ok(())
}
