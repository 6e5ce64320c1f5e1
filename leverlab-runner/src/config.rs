//! Serializable run configuration.
//!
//! A `RunConfig` captures everything needed to reproduce one backtest:
//! account settings, fee and maintenance rates, the traded symbols, the
//! strategy selection, and the hyperparameter table the sweep draws from.
//! Loadable from TOML; hashable into a deterministic run id.

use chrono::{DateTime, Utc};
use leverlab_core::domain::{SymbolMeta, Timeframe};
use leverlab_core::engine::{EngineConfig, FeeSchedule, SymbolConfig, TieBreak};
use leverlab_core::strategy::StrategyConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

/// One traded symbol's settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolSettings {
    pub symbol: String,
    pub price_decimals: u32,
    pub quantity_decimals: u32,
    pub trading_timeframe: Timeframe,
    /// Additional timeframes to maintain windows for (e.g. a finer matching
    /// timeframe). The trading timeframe is always included.
    #[serde(default)]
    pub extra_timeframes: Vec<Timeframe>,
    pub leverage: f64,
}

impl SymbolSettings {
    fn to_symbol_config(&self) -> SymbolConfig {
        let meta = SymbolMeta::new(&self.symbol, self.price_decimals, self.quantity_decimals);
        let mut config = SymbolConfig::new(meta, self.trading_timeframe, self.leverage);
        for &tf in &self.extra_timeframes {
            if !config.timeframes.contains(&tf) {
                config.timeframes.push(tf);
            }
        }
        config
    }
}

/// Optimization range for one hyperparameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamRange {
    /// Numeric `[min, max]` swept with a fixed step (inclusive of max when
    /// it lands on a step).
    Span { min: f64, max: f64, step: f64 },
    /// Explicit value set.
    Values { values: Vec<f64> },
}

/// One entry of the hyperparameter table: a base value plus an optional
/// range to optimize over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamSpec {
    pub value: f64,
    #[serde(default)]
    pub range: Option<ParamRange>,
}

impl ParamSpec {
    pub fn fixed(value: f64) -> Self {
        Self { value, range: None }
    }

    /// All candidate values this parameter contributes to the grid.
    pub fn candidates(&self) -> Vec<f64> {
        match &self.range {
            None => vec![self.value],
            Some(ParamRange::Values { values }) => {
                if values.is_empty() {
                    vec![self.value]
                } else {
                    values.clone()
                }
            }
            Some(ParamRange::Span { min, max, step }) => {
                if *step <= 0.0 || max < min {
                    return vec![self.value];
                }
                let mut out = Vec::new();
                let mut v = *min;
                let epsilon = step * 1e-9;
                while v <= *max + epsilon {
                    out.push(v);
                    v += step;
                }
                out
            }
        }
    }
}

/// Full configuration for one backtest run (and the base for a sweep).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub initial_balance: f64,
    pub start: DateTime<Utc>,
    /// Inclusive end of the simulated clock.
    pub end: DateTime<Utc>,
    pub maker_rate: f64,
    pub taker_rate: f64,
    #[serde(default = "default_maintenance_rate")]
    pub maintenance_rate: f64,
    #[serde(default = "default_max_window")]
    pub max_window: usize,
    #[serde(default)]
    pub max_holding_bars: Option<u32>,
    /// Evaluation order for same-bar order collisions.
    #[serde(default)]
    pub tie_break: TieBreak,
    pub symbols: Vec<SymbolSettings>,
    pub strategy: StrategyConfig,
    /// Hyperparameter table; keys must match the strategy's field names.
    #[serde(default)]
    pub params: BTreeMap<String, ParamSpec>,
}

fn default_maintenance_rate() -> f64 {
    leverlab_core::engine::DEFAULT_MAINTENANCE_RATE
}

fn default_max_window() -> usize {
    leverlab_core::engine::window::DEFAULT_MAX_WINDOW
}

impl RunConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: RunConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("no symbols configured".into()));
        }
        if self.end < self.start {
            return Err(ConfigError::Invalid("end date before start date".into()));
        }
        if self.initial_balance <= 0.0 {
            return Err(ConfigError::Invalid("initial balance must be positive".into()));
        }
        Ok(())
    }

    /// Deterministic hash id over the canonical JSON of this config.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn to_engine_config(&self) -> EngineConfig {
        let mut engine = EngineConfig::new(self.initial_balance, self.start, self.end);
        engine.fees = FeeSchedule {
            maker_rate: self.maker_rate,
            taker_rate: self.taker_rate,
        };
        engine.maintenance_rate = self.maintenance_rate;
        engine.max_window = self.max_window;
        engine.tie_break = self.tie_break;
        engine.max_holding_bars = self.max_holding_bars;
        engine.symbols = self.symbols.iter().map(|s| s.to_symbol_config()).collect();
        engine
    }

    /// Rebuild the strategy selection with hyperparameter overrides applied.
    /// Unknown keys are ignored; period-like fields are rounded to whole
    /// bars.
    pub fn strategy_with_overrides(&self, overrides: &BTreeMap<String, f64>) -> StrategyConfig {
        let get_usize = |key: &str, default: usize| -> usize {
            overrides
                .get(key)
                .map(|v| v.round().max(1.0) as usize)
                .unwrap_or(default)
        };
        let get_f64 =
            |key: &str, default: f64| -> f64 { overrides.get(key).copied().unwrap_or(default) };

        match &self.strategy {
            StrategyConfig::MaCross {
                short_period,
                long_period,
                trend_period,
                take_profit_pct,
                stop_loss_pct,
                risk_fraction,
            } => StrategyConfig::MaCross {
                short_period: get_usize("short_period", *short_period),
                long_period: get_usize("long_period", *long_period),
                trend_period: get_usize("trend_period", *trend_period),
                take_profit_pct: get_f64("take_profit_pct", *take_profit_pct),
                stop_loss_pct: get_f64("stop_loss_pct", *stop_loss_pct),
                risk_fraction: get_f64("risk_fraction", *risk_fraction),
            },
            StrategyConfig::Breakout {
                channel_period,
                atr_period,
                stop_atr,
                take_profit_atr,
                risk_fraction,
            } => StrategyConfig::Breakout {
                channel_period: get_usize("channel_period", *channel_period),
                atr_period: get_usize("atr_period", *atr_period),
                stop_atr: get_f64("stop_atr", *stop_atr),
                take_profit_atr: get_f64("take_profit_atr", *take_profit_atr),
                risk_fraction: get_f64("risk_fraction", *risk_fraction),
            },
        }
    }
}
