//! Integration tests for the simulation loop.
//!
//! Covers the canonical accounting scenarios: margin lock on open, margin +
//! PnL release on close, missing-history abort, same-bar double-fill
//! prevention, liquidation, the time stop, and full-run determinism.

use chrono::{DateTime, Duration, TimeZone, Utc};
use leverlab_core::data::{random_walk, InMemorySource};
use leverlab_core::domain::{Bar, Side, SymbolMeta, Timeframe, TradeAction};
use leverlab_core::engine::{
    run_simulation, EngineConfig, FeeSchedule, SymbolConfig,
};
use leverlab_core::strategy::{ExitPlan, RiskContext, Strategy, StrategyConfig, Trend};
use leverlab_core::EngineError;

const SYMBOL: &str = "BTC-USDT";

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Hourly bars from explicit (open, high, low, close) tuples.
fn bars_from_ohlc(ohlc: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    ohlc.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            let open_time = start_time() + Duration::hours(i as i64);
            Bar {
                symbol: SYMBOL.into(),
                timeframe: Timeframe::H1,
                open,
                high,
                low,
                close,
                volume: 100.0,
                open_time,
                close_time: open_time + Duration::hours(1),
            }
        })
        .collect()
}

fn flat_bars(price: f64, n: usize) -> Vec<Bar> {
    bars_from_ohlc(&vec![(price, price, price, price); n])
}

fn config_for(bars: &[Bar], leverage: f64, taker_rate: f64) -> EngineConfig {
    let mut config = EngineConfig::new(
        10_000.0,
        start_time(),
        bars.last().unwrap().close_time,
    );
    config.fees = FeeSchedule {
        maker_rate: taker_rate,
        taker_rate,
    };
    config
        .symbols
        .push(SymbolConfig::new(SymbolMeta::new(SYMBOL, 2, 4), Timeframe::H1, leverage));
    config
}

fn source_with(bars: Vec<Bar>) -> InMemorySource {
    let mut source = InMemorySource::new();
    source.insert(SYMBOL, Timeframe::H1, bars);
    source
}

/// Always-buy test strategy with a fixed size and a scripted exit plan.
struct ScriptedLong {
    size: f64,
    take_profit: Option<f64>,
    stop_loss: Option<f64>,
}

impl Strategy for ScriptedLong {
    fn name(&self) -> &'static str {
        "scripted_long"
    }
    fn warmup(&self) -> usize {
        1
    }
    fn should_buy(&self, _bars: &[Bar]) -> bool {
        true
    }
    fn should_sell(&self, _bars: &[Bar]) -> bool {
        false
    }
    fn trend(&self, _bars: &[Bar]) -> Trend {
        Trend::Neutral
    }
    fn exit_plan(&self, _entry: f64, _bars: &[Bar], _meta: &SymbolMeta, _side: Side) -> ExitPlan {
        ExitPlan {
            take_profits: self.take_profit.into_iter().collect(),
            stop_loss: self.stop_loss,
        }
    }
    fn position_size(&self, _ctx: &RiskContext) -> f64 {
        self.size
    }
}

#[test]
fn scenario_a_open_locks_margin() {
    // Wallet 10,000; open long 1 @ 100 with leverage 1. Margin must be 100
    // and available 9,900 minus the taker fee.
    let bars = flat_bars(100.0, 5);
    let config = config_for(&bars, 1.0, 0.001);
    let source = source_with(bars);
    let strategy = ScriptedLong {
        size: 1.0,
        take_profit: None,
        stop_loss: None,
    };

    let output = run_simulation(&config, &source, &strategy, None).unwrap();

    let position = output.wallet.position(SYMBOL).unwrap();
    assert!((position.margin - 100.0).abs() < 1e-9);
    assert!((position.size - 1.0).abs() < 1e-9);
    let fee = 100.0 * 0.001;
    assert!((output.wallet.available - (10_000.0 - 100.0 - fee)).abs() < 1e-9);
    assert!((output.wallet.total - (10_000.0 - fee)).abs() < 1e-9);
    assert_eq!(output.trades.len(), 1);
    assert_eq!(output.trades[0].action, TradeAction::Open);
}

#[test]
fn scenario_b_close_releases_margin_plus_pnl() {
    // Open long 1 @ 100, take-profit at 110; price walks up through it.
    let bars = bars_from_ohlc(&[
        (100.0, 100.0, 100.0, 100.0),
        (100.0, 104.0, 100.0, 104.0),
        (104.0, 112.0, 104.0, 111.0),
        (111.0, 111.0, 111.0, 111.0),
    ]);
    let config = config_for(&bars, 1.0, 0.001);
    let source = source_with(bars);
    let strategy = ScriptedLong {
        size: 1.0,
        take_profit: Some(110.0),
        stop_loss: None,
    };

    let output = run_simulation(&config, &source, &strategy, None).unwrap();

    let close = output
        .trades
        .iter()
        .find(|t| t.action == TradeAction::Close)
        .expect("take-profit must fill");
    assert!((close.realized_pnl - 10.0).abs() < 1e-9);
    assert!((close.price - 110.0).abs() < 1e-9);

    let open_fee = 100.0 * 0.001;
    let close_fee = 110.0 * 0.001;
    // Position re-opens at the next aligned tick; check the balance on the
    // closing row instead of the final wallet.
    assert!((close.balance - (10_000.0 + 10.0 - open_fee - close_fee)).abs() < 1e-9);
    assert_eq!(output.report.total_wins, 1);
}

#[test]
fn scenario_d_missing_history_aborts() {
    let bars = flat_bars(100.0, 5);
    let config = config_for(&bars, 1.0, 0.001);
    let source = InMemorySource::new(); // nothing loaded
    let strategy = ScriptedLong {
        size: 1.0,
        take_profit: None,
        stop_loss: None,
    };

    let err = run_simulation(&config, &source, &strategy, None).unwrap_err();
    assert!(matches!(err, EngineError::MissingHistory { .. }));
}

#[test]
fn same_bar_take_profit_and_stop_fill_once() {
    // Entry at 100 with TP 103 and stop 97. The third bar spans both
    // levels; exactly one of them may fill, and price-descending evaluation
    // picks the take-profit.
    let bars = bars_from_ohlc(&[
        (100.0, 100.0, 100.0, 100.0),
        (100.0, 100.0, 100.0, 100.0),
        (100.0, 105.0, 95.0, 99.0),
        (99.0, 99.0, 99.0, 99.0),
    ]);
    let config = config_for(&bars, 1.0, 0.0);
    let source = source_with(bars);
    let strategy = ScriptedLong {
        size: 1.0,
        take_profit: Some(103.0),
        stop_loss: Some(97.0),
    };

    let output = run_simulation(&config, &source, &strategy, None).unwrap();

    let exits: Vec<_> = output
        .trades
        .iter()
        .filter(|t| t.action == TradeAction::Close)
        .collect();
    assert_eq!(exits.len(), 1);
    assert!((exits[0].price - 103.0).abs() < 1e-9);
    assert_eq!(exits[0].side, Side::Short);
}

#[test]
fn under_margined_position_is_liquidated() {
    // Long 1 @ 100 at 10x leverage: margin 10. A crash to 90 wipes the
    // margin (PnL -10), leaving equity 0 below maintenance (0.45).
    let bars = bars_from_ohlc(&[
        (100.0, 100.0, 100.0, 100.0),
        (100.0, 100.0, 100.0, 100.0),
        (100.0, 100.0, 90.0, 90.0),
        (90.0, 90.0, 90.0, 90.0),
    ]);
    let config = config_for(&bars, 10.0, 0.0);
    let source = source_with(bars);
    let strategy = ScriptedLong {
        size: 1.0,
        take_profit: None,
        stop_loss: None,
    };

    let output = run_simulation(&config, &source, &strategy, None).unwrap();

    let liquidation = output
        .trades
        .iter()
        .find(|t| t.action == TradeAction::Liquidate)
        .expect("crash must liquidate the position");
    assert!((liquidation.price - 90.0).abs() < 1e-9);
    assert_eq!(output.report.total_liquidations, 1);
}

#[test]
fn liquidation_cancels_pending_exit_orders() {
    // Entry at 100 (10x) with TP 103 and stop 97 pending. The crash bar
    // spans the stop, but liquidation runs first and must cancel both
    // orders; a surviving stop would fill against the flat position and
    // open a short.
    let bars = bars_from_ohlc(&[
        (100.0, 100.0, 100.0, 100.0),
        (100.0, 100.0, 100.0, 100.0),
        (100.0, 100.0, 90.0, 90.0),
        (90.0, 90.0, 90.0, 90.0),
        (90.0, 90.0, 90.0, 90.0),
        (90.0, 90.0, 90.0, 90.0),
    ]);
    let config = config_for(&bars, 10.0, 0.0);
    let source = source_with(bars);
    let strategy = ScriptedLong {
        size: 1.0,
        take_profit: Some(103.0),
        stop_loss: Some(97.0),
    };

    let output = run_simulation(&config, &source, &strategy, None).unwrap();

    let liquidations = output
        .trades
        .iter()
        .filter(|t| t.action == TradeAction::Liquidate)
        .count();
    assert_eq!(liquidations, 1);

    // Neither exit level may ever fill; the only trades are long entries
    // and the forced close.
    assert!(output
        .trades
        .iter()
        .all(|t| (t.price - 97.0).abs() > 1e-9 && (t.price - 103.0).abs() > 1e-9));
    assert!(output.trades.iter().all(|t| t.action != TradeAction::Close));
    assert!(output
        .trades
        .iter()
        .filter(|t| t.action == TradeAction::Open)
        .all(|t| t.side == Side::Long));
}

#[test]
fn time_stop_closes_stale_position() {
    let bars = flat_bars(100.0, 12);
    let mut config = config_for(&bars, 1.0, 0.0);
    config.max_holding_bars = Some(3);
    let source = source_with(bars);
    let strategy = ScriptedLong {
        size: 1.0,
        take_profit: None,
        stop_loss: None,
    };

    let output = run_simulation(&config, &source, &strategy, None).unwrap();

    // The position must have been market-closed at least once by the
    // countdown (and then re-opened by the always-buy strategy).
    assert!(output
        .trades
        .iter()
        .any(|t| t.action == TradeAction::Close));
}

#[test]
fn insufficient_balance_rejects_entry_and_run_continues() {
    let bars = flat_bars(100.0, 5);
    let config = config_for(&bars, 1.0, 0.001);
    let source = source_with(bars);
    // 10,000 available cannot margin a 200-unit position at 100.
    let strategy = ScriptedLong {
        size: 200.0,
        take_profit: None,
        stop_loss: None,
    };

    let output = run_simulation(&config, &source, &strategy, None).unwrap();
    assert!(output.trades.is_empty());
    assert_eq!(output.wallet.total, 10_000.0);
    assert_eq!(output.report.roi, 0.0);
}

#[test]
fn identical_runs_produce_identical_output() {
    let bars = random_walk(SYMBOL, Timeframe::H1, start_time(), 500, 42, 100.0, 0.02);
    let mut config = config_for(&bars, 3.0, 0.0005);
    config.initial_balance = 25_000.0;
    let source = source_with(bars);
    let strategy = StrategyConfig::MaCross {
        short_period: 5,
        long_period: 20,
        trend_period: 50,
        take_profit_pct: 0.04,
        stop_loss_pct: 0.02,
        risk_fraction: 0.2,
    }
    .build();

    let first = run_simulation(&config, &source, strategy.as_ref(), None).unwrap();
    let second = run_simulation(&config, &source, strategy.as_ref(), None).unwrap();

    assert_eq!(
        serde_json::to_string(&first.trades).unwrap(),
        serde_json::to_string(&second.trades).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&first.report).unwrap(),
        serde_json::to_string(&second.report).unwrap()
    );
}

#[test]
fn equity_curve_tracks_every_tick_with_history() {
    let bars = flat_bars(100.0, 8);
    let config = config_for(&bars, 1.0, 0.0);
    let source = source_with(bars);
    let strategy = ScriptedLong {
        size: 0.0, // never trades
        take_profit: None,
        stop_loss: None,
    };

    let output = run_simulation(&config, &source, &strategy, None).unwrap();
    assert_eq!(output.equity_curve.len(), 8);
    assert!(output
        .equity_curve
        .iter()
        .all(|s| s.total_balance == 10_000.0));
}
