//! The simulation loop — replays time tick by tick and drives every other
//! engine component.
//!
//! Per tick, per symbol, in order: advance windows, mark to market, check
//! liquidation, match pending orders against newly closed bars, then — only
//! on ticks aligned to the symbol's trading timeframe — run the time stop
//! and the strategy callbacks. Symbols are processed in configuration order
//! and each symbol's step is self-contained, so one symbol's rejected orders
//! or liquidations never disturb another's evaluation.
//!
//! The loop is single-threaded and synchronous; no real-time delay occurs.

use crate::data::BarSource;
use crate::domain::{Bar, Order, OrderId, OrderKind, OrderStatus, Side, Timeframe, TradeRecord};
use crate::engine::ledger::{Ledger, LedgerEvent};
use crate::engine::liquidation::check_liquidation;
use crate::engine::state::{EngineConfig, EngineState, EquitySample, RunOutput, SymbolConfig};
use crate::engine::stats::StatsAggregator;
use crate::error::EngineError;
use crate::strategy::{RiskContext, Strategy, Trend};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

/// How often (in ticks) the cooperative deadline is polled.
const DEADLINE_POLL_TICKS: u64 = 64;

type SeriesMap<'a> = HashMap<(String, Timeframe), &'a [Bar]>;

/// Run one full simulation from `config.start` to `config.end` inclusive.
///
/// Fatal errors: missing/empty history for any configured (symbol,
/// timeframe), a configuration without symbols, or an expired worker
/// deadline. Everything else is a log line and the run continues.
pub fn run_simulation(
    config: &EngineConfig,
    source: &dyn BarSource,
    strategy: &dyn Strategy,
    deadline: Option<Instant>,
) -> Result<RunOutput, EngineError> {
    let tick_tf = config
        .tick_timeframe()
        .ok_or_else(|| EngineError::InvalidConfig("no symbols configured".into()))?;

    // Scenario D guard: every required series must exist and be non-empty
    // before any trade is attempted.
    let mut series: SeriesMap = HashMap::new();
    for symbol in &config.symbols {
        for &timeframe in &symbol.timeframes {
            let bars = source.required(&symbol.meta.symbol, timeframe)?;
            series.insert((symbol.meta.symbol.clone(), timeframe), bars);
        }
    }

    let ledger = Ledger::new(config.fees);
    let mut state = EngineState::new(config);
    let step = tick_tf.duration();
    let mut clock = config.start;

    while clock <= config.end {
        state.clock = clock;
        state.ticks += 1;

        if let Some(deadline) = deadline {
            if state.ticks % DEADLINE_POLL_TICKS == 0 && Instant::now() >= deadline {
                return Err(EngineError::DeadlineExceeded { ticks: state.ticks });
            }
        }

        let mut any_history = false;
        for symbol in &config.symbols {
            any_history |= step_symbol(config, symbol, &series, &mut state, &ledger, strategy);
        }

        state.wallet.refresh_unrealized();
        if any_history {
            state.equity_curve.push(EquitySample {
                time: clock,
                total_balance: state.wallet.total,
                unrealized_pnl: state.wallet.total_unrealized,
            });
        }

        clock += step;
    }

    let report = state.stats.finalize(state.wallet.total);
    info!(
        trades = state.trades.len(),
        roi = report.roi,
        final_balance = report.final_balance,
        "simulation complete"
    );
    Ok(RunOutput {
        report,
        trades: state.trades,
        equity_curve: state.equity_curve,
        wallet: state.wallet,
    })
}

/// Advance one symbol by one tick. Returns false while the symbol has no
/// bar history yet.
fn step_symbol(
    config: &EngineConfig,
    symbol: &SymbolConfig,
    series: &SeriesMap,
    state: &mut EngineState,
    ledger: &Ledger,
    strategy: &dyn Strategy,
) -> bool {
    let name = symbol.meta.symbol.clone();
    let price_tf = symbol.price_timeframe();

    for &timeframe in &symbol.timeframes {
        let bars = series[&(name.clone(), timeframe)];
        let window = state
            .windows
            .get_mut(&(name.clone(), timeframe))
            .expect("window initialized per configured timeframe");
        window.advance(bars, state.clock);
    }

    let price_bars = series[&(name.clone(), price_tf)];
    let price_window = state.windows[&(name.clone(), price_tf)];
    let Some(last_bar) = price_window.latest(price_bars) else {
        return false;
    };
    let price = last_bar.close;

    ledger.mark(&mut state.wallet, &name, price);

    // Liquidation runs before matching: an under-margined position must not
    // be rescued by a pending take-profit on the same tick.
    if let Some(event) = check_liquidation(
        &mut state.wallet,
        ledger,
        &name,
        price,
        config.maintenance_rate,
    ) {
        state.matching.cancel_all(&name, "liquidated");
        state.holding_counters.remove(&name);
        record_event(state, &name, OrderKind::Market, event);
    }

    // Match pending orders against every bar that closed since the last
    // tick; each bar is evaluated exactly once per run.
    let from = state
        .matched_through
        .get(&name)
        .copied()
        .unwrap_or(price_window.end);
    for index in from..price_window.end {
        let bar = &price_bars[index];
        let outcomes = state
            .matching
            .match_bar(bar, &mut state.wallet, ledger, symbol.leverage);
        for outcome in outcomes {
            for event in outcome.events {
                record_event(state, &name, outcome.order.kind, event);
            }
        }
    }
    state.matched_through.insert(name.clone(), price_window.end);

    // Strategy and time stop fire only on the symbol's own trading cadence.
    if state.clock.timestamp() % symbol.trading_timeframe.seconds() != 0 {
        return true;
    }

    apply_time_stop(config, symbol, state, ledger, price);
    run_strategy_tick(symbol, series, state, ledger, strategy, price);
    true
}

/// Countdown force-close: once a position has been held for more than the
/// configured number of trading-timeframe ticks, close it at market. The
/// counter resets whenever the position returns to flat.
fn apply_time_stop(
    config: &EngineConfig,
    symbol: &SymbolConfig,
    state: &mut EngineState,
    ledger: &Ledger,
    price: f64,
) {
    let name = &symbol.meta.symbol;
    let open_size = state.wallet.position(name).map_or(0.0, |p| p.size);
    if open_size == 0.0 {
        state.holding_counters.remove(name);
        return;
    }
    let Some(max_holding) = config.max_holding_bars else {
        return;
    };

    let counter = state
        .holding_counters
        .entry(name.clone())
        .or_insert(max_holding);
    if *counter > 0 {
        *counter -= 1;
        return;
    }

    debug!(symbol = %name, "max holding period reached, closing position");
    let events = ledger.apply(
        &mut state.wallet,
        name,
        symbol.leverage,
        -open_size,
        price,
        true,
    );
    state.matching.cancel_all(name, "max holding period");
    state.holding_counters.remove(name);
    for event in events {
        record_event(state, name, OrderKind::Market, event);
    }
}

/// Invoke the strategy callbacks and act on their decision.
fn run_strategy_tick(
    symbol: &SymbolConfig,
    series: &SeriesMap,
    state: &mut EngineState,
    ledger: &Ledger,
    strategy: &dyn Strategy,
    price: f64,
) {
    let name = &symbol.meta.symbol;
    let trading_bars = series[&(name.clone(), symbol.trading_timeframe)];
    let window = state.windows[&(name.clone(), symbol.trading_timeframe)];
    let bars = window.slice(trading_bars);
    if bars.len() < strategy.warmup() {
        return;
    }

    let trend = strategy.trend(bars);
    let buy = strategy.should_buy(bars) && trend != Trend::Short;
    let sell = strategy.should_sell(bars) && trend != Trend::Long;
    let entry_side = match (buy, sell) {
        (true, false) => Side::Long,
        (false, true) => Side::Short,
        _ => return,
    };

    let open_size = state.wallet.position(name).map_or(0.0, |p| p.size);
    if open_size != 0.0 {
        // Opposite signal closes the open position; same-side signals are
        // ignored while the pending exit plan manages the trade.
        if Side::from_quantity(open_size) != entry_side {
            let events = ledger.apply(
                &mut state.wallet,
                name,
                symbol.leverage,
                -open_size,
                price,
                true,
            );
            state.matching.cancel_all(name, "reversal");
            state.holding_counters.remove(name);
            for event in events {
                record_event(state, name, OrderKind::Market, event);
            }
        }
        return;
    }

    let ctx = RiskContext {
        available_balance: state.wallet.available,
        total_balance: state.wallet.total,
        price,
        leverage: symbol.leverage,
    };
    let quantity = symbol.meta.round_quantity(strategy.position_size(&ctx));
    if quantity <= 0.0 {
        return;
    }

    let signed = entry_side.sign() * quantity;
    let fill_price = symbol.meta.round_price(price);
    let events = ledger.apply(
        &mut state.wallet,
        name,
        symbol.leverage,
        signed,
        fill_price,
        true,
    );
    if events.is_empty() {
        // Rejected for insufficient balance; already warned by the ledger.
        return;
    }
    for event in events {
        record_event(state, name, OrderKind::Market, event);
    }

    // A fresh entry supersedes whatever exit orders were still pending.
    state.matching.cancel_all(name, "superseded");
    place_exit_plan(symbol, state, strategy, bars, fill_price, entry_side, quantity);
    state.holding_counters.remove(name);
}

/// Place the strategy's take-profit and stop orders for a fresh entry.
fn place_exit_plan(
    symbol: &SymbolConfig,
    state: &mut EngineState,
    strategy: &dyn Strategy,
    bars: &[Bar],
    entry_price: f64,
    side: Side,
    quantity: f64,
) {
    let name = &symbol.meta.symbol;
    let plan = strategy.exit_plan(entry_price, bars, &symbol.meta, side);
    let exit_sign = side.opposite().sign();

    if !plan.take_profits.is_empty() {
        let slice = symbol
            .meta
            .round_quantity(quantity / plan.take_profits.len() as f64);
        for tp_price in &plan.take_profits {
            if slice <= 0.0 {
                continue;
            }
            let id = state.next_order_id();
            state.matching.place(Order {
                id: OrderId(id),
                symbol: name.clone(),
                kind: OrderKind::Limit,
                side: side.opposite(),
                price: *tp_price,
                quantity: exit_sign * slice,
                status: OrderStatus::Pending,
            });
        }
    }

    if let Some(stop_price) = plan.stop_loss {
        let id = state.next_order_id();
        state.matching.place(Order {
            id: OrderId(id),
            symbol: name.clone(),
            kind: OrderKind::StopMarket,
            side: side.opposite(),
            price: stop_price,
            quantity: exit_sign * quantity,
            status: OrderStatus::Pending,
        });
    }
}

/// Append one fill to the audit trail and feed the aggregator.
///
/// Partial reduces accumulate into the position's episode PnL; the
/// aggregator sees one closed trade when the position flattens. Each event
/// carries the balance after its own leg, so a side flip's close row is not
/// contaminated by the reopen that follows it.
fn record_event(state: &mut EngineState, symbol: &str, kind: OrderKind, event: LedgerEvent) {
    push_trade(
        &mut state.trades,
        &mut state.stats,
        &mut state.episode_pnl,
        state.clock,
        symbol,
        kind,
        event,
    );
}

fn push_trade(
    trades: &mut Vec<TradeRecord>,
    stats: &mut StatsAggregator,
    episode_pnl: &mut HashMap<String, f64>,
    clock: DateTime<Utc>,
    symbol: &str,
    kind: OrderKind,
    event: LedgerEvent,
) {
    stats.on_fee(event.fee);

    let episode = episode_pnl.entry(symbol.to_string()).or_insert(0.0);
    *episode += event.realized_pnl;
    if event.position_flat {
        let liquidated = event.action == crate::domain::TradeAction::Liquidate;
        let total = *episode;
        episode_pnl.remove(symbol);
        stats.on_closed_trade(total, liquidated);
    }

    trades.push(TradeRecord {
        date: clock,
        symbol: symbol.to_string(),
        side: event.side,
        kind,
        action: event.action,
        quantity: event.quantity,
        price: event.price,
        fee: event.fee,
        realized_pnl: event.realized_pnl,
        balance: event.balance_after,
    });
    stats.on_balance(event.balance_after);
}
