//! Engine throughput benchmark: one year of hourly bars through the full
//! simulation loop with the breakout strategy.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use leverlab_core::data::{random_walk, InMemorySource};
use leverlab_core::domain::{SymbolMeta, Timeframe};
use leverlab_core::engine::{run_simulation, EngineConfig, SymbolConfig};
use leverlab_core::strategy::StrategyConfig;

fn bench_simulation(c: &mut Criterion) {
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let bars = random_walk("BTC-USDT", Timeframe::H1, start, 24 * 365, 7, 30_000.0, 0.015);
    let end = bars.last().unwrap().close_time;

    let mut source = InMemorySource::new();
    source.insert("BTC-USDT", Timeframe::H1, bars);

    let mut config = EngineConfig::new(10_000.0, start, end);
    config.symbols.push(SymbolConfig::new(
        SymbolMeta::new("BTC-USDT", 1, 4),
        Timeframe::H1,
        3.0,
    ));

    let strategy = StrategyConfig::Breakout {
        channel_period: 24,
        atr_period: 14,
        stop_atr: 2.0,
        take_profit_atr: 3.0,
        risk_fraction: 0.2,
    }
    .build();

    c.bench_function("simulate_one_year_hourly", |b| {
        b.iter(|| {
            let output =
                run_simulation(&config, &source, strategy.as_ref(), None).unwrap();
            black_box(output.report.roi)
        })
    });
}

criterion_group!(benches, bench_simulation);
criterion_main!(benches);
