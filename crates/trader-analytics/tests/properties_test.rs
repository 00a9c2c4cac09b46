//! 전처리/점수/백테스트 불변식 속성 테스트.

use proptest::prelude::*;
use trader_analytics::{
    calculate_score, preprocess, BacktestConfig, BacktestEngine, GapStrategy, PreprocessOptions,
    ScoreInput, ScoreWeights,
};
use trader_core::Candle;
use trader_strategy::StrategyRegistry;

const BASE_TIME: i64 = 1_700_000_000_000;
const MINUTE: i64 = 60_000;

/// 대부분 1분 간격, 가끔 2~4분 갭과 중복 타임스탬프가 있는 캔들
fn candle_series() -> impl Strategy<Value = Vec<Candle>> {
    let step = prop_oneof![8 => Just(1i64), 1 => 2i64..=4, 1 => Just(0i64)];
    prop::collection::vec((step, 1.0f64..200.0, 0.0f64..2.0), 60..150).prop_map(|rows| {
        let mut timestamp = BASE_TIME;
        rows.into_iter()
            .map(|(step, close, wick)| {
                timestamp += step * MINUTE;
                Candle::new(timestamp, close, close + wick, (close - wick).max(0.5), close)
            })
            .collect()
    })
}

/// 임의 OHLC (유효하지 않은 캔들 포함)
fn arbitrary_candles() -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec(
        (
            -1_000i64..10_000_000_000,
            -10.0f64..100.0,
            -10.0f64..100.0,
            -10.0f64..100.0,
            -10.0f64..100.0,
        ),
        0..80,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(ts, o, h, l, c)| Candle::new(ts, o, h, l, c))
            .collect()
    })
}

/// 랜덤 워크 1분봉
fn random_walk() -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec(-0.5f64..0.5, 80..200).prop_map(|moves| {
        let mut close = 100.0;
        moves
            .into_iter()
            .enumerate()
            .map(|(i, delta)| {
                let open = close;
                close = (close + delta).max(1.0);
                Candle::new(
                    BASE_TIME + MINUTE * i as i64,
                    open,
                    open.max(close) + 0.05,
                    open.min(close) - 0.05,
                    close,
                )
            })
            .collect()
    })
}

fn score_input() -> impl Strategy<Value = ScoreInput> {
    (
        0usize..500,
        0usize..500,
        0usize..50,
        0.0f64..200.0,
        0.0f64..150.0,
        0usize..60,
        prop_oneof![0.0f64..20.0, Just(f64::INFINITY)],
        prop::option::of(0.0f64..60.0),
    )
        .prop_map(
            |(wins, losses, ties, payout, drawdown, streak, profit_factor, weekly_std)| {
                ScoreInput {
                    wins,
                    losses,
                    ties,
                    payout_percent: payout,
                    max_drawdown_percent: drawdown,
                    max_consecutive_losses: streak,
                    profit_factor,
                    total_trades: wins + losses + ties,
                    weekly_win_rate_std: weekly_std,
                }
            },
        )
}

proptest! {
    #[test]
    fn test_preprocess_skip_is_idempotent(candles in candle_series()) {
        let options = PreprocessOptions::default();
        let first = preprocess(&candles, &options);
        let second = preprocess(&first.candles, &options);

        prop_assert_eq!(second.analysis.duplicates_removed, 0);
        prop_assert_eq!(second.analysis.invalid_removed, 0);
        prop_assert_eq!(second.analysis.gaps.len(), first.analysis.gaps.len());
        prop_assert_eq!(second.candles, first.candles);
    }

    #[test]
    fn test_preprocess_fill_leaves_no_small_gaps(candles in candle_series()) {
        let options = PreprocessOptions::default().with_gap_strategy(GapStrategy::Fill);
        let first = preprocess(&candles, &options);
        let second = preprocess(&first.candles, &options);

        prop_assert_eq!(second.analysis.duplicates_removed, 0);
        prop_assert!(second.analysis.gaps.is_empty());
        for pair in first.candles.windows(2) {
            prop_assert!(pair[1].timestamp > pair[0].timestamp);
        }
    }

    #[test]
    fn test_coverage_is_bounded(candles in arbitrary_candles()) {
        let result = preprocess(&candles, &PreprocessOptions::default());
        let coverage = result.analysis.coverage_percent;
        prop_assert!((0.0..=100.0).contains(&coverage), "coverage {}", coverage);
        prop_assert!(result.candles.iter().all(|c| c.is_valid()));
        prop_assert_eq!(
            result.analysis.valid_count + result.analysis.invalid_removed
                + result.analysis.duplicates_removed,
            candles.len()
        );
    }

    #[test]
    fn test_score_is_bounded(input in score_input()) {
        let result = calculate_score(&input, &ScoreWeights::default());
        prop_assert!((0.0..=100.0).contains(&result.score));
        for (name, value) in result.breakdown.items() {
            prop_assert!((0.0..=100.0).contains(&value), "{} = {}", name, value);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_trades_never_overlap(candles in random_walk(), expiry in 60u64..300, latency in 0i64..90_000) {
        let registry = StrategyRegistry::with_builtins();
        let engine = BacktestEngine::new(&registry);
        let config = BacktestConfig::new("sma_crossover")
            .with_expiry_seconds(expiry)
            .with_latency_ms(latency);

        let result = engine.run(&config, &candles).unwrap();
        for pair in result.trades.windows(2) {
            prop_assert!(pair[1].entry_time >= pair[0].exit_time);
        }
        for trade in &result.trades {
            prop_assert!(trade.exit_time >= trade.entry_time + expiry as i64 * 1000);
        }
        prop_assert!(result.final_balance >= 0.0);
    }
}
