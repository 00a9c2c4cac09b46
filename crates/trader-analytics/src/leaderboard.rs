//! 전략 리더보드.
//!
//! 등록된 모든 전략을 기본 파라미터로 같은 캔들에 실행하고, 절대 점수([`crate::scoring`])와
//! 전략 간 상대 정규화 점수를 합쳐 순위를 매깁니다.
//!
//! # 상대 정규화 지표
//!
//! | 지표 | 방향 | 비고 |
//! |------|------|------|
//! | 승률 | 높을수록 좋음 | |
//! | 프로핏 팩터 | 높을수록 좋음 | 10으로 상한 |
//! | 최대 낙폭 (%) | 낮을수록 좋음 | |
//! | 최대 연패 | 낮을수록 좋음 | |
//! | 일평균 거래 수 | 높을수록 좋음 | |
//! | 회복 계수 | 높을수록 좋음 | 50으로 상한 |
//!
//! 생존한 항목들 사이의 min-max 정규화(0~100)이며, 값의 범위가 0이면 50점입니다.

use chrono::{DateTime, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};
use trader_core::{Candle, ParamMap};
use trader_strategy::{Strategy, StrategyRegistry};

use crate::backtest::{BacktestConfig, BacktestEngine, BacktestResult};
use crate::progress::{ProgressStage, RunControl};
use crate::scoring::{calculate_score, ScoreInput, ScoreResult, ScoreWeights};

/// 프로핏 팩터 정규화 상한
pub const PROFIT_FACTOR_CAP: f64 = 10.0;

/// 회복 계수 상한
pub const RECOVERY_FACTOR_CAP: f64 = 50.0;

/// 최소 필요 잔고 = 최대 낙폭 × 이 배수
pub const MIN_BALANCE_DRAWDOWN_MULTIPLE: f64 = 3.0;

// =============================================================================
// 설정
// =============================================================================

/// 종합 점수 가중치
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeights {
    pub win_rate: f64,
    pub profit_factor: f64,
    pub drawdown: f64,
    pub consecutive_losses: f64,
    pub trades_per_day: f64,
    pub recovery_factor: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            win_rate: 0.25,
            profit_factor: 0.20,
            drawdown: 0.20,
            consecutive_losses: 0.10,
            trades_per_day: 0.10,
            recovery_factor: 0.15,
        }
    }
}

impl CompositeWeights {
    fn as_array(&self) -> [f64; 6] {
        [
            self.win_rate,
            self.profit_factor,
            self.drawdown,
            self.consecutive_losses,
            self.trades_per_day,
            self.recovery_factor,
        ]
    }

    /// 합이 1이 되도록 정규화.
    ///
    /// 음수/NaN/무한대 가중치는 0으로 취급하며, 유효한 가중치가 하나도 없으면 기본값을 사용합니다.
    pub fn normalized(&self) -> Self {
        let sanitize = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let sum: f64 = self.as_array().iter().map(|w| sanitize(*w)).sum();
        if !(sum > 0.0) || !sum.is_finite() {
            return Self::default();
        }
        Self {
            win_rate: sanitize(self.win_rate) / sum,
            profit_factor: sanitize(self.profit_factor) / sum,
            drawdown: sanitize(self.drawdown) / sum,
            consecutive_losses: sanitize(self.consecutive_losses) / sum,
            trades_per_day: sanitize(self.trades_per_day) / sum,
            recovery_factor: sanitize(self.recovery_factor) / sum,
        }
    }
}

/// 리더보드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// 공통 백테스트 설정 (전략 ID/파라미터는 전략마다 덮어씀)
    #[serde(default)]
    pub template: BacktestConfig,

    /// 최소 거래 수
    #[serde(default = "default_min_trades")]
    pub min_trades: usize,

    /// 최소 승률 (%)
    #[serde(default)]
    pub min_win_rate: f64,

    /// 거래량 목표 (베팅 금액 합계)
    #[serde(default = "default_volume_target")]
    pub volume_target: f64,

    #[serde(default)]
    pub weights: CompositeWeights,

    #[serde(default)]
    pub score_weights: ScoreWeights,
}

fn default_min_trades() -> usize {
    10
}
fn default_volume_target() -> f64 {
    10_000.0
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            template: BacktestConfig::default(),
            min_trades: default_min_trades(),
            min_win_rate: 0.0,
            volume_target: default_volume_target(),
            weights: CompositeWeights::default(),
            score_weights: ScoreWeights::default(),
        }
    }
}

impl LeaderboardConfig {
    pub fn with_template(mut self, template: BacktestConfig) -> Self {
        self.template = template;
        self
    }

    pub fn with_filters(mut self, min_trades: usize, min_win_rate: f64) -> Self {
        self.min_trades = min_trades;
        self.min_win_rate = min_win_rate;
        self
    }

    pub fn with_volume_target(mut self, target: f64) -> Self {
        self.volume_target = target;
        self
    }

    pub fn with_weights(mut self, weights: CompositeWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_score_weights(mut self, weights: ScoreWeights) -> Self {
        self.score_weights = weights;
        self
    }
}

// =============================================================================
// 결과
// =============================================================================

/// 상대 정규화 점수 (각 0~100)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedMetrics {
    pub win_rate: f64,
    pub profit_factor: f64,
    pub drawdown: f64,
    pub consecutive_losses: f64,
    pub trades_per_day: f64,
    pub recovery_factor: f64,
}

impl NormalizedMetrics {
    fn composite(&self, weights: &CompositeWeights) -> f64 {
        self.win_rate * weights.win_rate
            + self.profit_factor * weights.profit_factor
            + self.drawdown * weights.drawdown
            + self.consecutive_losses * weights.consecutive_losses
            + self.trades_per_day * weights.trades_per_day
            + self.recovery_factor * weights.recovery_factor
    }
}

/// 리더보드 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub strategy_id: String,
    pub strategy_name: String,
    pub params: ParamMap,

    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub ties: usize,
    pub win_rate: f64,
    pub net_profit: f64,
    pub net_profit_percent: f64,
    #[serde(with = "trader_core::serde_helpers::float")]
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub max_drawdown_percent: f64,
    pub max_consecutive_losses: usize,

    /// 베팅 1단위당 기대값
    pub expected_value: f64,
    /// 켈리 비율 (%)
    pub kelly_fraction: f64,
    /// 최소 권장 잔고
    pub min_required_balance: f64,
    pub weekly_win_rate_std: Option<f64>,
    /// 거래가 있었던 UTC 일수
    pub trading_days: usize,
    pub trades_per_day: f64,
    pub total_volume: f64,
    /// 현재 일평균 거래량으로 목표 거래량 도달까지 걸리는 일수
    pub days_to_volume_target: Option<f64>,
    pub recovery_factor: f64,

    /// 절대 점수
    pub score: ScoreResult,
    /// 상대 정규화 점수
    pub normalized: NormalizedMetrics,
    pub composite_score: f64,
    /// 순위 (1부터, 동점은 같은 순위)
    pub rank: usize,
}

/// 리더보드에서 제외된 사유
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardSkip {
    #[error("백테스트 실패: {0}")]
    Backtest(String),

    #[error("거래 수 부족: {trades} < {required}")]
    BelowMinTrades { trades: usize, required: usize },

    #[error("승률 미달: {win_rate:.1}% < {required:.1}%")]
    BelowMinWinRate { win_rate: f64, required: f64 },

    #[error("취소됨")]
    Cancelled,
}

/// 제외된 전략
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedStrategy {
    pub strategy_id: String,
    pub reason: LeaderboardSkip,
}

/// 리더보드 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResult {
    /// 종합 점수 내림차순
    pub entries: Vec<LeaderboardEntry>,
    pub total_strategies: usize,
    /// 제외된 전략 수
    pub filtered_out: usize,
    pub skipped: Vec<SkippedStrategy>,
    pub cancelled: bool,
}

impl LeaderboardResult {
    /// 순위 표 문자열
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "전략 리더보드".to_string(),
            "═══════════════════════════════════════════════════════════════".to_string(),
            format!(
                "{:>4}  {:<20} {:>7} {:>7} {:>7} {:>7} {:>5}",
                "순위", "전략", "종합", "점수", "승률", "거래", "등급"
            ),
            "───────────────────────────────────────────────────────────────".to_string(),
        ];
        for entry in &self.entries {
            lines.push(format!(
                "{:>4}  {:<20} {:>7.1} {:>7.1} {:>6.1}% {:>7} {:>5}",
                entry.rank,
                entry.strategy_id,
                entry.composite_score,
                entry.score.score,
                entry.win_rate,
                entry.total_trades,
                entry.score.grade,
            ));
        }
        lines.push("═══════════════════════════════════════════════════════════════".to_string());
        lines.push(format!(
            "전략 {}개 중 {}개 순위, {}개 제외{}",
            self.total_strategies,
            self.entries.len(),
            self.filtered_out,
            if self.cancelled { " [취소됨]" } else { "" }
        ));
        lines.join("\n")
    }
}

// =============================================================================
// 실행
// =============================================================================

/// 등록된 모든 전략을 평가하고 순위를 매깁니다.
///
/// 개별 전략의 실패는 `skipped`에 기록되며 전체 실행을 중단시키지 않습니다.
pub fn run_leaderboard(
    registry: &StrategyRegistry,
    candles: &[Candle],
    config: &LeaderboardConfig,
    control: &RunControl,
) -> LeaderboardResult {
    let engine = BacktestEngine::new(registry);
    let strategies = registry.strategies();
    let tracker = control.tracker(ProgressStage::Leaderboard, strategies.len());
    info!(strategies = strategies.len(), candles = candles.len(), "리더보드 실행 시작");
    if config.weights.as_array().iter().any(|w| !w.is_finite() || *w < 0.0) {
        warn!(weights = ?config.weights, "음수/비유한 종합 가중치는 0으로 처리");
    }

    let outcomes: Vec<(String, Result<LeaderboardEntry, LeaderboardSkip>)> = strategies
        .par_iter()
        .map(|strategy| {
            let outcome = evaluate_strategy(&engine, strategy.as_ref(), candles, config, control);
            tracker.tick();
            (strategy.id().to_string(), outcome)
        })
        .collect();

    let mut entries = Vec::new();
    let mut skipped = Vec::new();
    for (strategy_id, outcome) in outcomes {
        match outcome {
            Ok(entry) => entries.push(entry),
            Err(reason) => {
                match &reason {
                    LeaderboardSkip::Backtest(message) => {
                        warn!(strategy_id = %strategy_id, error = %message, "전략 백테스트 실패")
                    }
                    other => debug!(strategy_id = %strategy_id, reason = %other, "전략 제외"),
                }
                skipped.push(SkippedStrategy {
                    strategy_id,
                    reason,
                });
            }
        }
    }

    let entries = rank_entries(entries, &config.weights);
    let cancelled =
        control.is_cancelled() || skipped.iter().any(|s| s.reason == LeaderboardSkip::Cancelled);

    info!(
        ranked = entries.len(),
        filtered_out = skipped.len(),
        leader = entries.first().map(|e| e.strategy_id.as_str()),
        "리더보드 실행 완료"
    );

    LeaderboardResult {
        total_strategies: strategies.len(),
        filtered_out: skipped.len(),
        entries,
        skipped,
        cancelled,
    }
}

fn evaluate_strategy(
    engine: &BacktestEngine<'_>,
    strategy: &dyn Strategy,
    candles: &[Candle],
    config: &LeaderboardConfig,
    control: &RunControl,
) -> Result<LeaderboardEntry, LeaderboardSkip> {
    if control.is_cancelled() {
        return Err(LeaderboardSkip::Cancelled);
    }

    let backtest_config = config
        .template
        .clone()
        .with_strategy(strategy.id())
        .with_params(strategy.default_params());
    let result = engine
        .run(&backtest_config, candles)
        .map_err(|e| LeaderboardSkip::Backtest(e.to_string()))?;

    if result.total_trades < config.min_trades {
        return Err(LeaderboardSkip::BelowMinTrades {
            trades: result.total_trades,
            required: config.min_trades,
        });
    }
    if result.win_rate < config.min_win_rate {
        return Err(LeaderboardSkip::BelowMinWinRate {
            win_rate: result.win_rate,
            required: config.min_win_rate,
        });
    }

    Ok(build_entry(
        strategy,
        result,
        config.template.payout_percent,
        config,
    ))
}

fn build_entry(
    strategy: &dyn Strategy,
    result: BacktestResult,
    payout_percent: f64,
    config: &LeaderboardConfig,
) -> LeaderboardEntry {
    let input = ScoreInput::from_result(&result).with_payout_percent(payout_percent);
    let score = calculate_score(&input, &config.score_weights);

    let trading_days = trading_days(&result);
    let trades_per_day = if trading_days > 0 {
        result.total_trades as f64 / trading_days as f64
    } else {
        0.0
    };
    let days_to_volume_target = (result.total_volume > 0.0 && trading_days > 0).then(|| {
        let volume_per_day = result.total_volume / trading_days as f64;
        config.volume_target / volume_per_day
    });

    LeaderboardEntry {
        strategy_id: strategy.id().to_string(),
        strategy_name: strategy.name().to_string(),
        params: result.params.clone(),
        total_trades: result.total_trades,
        wins: result.wins,
        losses: result.losses,
        ties: result.ties,
        win_rate: result.win_rate,
        net_profit: result.net_profit,
        net_profit_percent: result.net_profit_percent,
        profit_factor: result.profit_factor,
        max_drawdown: result.max_drawdown,
        max_drawdown_percent: result.max_drawdown_percent,
        max_consecutive_losses: result.max_consecutive_losses,
        expected_value: score.expected_value,
        kelly_fraction: kelly_fraction(result.wins, result.losses, payout_percent),
        min_required_balance: result.max_drawdown * MIN_BALANCE_DRAWDOWN_MULTIPLE,
        weekly_win_rate_std: input.weekly_win_rate_std,
        trading_days,
        trades_per_day,
        total_volume: result.total_volume,
        days_to_volume_target,
        recovery_factor: recovery_factor(result.net_profit, result.max_drawdown),
        score,
        normalized: NormalizedMetrics::default(),
        composite_score: 0.0,
        rank: 0,
    }
}

/// 켈리 비율 (%): `max(0, (p*b - q) / b) * 100`
pub fn kelly_fraction(wins: usize, losses: usize, payout_percent: f64) -> f64 {
    let decided = wins + losses;
    let b = payout_percent / 100.0;
    if decided == 0 || b <= 0.0 {
        return 0.0;
    }
    let p = wins as f64 / decided as f64;
    ((p * b - (1.0 - p)) / b).max(0.0) * 100.0
}

/// 회복 계수 (순손익 / 최대 낙폭, 상한 50).
///
/// 낙폭이 없으면 수익일 때 50, 아니면 0.
pub fn recovery_factor(net_profit: f64, max_drawdown: f64) -> f64 {
    if max_drawdown > 0.0 {
        (net_profit / max_drawdown).min(RECOVERY_FACTOR_CAP)
    } else if net_profit > 0.0 {
        RECOVERY_FACTOR_CAP
    } else {
        0.0
    }
}

/// 거래가 있었던 서로 다른 UTC 날짜 수
fn trading_days(result: &BacktestResult) -> usize {
    result
        .trades
        .iter()
        .filter_map(|t| DateTime::from_timestamp_millis(t.entry_time))
        .map(|dt| dt.date_naive())
        .collect::<BTreeSet<NaiveDate>>()
        .len()
}

/// min-max 정규화 (0~100). 범위가 0이면 모두 50.
pub fn min_max_normalize(values: &[f64], higher_is_better: bool) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    values
        .iter()
        .map(|v| {
            if !(range > 0.0) || !range.is_finite() {
                50.0
            } else if higher_is_better {
                (v - min) / range * 100.0
            } else {
                (max - v) / range * 100.0
            }
        })
        .collect()
}

/// 내림차순 점수의 밀집 순위 (1부터, 동점은 같은 순위)
pub fn dense_ranks(sorted_scores: &[f64]) -> Vec<usize> {
    let mut ranks = Vec::with_capacity(sorted_scores.len());
    let mut rank = 0;
    let mut previous: Option<f64> = None;
    for &score in sorted_scores {
        if previous.map_or(true, |p| (p - score).abs() > 1e-9) {
            rank += 1;
        }
        ranks.push(rank);
        previous = Some(score);
    }
    ranks
}

fn column(entries: &[LeaderboardEntry], metric: impl Fn(&LeaderboardEntry) -> f64) -> Vec<f64> {
    entries.iter().map(metric).collect()
}

/// 상대 정규화 → 종합 점수 → 정렬 → 순위
fn rank_entries(mut entries: Vec<LeaderboardEntry>, weights: &CompositeWeights) -> Vec<LeaderboardEntry> {
    let win_rate = min_max_normalize(&column(&entries, |e| e.win_rate), true);
    let profit_factor = min_max_normalize(
        &column(&entries, |e| {
            if e.profit_factor.is_nan() {
                0.0
            } else {
                e.profit_factor.min(PROFIT_FACTOR_CAP)
            }
        }),
        true,
    );
    let drawdown = min_max_normalize(&column(&entries, |e| e.max_drawdown_percent), false);
    let consecutive_losses = min_max_normalize(
        &column(&entries, |e| e.max_consecutive_losses as f64),
        false,
    );
    let trades_per_day = min_max_normalize(&column(&entries, |e| e.trades_per_day), true);
    let weights = weights.normalized();
    let recovery = min_max_normalize(
        &column(&entries, |e| e.recovery_factor.min(RECOVERY_FACTOR_CAP)),
        true,
    );

    for (i, entry) in entries.iter_mut().enumerate() {
        entry.normalized = NormalizedMetrics {
            win_rate: win_rate[i],
            profit_factor: profit_factor[i],
            drawdown: drawdown[i],
            consecutive_losses: consecutive_losses[i],
            trades_per_day: trades_per_day[i],
            recovery_factor: recovery[i],
        };
        entry.composite_score = entry.normalized.composite(&weights);
    }

    entries.sort_by(|a, b| b.composite_score.total_cmp(&a.composite_score));
    let scores: Vec<f64> = entries.iter().map(|e| e.composite_score).collect();
    for (entry, rank) in entries.iter_mut().zip(dense_ranks(&scores)) {
        entry.rank = rank;
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::engine::test_strategies::{registry, wave_candles};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_kelly_fraction() {
        // p=0.6, b=1 → (0.6 - 0.4) / 1 = 20%
        assert_abs_diff_eq!(kelly_fraction(60, 40, 100.0), 20.0, epsilon = 1e-9);
        assert_eq!(kelly_fraction(40, 60, 92.0), 0.0);
        assert_eq!(kelly_fraction(0, 0, 92.0), 0.0);
    }

    #[test]
    fn test_recovery_factor() {
        assert_abs_diff_eq!(recovery_factor(100.0, 50.0), 2.0, epsilon = 1e-12);
        assert_eq!(recovery_factor(10_000.0, 1.0), RECOVERY_FACTOR_CAP);
        assert_eq!(recovery_factor(10.0, 0.0), RECOVERY_FACTOR_CAP);
        assert_eq!(recovery_factor(0.0, 0.0), 0.0);
        assert!(recovery_factor(-30.0, 60.0) < 0.0);
    }

    #[test]
    fn test_min_max_normalize() {
        assert_eq!(min_max_normalize(&[1.0, 2.0, 3.0], true), vec![0.0, 50.0, 100.0]);
        assert_eq!(min_max_normalize(&[1.0, 2.0, 3.0], false), vec![100.0, 50.0, 0.0]);
        assert_eq!(min_max_normalize(&[4.0, 4.0], true), vec![50.0, 50.0]);
        assert!(min_max_normalize(&[], true).is_empty());
    }

    #[test]
    fn test_composite_weights_normalized() {
        let default = CompositeWeights::default();
        let sum: f64 = default.normalized().as_array().iter().sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);

        let ones = CompositeWeights {
            win_rate: 1.0,
            profit_factor: 1.0,
            drawdown: 1.0,
            consecutive_losses: 1.0,
            trades_per_day: 1.0,
            recovery_factor: 1.0,
        }
        .normalized();
        for w in ones.as_array() {
            assert_abs_diff_eq!(w, 1.0 / 6.0, epsilon = 1e-12);
        }

        // 음수/NaN은 0으로 취급
        let mixed = CompositeWeights {
            win_rate: 3.0,
            profit_factor: -2.0,
            drawdown: f64::NAN,
            consecutive_losses: 1.0,
            trades_per_day: 0.0,
            recovery_factor: f64::INFINITY,
        }
        .normalized();
        assert_abs_diff_eq!(mixed.win_rate, 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(mixed.consecutive_losses, 0.25, epsilon = 1e-12);
        assert_eq!(mixed.profit_factor, 0.0);
        assert_eq!(mixed.drawdown, 0.0);
        assert_eq!(mixed.recovery_factor, 0.0);

        let invalid = CompositeWeights {
            win_rate: -1.0,
            profit_factor: f64::NAN,
            drawdown: 0.0,
            consecutive_losses: 0.0,
            trades_per_day: 0.0,
            recovery_factor: 0.0,
        };
        assert_eq!(invalid.normalized(), default.normalized());
    }

    #[test]
    fn test_unnormalized_weights_keep_composite_in_range() {
        let registry = registry();
        let candles = wave_candles(600);
        let ones = CompositeWeights {
            win_rate: 1.0,
            profit_factor: 1.0,
            drawdown: 1.0,
            consecutive_losses: 1.0,
            trades_per_day: 1.0,
            recovery_factor: 1.0,
        };
        let scaled = CompositeWeights {
            win_rate: 100.0,
            profit_factor: 100.0,
            drawdown: 100.0,
            consecutive_losses: 100.0,
            trades_per_day: 100.0,
            recovery_factor: 100.0,
        };

        let run = |weights: CompositeWeights| {
            run_leaderboard(
                &registry,
                &candles,
                &LeaderboardConfig::default().with_weights(weights),
                &RunControl::new(),
            )
        };
        let first = run(ones);
        let second = run(scaled);

        assert!(!first.entries.is_empty());
        for entry in &first.entries {
            assert!(
                (0.0..=100.0).contains(&entry.composite_score),
                "{}: {}",
                entry.strategy_id,
                entry.composite_score
            );
        }
        // 가중치 배율은 결과에 영향 없음
        assert_eq!(first.entries.len(), second.entries.len());
        for a in &first.entries {
            let b = second
                .entries
                .iter()
                .find(|b| b.strategy_id == a.strategy_id)
                .unwrap();
            assert_abs_diff_eq!(a.composite_score, b.composite_score, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_dense_ranks() {
        assert_eq!(dense_ranks(&[90.0, 80.0, 80.0, 70.0]), vec![1, 2, 2, 3]);
        assert_eq!(dense_ranks(&[50.0]), vec![1]);
        assert!(dense_ranks(&[]).is_empty());
    }

    #[test]
    fn test_leaderboard_ranks_and_filters() {
        let registry = registry();
        let candles = wave_candles(600);
        let result = run_leaderboard(
            &registry,
            &candles,
            &LeaderboardConfig::default(),
            &RunControl::new(),
        );

        assert_eq!(result.total_strategies, 4);
        assert_eq!(result.entries.len() + result.filtered_out, 4);
        assert!(result.skipped.iter().any(|s| s.strategy_id == "idle"));
        assert!(!result.entries.is_empty());
        assert_eq!(result.entries[0].rank, 1);
        for pair in result.entries.windows(2) {
            assert!(pair[0].composite_score >= pair[1].composite_score);
            assert!(pair[1].rank == pair[0].rank || pair[1].rank == pair[0].rank + 1);
        }
        for entry in &result.entries {
            assert!((0.0..=100.0).contains(&entry.composite_score));
            assert!((0.0..=100.0).contains(&entry.score.score));
            assert!((1..=2).contains(&entry.trading_days));
            assert_abs_diff_eq!(
                entry.min_required_balance,
                entry.max_drawdown * 3.0,
                epsilon = 1e-9
            );
        }
        assert!(result.summary().contains("리더보드"));
    }

    #[test]
    fn test_single_entry_scores_midpoint() {
        let mut registry = StrategyRegistry::new();
        for strategy in registry_strategies("trend") {
            registry.register(strategy);
        }
        let result = run_leaderboard(
            &registry,
            &wave_candles(400),
            &LeaderboardConfig::default(),
            &RunControl::new(),
        );

        assert_eq!(result.entries.len(), 1);
        let entry = &result.entries[0];
        assert_eq!(entry.rank, 1);
        assert_abs_diff_eq!(entry.composite_score, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_insufficient_data_counted_not_fatal() {
        let registry = registry();
        let result = run_leaderboard(
            &registry,
            &wave_candles(30),
            &LeaderboardConfig::default(),
            &RunControl::new(),
        );

        assert!(result.entries.is_empty());
        assert_eq!(result.filtered_out, 4);
        assert!(result
            .skipped
            .iter()
            .all(|s| matches!(s.reason, LeaderboardSkip::Backtest(_))));
    }

    #[test]
    fn test_cancelled_before_start() {
        let registry = registry();
        let control = RunControl::new();
        control.cancel();
        let result = run_leaderboard(
            &registry,
            &wave_candles(200),
            &LeaderboardConfig::default(),
            &control,
        );

        assert!(result.cancelled);
        assert!(result.entries.is_empty());
        assert!(result
            .skipped
            .iter()
            .all(|s| s.reason == LeaderboardSkip::Cancelled));
    }

    fn registry_strategies(id: &str) -> Vec<std::sync::Arc<dyn Strategy>> {
        registry()
            .strategies()
            .iter()
            .filter(|s| s.id() == id)
            .cloned()
            .collect()
    }
}
