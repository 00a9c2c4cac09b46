//! 전략 점수 산정.
//!
//! 백테스트 통계를 0~100 점수와 A~F 등급으로 변환합니다. 순수 함수이며 결정적입니다.
//!
//! # 세부 점수
//!
//! | 항목 | 기준 |
//! |------|------|
//! | 승률 | 손익분기 승률(BE) 대비: BE-10 → 0, BE → 50, BE+5 → 80, BE+10 이상 → 100 |
//! | 기대값 | -0.05 이하 → 0, 0 → 20, 0.02 → 50, 0.10 이상 → 100 |
//! | 최대 낙폭 | 0% → 100, 30% 이상 → 0 |
//! | 연패 | 0 → 100, 10 이상 → 0 |
//! | 프로핏 팩터 | 0 → 0, 1.0 → 30, 1.5 → 60, 3.0 이상 → 100 |
//! | 거래 수 | 0 → 0, 30 → 30, 200 이상 → 100 |
//! | 일관성 | 주간 승률 표준편차 0 → 100, 15 이상 → 0, 데이터 없음 → 50 |

use chrono::{Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::backtest::{BacktestResult, BacktestTrade, TradeOutcome};

/// 주간 승률 계산에 필요한 주당 최소 거래 수
pub const MIN_TRADES_PER_WEEK: usize = 5;

// =============================================================================
// 입력 / 가중치
// =============================================================================

/// 점수 계산 입력
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreInput {
    pub wins: usize,
    pub losses: usize,
    pub ties: usize,
    /// 지급률 (%)
    pub payout_percent: f64,
    /// 최대 낙폭 (%)
    pub max_drawdown_percent: f64,
    pub max_consecutive_losses: usize,
    #[serde(with = "trader_core::serde_helpers::float")]
    pub profit_factor: f64,
    pub total_trades: usize,
    /// 주간 승률 표준편차 (없으면 중립 처리)
    pub weekly_win_rate_std: Option<f64>,
}

impl ScoreInput {
    /// 백테스트 결과에서 입력 생성
    pub fn from_result(result: &BacktestResult) -> Self {
        let payout_percent = result
            .trades
            .first()
            .map(|t| t.payout_percent)
            .unwrap_or(0.0);
        Self {
            wins: result.wins,
            losses: result.losses,
            ties: result.ties,
            payout_percent,
            max_drawdown_percent: result.max_drawdown_percent,
            max_consecutive_losses: result.max_consecutive_losses,
            profit_factor: result.profit_factor,
            total_trades: result.total_trades,
            weekly_win_rate_std: weekly_win_rate_std(&result.trades, MIN_TRADES_PER_WEEK),
        }
    }

    /// 지급률 덮어쓰기 (거래가 없는 결과 등)
    pub fn with_payout_percent(mut self, payout_percent: f64) -> Self {
        self.payout_percent = payout_percent;
        self
    }

    /// 승률 (%, 무승부 제외)
    pub fn win_rate(&self) -> f64 {
        let decided = self.wins + self.losses;
        if decided == 0 {
            0.0
        } else {
            self.wins as f64 / decided as f64 * 100.0
        }
    }

    /// 베팅 1단위당 기대값 `p*b - q`. 결정된 거래가 없으면 0.
    pub fn expected_value(&self) -> f64 {
        let decided = self.wins + self.losses;
        if decided == 0 {
            return 0.0;
        }
        let p = self.wins as f64 / decided as f64;
        p * (self.payout_percent / 100.0) - (1.0 - p)
    }
}

/// 세부 점수 가중치
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub win_rate: f64,
    pub expected_value: f64,
    pub drawdown: f64,
    pub losing_streak: f64,
    pub profit_factor: f64,
    pub trade_count: f64,
    pub consistency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            win_rate: 0.20,
            expected_value: 0.25,
            drawdown: 0.15,
            losing_streak: 0.10,
            profit_factor: 0.15,
            trade_count: 0.10,
            consistency: 0.05,
        }
    }
}

impl ScoreWeights {
    /// 안정성 중시 프로파일
    pub fn stability() -> Self {
        Self {
            win_rate: 0.15,
            expected_value: 0.15,
            drawdown: 0.25,
            losing_streak: 0.20,
            profit_factor: 0.05,
            trade_count: 0.05,
            consistency: 0.15,
        }
    }

    /// 성장 중시 프로파일
    pub fn growth() -> Self {
        Self {
            win_rate: 0.15,
            expected_value: 0.30,
            drawdown: 0.10,
            losing_streak: 0.05,
            profit_factor: 0.20,
            trade_count: 0.15,
            consistency: 0.05,
        }
    }

    /// 프로파일 이름 파싱 (`default` / `stability` / `growth`)
    pub fn profile(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" => Some(Self::default()),
            "stability" | "stable" => Some(Self::stability()),
            "growth" => Some(Self::growth()),
            _ => None,
        }
    }

    fn as_array(&self) -> [f64; 7] {
        [
            self.win_rate,
            self.expected_value,
            self.drawdown,
            self.losing_streak,
            self.profit_factor,
            self.trade_count,
            self.consistency,
        ]
    }

    /// 합이 1이 되도록 정규화. 음수/비유한 값은 0으로 보고, 합이 0이면 기본 가중치.
    pub fn normalized(&self) -> Self {
        let sanitize = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let sum: f64 = self.as_array().iter().map(|w| sanitize(*w)).sum();
        if sum <= 0.0 {
            return Self::default();
        }
        Self {
            win_rate: sanitize(self.win_rate) / sum,
            expected_value: sanitize(self.expected_value) / sum,
            drawdown: sanitize(self.drawdown) / sum,
            losing_streak: sanitize(self.losing_streak) / sum,
            profit_factor: sanitize(self.profit_factor) / sum,
            trade_count: sanitize(self.trade_count) / sum,
            consistency: sanitize(self.consistency) / sum,
        }
    }
}

// =============================================================================
// 결과
// =============================================================================

/// 등급
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// 점수 → 등급
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Grade::A
        } else if score >= 60.0 {
            Grade::B
        } else if score >= 40.0 {
            Grade::C
        } else if score >= 20.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{}", s)
    }
}

/// 세부 점수 (각 0~100)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub win_rate: f64,
    pub expected_value: f64,
    pub drawdown: f64,
    pub losing_streak: f64,
    pub profit_factor: f64,
    pub trade_count: f64,
    pub consistency: f64,
}

impl ScoreBreakdown {
    /// (항목명, 점수) 목록
    pub fn items(&self) -> [(&'static str, f64); 7] {
        [
            ("win_rate", self.win_rate),
            ("expected_value", self.expected_value),
            ("drawdown", self.drawdown),
            ("losing_streak", self.losing_streak),
            ("profit_factor", self.profit_factor),
            ("trade_count", self.trade_count),
            ("consistency", self.consistency),
        ]
    }

    fn weighted_sum(&self, weights: &ScoreWeights) -> f64 {
        self.win_rate * weights.win_rate
            + self.expected_value * weights.expected_value
            + self.drawdown * weights.drawdown
            + self.losing_streak * weights.losing_streak
            + self.profit_factor * weights.profit_factor
            + self.trade_count * weights.trade_count
            + self.consistency * weights.consistency
    }
}

/// 점수 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// 종합 점수 (0~100)
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// 베팅 1단위당 기대값
    pub expected_value: f64,
    /// 승률 (%)
    pub win_rate: f64,
    pub grade: Grade,
    /// 한 줄 요약
    pub summary: String,
}

// =============================================================================
// 계산
// =============================================================================

/// 종합 점수 계산
pub fn calculate_score(input: &ScoreInput, weights: &ScoreWeights) -> ScoreResult {
    let win_rate = input.win_rate();
    let expected_value = input.expected_value();
    let payout = input.payout_percent / 100.0;
    let break_even = if payout > 0.0 { 100.0 / (1.0 + payout) } else { 100.0 };

    let breakdown = ScoreBreakdown {
        win_rate: piecewise(
            win_rate,
            &[
                (break_even - 10.0, 0.0),
                (break_even, 50.0),
                (break_even + 5.0, 80.0),
                (break_even + 10.0, 100.0),
            ],
        ),
        expected_value: piecewise(
            expected_value,
            &[(-0.05, 0.0), (0.0, 20.0), (0.02, 50.0), (0.10, 100.0)],
        ),
        drawdown: piecewise(input.max_drawdown_percent, &[(0.0, 100.0), (30.0, 0.0)]),
        losing_streak: piecewise(
            input.max_consecutive_losses as f64,
            &[(0.0, 100.0), (10.0, 0.0)],
        ),
        profit_factor: profit_factor_score(input.profit_factor),
        trade_count: piecewise(
            input.total_trades as f64,
            &[(0.0, 0.0), (30.0, 30.0), (200.0, 100.0)],
        ),
        consistency: match input.weekly_win_rate_std {
            Some(std) if std.is_finite() => piecewise(std, &[(0.0, 100.0), (15.0, 0.0)]),
            _ => 50.0,
        },
    };

    let score = breakdown
        .weighted_sum(&weights.normalized())
        .clamp(0.0, 100.0);
    let grade = Grade::from_score(score);

    ScoreResult {
        score,
        breakdown,
        expected_value,
        win_rate,
        grade,
        summary: summarize(score, grade, win_rate, expected_value, &breakdown),
    }
}

fn profit_factor_score(profit_factor: f64) -> f64 {
    if profit_factor.is_nan() {
        return 0.0;
    }
    if profit_factor.is_infinite() {
        return 100.0;
    }
    piecewise(
        profit_factor,
        &[(0.0, 0.0), (1.0, 30.0), (1.5, 60.0), (3.0, 100.0)],
    )
}

/// 구간 선형 보간. 양 끝 바깥은 끝값으로 고정하고 결과를 [0, 100]으로 자릅니다.
fn piecewise(x: f64, points: &[(f64, f64)]) -> f64 {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return 0.0;
    };
    if x.is_nan() {
        return 0.0;
    }
    let y = if x <= first.0 {
        first.1
    } else if x >= last.0 {
        last.1
    } else {
        points
            .windows(2)
            .find(|pair| x <= pair[1].0)
            .map(|pair| {
                let (x0, y0) = pair[0];
                let (x1, y1) = pair[1];
                y0 + (x - x0) / (x1 - x0) * (y1 - y0)
            })
            .unwrap_or(last.1)
    };
    y.clamp(0.0, 100.0)
}

fn summarize(
    score: f64,
    grade: Grade,
    win_rate: f64,
    expected_value: f64,
    breakdown: &ScoreBreakdown,
) -> String {
    let weakest = breakdown
        .items()
        .into_iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(name, _)| name)
        .unwrap_or("-");
    format!(
        "등급 {} ({:.1}점): 승률 {:.1}%, 기대값 {:+.3}, 취약 항목 {}",
        grade, score, win_rate, expected_value, weakest
    )
}

/// ISO 주 단위 승률의 표준편차 (모표준편차).
///
/// 결정된(무승부 제외) 거래가 `min_trades_per_week` 이상인 주만 사용하며,
/// 그런 주가 2개 미만이면 `None`을 반환합니다.
pub fn weekly_win_rate_std(trades: &[BacktestTrade], min_trades_per_week: usize) -> Option<f64> {
    let mut weeks: BTreeMap<(i32, u32), (usize, usize)> = BTreeMap::new();
    for trade in trades {
        let Some(dt) = Utc.timestamp_millis_opt(trade.entry_time).single() else {
            continue;
        };
        let week = dt.iso_week();
        let bucket = weeks.entry((week.year(), week.week())).or_insert((0, 0));
        match trade.outcome {
            TradeOutcome::Win => bucket.0 += 1,
            TradeOutcome::Loss => bucket.1 += 1,
            TradeOutcome::Tie => {}
        }
    }

    let rates: Vec<f64> = weeks
        .values()
        .filter(|(wins, losses)| wins + losses >= min_trades_per_week.max(1))
        .map(|(wins, losses)| *wins as f64 / (wins + losses) as f64 * 100.0)
        .collect();
    if rates.len() < 2 {
        return None;
    }

    let mean = rates.iter().sum::<f64>() / rates.len() as f64;
    let variance = rates.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / rates.len() as f64;
    Some(variance.sqrt())
}
