//! 백테스팅 엔진
//!
//! 고정 만기 바이너리 옵션 방식으로 전략 시그널을 시뮬레이션합니다.
//!
//! # 주요 기능
//!
//! - **캔들 전처리**: 설정의 갭 처리 전략으로 정렬/검증/중복 제거/갭 처리
//! - **거래 시뮬레이션**: 지연(latency)과 슬리피지를 반영한 진입, 만기 시점 청산
//! - **성과 집계**: 승률, 순손익, 최대 낙폭, 프로핏 팩터, 기대 손익, 자산 곡선
//!
//! 포지션은 절대 겹치지 않습니다. 청산 캔들 이후부터 다음 시그널을 평가합니다.
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! use trader_analytics::backtest::{BacktestConfig, BacktestEngine, BetSizing};
//! use trader_strategy::StrategyRegistry;
//!
//! let registry = StrategyRegistry::with_builtins();
//! let engine = BacktestEngine::new(&registry);
//!
//! let config = BacktestConfig::new("rsi_reversal")
//!     .with_bet_sizing(BetSizing::Percentage { percent: 2.0 })
//!     .with_payout_percent(92.0)
//!     .with_expiry_seconds(60);
//!
//! let result = engine.run(&config, &candles)?;
//! println!("{}", result.summary());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use trader_core::{Candle, Direction, ParamMap};
use trader_strategy::StrategyRegistry;

use super::{
    preprocessor::{preprocess, GapStrategy, PreprocessOptions, DEFAULT_MAX_GAP_CANDLES},
    report::{BacktestResult, BacktestTrade, DataQuality, EquityPoint, TradeOutcome},
};

/// 시그널 평가를 시작하는 워밍업 인덱스
pub const LOOKBACK: usize = 50;

/// 백테스트에 필요한 최소 캔들 수
pub const MIN_CANDLES: usize = 50;

/// 백테스트 오류
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    /// 등록되지 않은 전략
    #[error("전략을 찾을 수 없음: {0}")]
    StrategyNotFound(String),

    /// 데이터 부족
    #[error("데이터 부족: 필요={required}, 가용={available}")]
    InsufficientData { required: usize, available: usize },

    /// 설정 오류
    #[error("백테스트 설정 오류: {0}")]
    ConfigError(String),
}

/// 엔진 결과 타입
pub type EngineResult<T> = Result<T, BacktestError>;

// =============================================================================
// 설정
// =============================================================================

/// 베팅 금액 산정 방식
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BetSizing {
    /// 고정 금액
    Fixed { amount: f64 },
    /// 현재 잔고의 비율 (%)
    Percentage { percent: f64 },
}

impl BetSizing {
    /// 현재 잔고 기준 베팅 금액
    pub fn bet_amount(&self, balance: f64) -> f64 {
        match *self {
            BetSizing::Fixed { amount } => amount,
            BetSizing::Percentage { percent } => balance * percent / 100.0,
        }
    }
}

impl Default for BetSizing {
    fn default() -> Self {
        BetSizing::Fixed { amount: 10.0 }
    }
}

/// 백테스트 설정. 실행 중에는 변경되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// 심볼
    #[serde(default)]
    pub symbol: String,

    /// 시뮬레이션 시작 시각 (ms, 포함)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,

    /// 시뮬레이션 종료 시각 (ms, 포함)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,

    /// 초기 잔고
    #[serde(default = "default_initial_balance")]
    pub initial_balance: f64,

    /// 베팅 금액 산정 방식
    #[serde(default)]
    pub bet_sizing: BetSizing,

    /// 승리 시 지급률 (%, 예: 92)
    #[serde(default = "default_payout_percent")]
    pub payout_percent: f64,

    /// 만기 (초)
    #[serde(default = "default_expiry_seconds")]
    pub expiry_seconds: u64,

    /// 진입가 슬리피지 (가격 단위, CALL은 +, PUT은 -)
    #[serde(default)]
    pub slippage: f64,

    /// 시그널 → 진입 지연 (ms)
    #[serde(default)]
    pub latency_ms: i64,

    /// 갭 처리 전략
    #[serde(default)]
    pub gap_strategy: GapStrategy,

    /// 보간/분할 허용 최대 누락 캔들 수
    #[serde(default = "default_max_gap_candles")]
    pub max_gap_candles: usize,

    /// 전략 ID
    #[serde(default)]
    pub strategy_id: String,

    /// 전략 파라미터 (없는 키는 전략 기본값 사용)
    #[serde(default)]
    pub strategy_params: ParamMap,
}

// 설정 기본값 함수들 (serde default용)
fn default_initial_balance() -> f64 {
    1_000.0
}
fn default_payout_percent() -> f64 {
    92.0
}
fn default_expiry_seconds() -> u64 {
    60
}
fn default_max_gap_candles() -> usize {
    DEFAULT_MAX_GAP_CANDLES
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            start_time: None,
            end_time: None,
            initial_balance: default_initial_balance(),
            bet_sizing: BetSizing::default(),
            payout_percent: default_payout_percent(),
            expiry_seconds: default_expiry_seconds(),
            slippage: 0.0,
            latency_ms: 0,
            gap_strategy: GapStrategy::default(),
            max_gap_candles: default_max_gap_candles(),
            strategy_id: String::new(),
            strategy_params: ParamMap::new(),
        }
    }
}

impl BacktestConfig {
    /// 전략 ID로 새 설정 생성
    pub fn new(strategy_id: impl Into<String>) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            ..Default::default()
        }
    }

    /// 심볼 설정
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// 시뮬레이션 구간 설정
    pub fn with_time_window(mut self, start_time: Option<i64>, end_time: Option<i64>) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    /// 초기 잔고 설정
    pub fn with_initial_balance(mut self, balance: f64) -> Self {
        self.initial_balance = balance;
        self
    }

    /// 베팅 방식 설정
    pub fn with_bet_sizing(mut self, sizing: BetSizing) -> Self {
        self.bet_sizing = sizing;
        self
    }

    /// 지급률 설정
    pub fn with_payout_percent(mut self, payout: f64) -> Self {
        self.payout_percent = payout;
        self
    }

    /// 만기 설정
    pub fn with_expiry_seconds(mut self, seconds: u64) -> Self {
        self.expiry_seconds = seconds;
        self
    }

    /// 슬리피지 설정
    pub fn with_slippage(mut self, slippage: f64) -> Self {
        self.slippage = slippage;
        self
    }

    /// 진입 지연 설정
    pub fn with_latency_ms(mut self, latency_ms: i64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// 갭 처리 설정
    pub fn with_gap_strategy(mut self, strategy: GapStrategy, max_gap_candles: usize) -> Self {
        self.gap_strategy = strategy;
        self.max_gap_candles = max_gap_candles;
        self
    }

    /// 전략 변경
    pub fn with_strategy(mut self, strategy_id: impl Into<String>) -> Self {
        self.strategy_id = strategy_id.into();
        self
    }

    /// 전략 파라미터 설정
    pub fn with_params(mut self, params: ParamMap) -> Self {
        self.strategy_params = params;
        self
    }

    /// 전처리 옵션으로 변환
    pub fn preprocess_options(&self) -> PreprocessOptions {
        PreprocessOptions::default()
            .with_gap_strategy(self.gap_strategy)
            .with_max_gap_candles(self.max_gap_candles)
    }

    /// 만기 (ms)
    pub fn expiry_ms(&self) -> i64 {
        self.expiry_seconds as i64 * 1_000
    }

    /// 설정 검증
    pub fn validate(&self) -> EngineResult<()> {
        if !self.initial_balance.is_finite() || self.initial_balance <= 0.0 {
            return Err(BacktestError::ConfigError(
                "초기 잔고는 0보다 커야 합니다".to_string(),
            ));
        }
        match self.bet_sizing {
            BetSizing::Fixed { amount } if !amount.is_finite() || amount <= 0.0 => {
                return Err(BacktestError::ConfigError(
                    "고정 베팅 금액은 0보다 커야 합니다".to_string(),
                ));
            }
            BetSizing::Percentage { percent }
                if !percent.is_finite() || percent <= 0.0 || percent > 100.0 =>
            {
                return Err(BacktestError::ConfigError(
                    "베팅 비율은 0 초과 100 이하여야 합니다".to_string(),
                ));
            }
            _ => {}
        }
        if !self.payout_percent.is_finite() || self.payout_percent <= 0.0 {
            return Err(BacktestError::ConfigError(
                "지급률은 0보다 커야 합니다".to_string(),
            ));
        }
        if self.expiry_seconds == 0 {
            return Err(BacktestError::ConfigError(
                "만기는 1초 이상이어야 합니다".to_string(),
            ));
        }
        if !self.slippage.is_finite() || self.slippage < 0.0 {
            return Err(BacktestError::ConfigError(
                "슬리피지는 0 이상이어야 합니다".to_string(),
            ));
        }
        if self.latency_ms < 0 {
            return Err(BacktestError::ConfigError(
                "지연은 0 이상이어야 합니다".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start > end {
                return Err(BacktestError::ConfigError(
                    "시작 시각이 종료 시각보다 늦습니다".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// 엔진
// =============================================================================

/// 백테스팅 엔진
///
/// 레지스트리를 읽기 전용으로 참조하며 실행 간 공유 상태가 없습니다.
/// 같은 엔진으로 여러 스레드에서 동시에 `run`을 호출해도 안전합니다.
#[derive(Debug, Clone, Copy)]
pub struct BacktestEngine<'a> {
    registry: &'a StrategyRegistry,
}

impl<'a> BacktestEngine<'a> {
    /// 새로운 백테스트 엔진을 생성합니다.
    pub fn new(registry: &'a StrategyRegistry) -> Self {
        Self { registry }
    }

    /// 전략 레지스트리
    pub fn registry(&self) -> &'a StrategyRegistry {
        self.registry
    }

    /// 백테스트 실행.
    ///
    /// # 오류
    ///
    /// - [`BacktestError::StrategyNotFound`]: 등록되지 않은 전략 ID
    /// - [`BacktestError::InsufficientData`]: 전처리/구간 필터 후 캔들이 50개 미만
    /// - [`BacktestError::ConfigError`]: 설정 검증 실패
    pub fn run(&self, config: &BacktestConfig, raw_candles: &[Candle]) -> EngineResult<BacktestResult> {
        let strategy = self
            .registry
            .get(&config.strategy_id)
            .ok_or_else(|| BacktestError::StrategyNotFound(config.strategy_id.clone()))?;
        config.validate()?;

        if raw_candles.len() < MIN_CANDLES {
            return Err(BacktestError::InsufficientData {
                required: MIN_CANDLES,
                available: raw_candles.len(),
            });
        }

        // 1. 전처리
        let prepared = preprocess(raw_candles, &config.preprocess_options());
        let data_quality = DataQuality::from(&prepared);
        let candles: Vec<Candle> = prepared
            .candles
            .into_iter()
            .filter(|c| config.start_time.map_or(true, |start| c.timestamp >= start))
            .filter(|c| config.end_time.map_or(true, |end| c.timestamp <= end))
            .collect();

        if candles.len() < MIN_CANDLES {
            return Err(BacktestError::InsufficientData {
                required: MIN_CANDLES,
                available: candles.len(),
            });
        }

        let mut ledger = Ledger::new(config.initial_balance, candles[0].timestamp);
        let expiry_ms = config.expiry_ms();

        // 2. 시그널 평가 루프
        let mut i = LOOKBACK;
        while i < candles.len() {
            let Some(signal) = strategy.generate_signal(&candles[..=i], &config.strategy_params)
            else {
                i += 1;
                continue;
            };
            let Some(direction) = signal.direction else {
                i += 1;
                continue;
            };

            // 3. 베팅 금액
            let bet = config.bet_sizing.bet_amount(ledger.balance);
            if !(bet > 0.0) || bet > ledger.balance {
                i += 1;
                continue;
            }

            // 4. 진입 (지연 반영)
            let signal_time = candles[i].timestamp;
            let entry_index = if config.latency_ms > 0 {
                match first_at_or_after(&candles, i, signal_time + config.latency_ms) {
                    Some(index) => index,
                    None => break,
                }
            } else {
                i
            };
            let entry_candle = &candles[entry_index];
            let entry_price = entry_candle.close + direction.sign() * config.slippage;

            // 5. 만기 청산
            let expected_exit = entry_candle.timestamp + expiry_ms;
            let Some(exit_index) = first_at_or_after(&candles, entry_index + 1, expected_exit)
            else {
                break;
            };
            let exit_candle = &candles[exit_index];
            if exit_candle.timestamp - expected_exit > 2 * expiry_ms {
                debug!(
                    signal_time,
                    expected_exit,
                    actual_exit = exit_candle.timestamp,
                    "청산 캔들이 데이터 갭 뒤에 있어 거래 제외"
                );
                i += 1;
                continue;
            }

            // 6~7. 결과 판정 및 잔고 반영
            let outcome = settle(direction, entry_price, exit_candle.close);
            let trade = ledger.record(TradeDraft {
                entry_time: entry_candle.timestamp,
                exit_time: exit_candle.timestamp,
                entry_price,
                exit_price: exit_candle.close,
                direction,
                outcome,
                bet_amount: bet,
                payout_percent: config.payout_percent,
                confidence: signal.confidence,
                indicators: signal.indicators,
            });
            debug!(
                direction = %trade.direction,
                outcome = ?trade.outcome,
                entry_price = trade.entry_price,
                exit_price = trade.exit_price,
                profit = trade.profit,
                balance = trade.balance_after,
                "거래 기록"
            );

            // 8. 포지션이 겹치지 않도록 청산 캔들 이후로 이동
            i = exit_index + 1;
        }

        let start_time = candles[0].timestamp;
        let end_time = candles[candles.len() - 1].timestamp;
        let result = ledger.finish(config, data_quality, start_time, end_time);

        info!(
            strategy_id = %result.strategy_id,
            trades = result.total_trades,
            win_rate = result.win_rate,
            net_profit = result.net_profit,
            max_drawdown = result.max_drawdown,
            "백테스트 완료"
        );

        Ok(result)
    }
}

/// 결과 판정: 같으면 TIE, 시그널 방향으로 움직였으면 WIN.
fn settle(direction: Direction, entry_price: f64, exit_price: f64) -> TradeOutcome {
    if exit_price == entry_price {
        return TradeOutcome::Tie;
    }
    let moved_up = exit_price > entry_price;
    match (direction, moved_up) {
        (Direction::Call, true) | (Direction::Put, false) => TradeOutcome::Win,
        _ => TradeOutcome::Loss,
    }
}

/// `from` 이후에서 타임스탬프가 `target` 이상인 첫 캔들 인덱스
fn first_at_or_after(candles: &[Candle], from: usize, target: i64) -> Option<usize> {
    if from >= candles.len() {
        return None;
    }
    let offset = candles[from..].partition_point(|c| c.timestamp < target);
    let index = from + offset;
    (index < candles.len()).then_some(index)
}

/// 프로핏 팩터: 손실이 없고 이익이 있으면 무한대, 거래/이익이 없으면 0
pub fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

// =============================================================================
// 잔고/통계 누적기
// =============================================================================

struct TradeDraft {
    entry_time: i64,
    exit_time: i64,
    entry_price: f64,
    exit_price: f64,
    direction: Direction,
    outcome: TradeOutcome,
    bet_amount: f64,
    payout_percent: f64,
    confidence: f64,
    indicators: std::collections::BTreeMap<String, f64>,
}

/// 한 번의 실행에서만 사용하는 누적기
struct Ledger {
    initial_balance: f64,
    balance: f64,
    peak_balance: f64,
    max_drawdown: f64,
    max_drawdown_percent: f64,
    gross_profit: f64,
    gross_loss: f64,
    wins: usize,
    losses: usize,
    ties: usize,
    win_streak: usize,
    loss_streak: usize,
    max_consecutive_wins: usize,
    max_consecutive_losses: usize,
    total_volume: f64,
    equity_curve: Vec<EquityPoint>,
    trades: Vec<BacktestTrade>,
}

impl Ledger {
    fn new(initial_balance: f64, start_time: i64) -> Self {
        Self {
            initial_balance,
            balance: initial_balance,
            peak_balance: initial_balance,
            max_drawdown: 0.0,
            max_drawdown_percent: 0.0,
            gross_profit: 0.0,
            gross_loss: 0.0,
            wins: 0,
            losses: 0,
            ties: 0,
            win_streak: 0,
            loss_streak: 0,
            max_consecutive_wins: 0,
            max_consecutive_losses: 0,
            total_volume: 0.0,
            equity_curve: vec![EquityPoint {
                timestamp: start_time,
                balance: initial_balance,
            }],
            trades: Vec::new(),
        }
    }

    fn record(&mut self, draft: TradeDraft) -> &BacktestTrade {
        let profit = match draft.outcome {
            TradeOutcome::Win => draft.bet_amount * draft.payout_percent / 100.0,
            TradeOutcome::Loss => -draft.bet_amount,
            TradeOutcome::Tie => 0.0,
        };

        match draft.outcome {
            TradeOutcome::Win => {
                self.wins += 1;
                self.gross_profit += profit;
                self.win_streak += 1;
                self.loss_streak = 0;
                self.max_consecutive_wins = self.max_consecutive_wins.max(self.win_streak);
            }
            TradeOutcome::Loss => {
                self.losses += 1;
                self.gross_loss += -profit;
                self.loss_streak += 1;
                self.win_streak = 0;
                self.max_consecutive_losses = self.max_consecutive_losses.max(self.loss_streak);
            }
            // 무승부는 연승/연패를 끊지도 잇지도 않음
            TradeOutcome::Tie => self.ties += 1,
        }

        self.balance += profit;
        self.total_volume += draft.bet_amount;
        self.peak_balance = self.peak_balance.max(self.balance);
        let drawdown = self.peak_balance - self.balance;
        self.max_drawdown = self.max_drawdown.max(drawdown);
        if self.peak_balance > 0.0 {
            self.max_drawdown_percent = self
                .max_drawdown_percent
                .max(drawdown / self.peak_balance * 100.0);
        }

        self.equity_curve.push(EquityPoint {
            timestamp: draft.exit_time,
            balance: self.balance,
        });
        self.trades.push(BacktestTrade {
            entry_time: draft.entry_time,
            exit_time: draft.exit_time,
            entry_price: draft.entry_price,
            exit_price: draft.exit_price,
            direction: draft.direction,
            outcome: draft.outcome,
            bet_amount: draft.bet_amount,
            payout_percent: draft.payout_percent,
            profit,
            balance_after: self.balance,
            confidence: draft.confidence,
            indicators: draft.indicators,
        });
        &self.trades[self.trades.len() - 1]
    }

    fn finish(
        self,
        config: &BacktestConfig,
        data_quality: DataQuality,
        start_time: i64,
        end_time: i64,
    ) -> BacktestResult {
        let total_trades = self.trades.len();
        let decided = self.wins + self.losses;
        let net_profit = self.balance - self.initial_balance;

        BacktestResult {
            strategy_id: config.strategy_id.clone(),
            symbol: config.symbol.clone(),
            params: config.strategy_params.clone(),
            initial_balance: self.initial_balance,
            final_balance: self.balance,
            total_trades,
            wins: self.wins,
            losses: self.losses,
            ties: self.ties,
            win_rate: if decided > 0 {
                self.wins as f64 / decided as f64 * 100.0
            } else {
                0.0
            },
            net_profit,
            net_profit_percent: net_profit / self.initial_balance * 100.0,
            gross_profit: self.gross_profit,
            gross_loss: self.gross_loss,
            max_drawdown: self.max_drawdown,
            max_drawdown_percent: self.max_drawdown_percent,
            profit_factor: profit_factor(self.gross_profit, self.gross_loss),
            expectancy: if total_trades > 0 {
                net_profit / total_trades as f64
            } else {
                0.0
            },
            max_consecutive_wins: self.max_consecutive_wins,
            max_consecutive_losses: self.max_consecutive_losses,
            total_volume: self.total_volume,
            equity_curve: self.equity_curve,
            trades: self.trades,
            data_quality,
            start_time,
            end_time,
        }
    }
}

/// 테스트용 전략
#[cfg(test)]
pub mod test_strategies {
    use std::sync::Arc;

    use trader_core::{Candle, Direction, ParamMap, StrategySignal};
    use trader_strategy::{param_or, period_param, Strategy, StrategyRegistry};

    /// 항상 같은 방향으로 진입하는 전략 (테스트용)
    pub struct AlwaysStrategy {
        pub id: &'static str,
        pub direction: Direction,
    }

    impl Strategy for AlwaysStrategy {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            "Always"
        }

        fn default_params(&self) -> ParamMap {
            ParamMap::new()
        }

        fn generate_signal(&self, _candles: &[Candle], _params: &ParamMap) -> Option<StrategySignal> {
            Some(StrategySignal::entry(self.direction, 0.8).with_indicator("always", 1.0))
        }
    }

    /// 종가가 `period` 평균보다 높으면 CALL, 낮으면 PUT (파라미터에 민감한 테스트 전략)
    pub struct TrendStrategy;

    impl Strategy for TrendStrategy {
        fn id(&self) -> &str {
            "trend"
        }

        fn name(&self) -> &str {
            "Trend"
        }

        fn default_params(&self) -> ParamMap {
            ParamMap::from([("period".to_string(), 10.0)])
        }

        fn generate_signal(&self, candles: &[Candle], params: &ParamMap) -> Option<StrategySignal> {
            let period = period_param(param_or(params, &self.default_params(), "period", 10.0));
            if candles.len() < period {
                return None;
            }
            let window = &candles[candles.len() - period..];
            let mean = window.iter().map(|c| c.close).sum::<f64>() / period as f64;
            let close = candles.last()?.close;
            let signal = if close > mean {
                StrategySignal::call(0.6)
            } else if close < mean {
                StrategySignal::put(0.6)
            } else {
                StrategySignal::none()
            };
            Some(signal.with_indicator("mean", mean))
        }
    }

    /// 아무 거래도 하지 않는 전략
    pub struct IdleStrategy;

    impl Strategy for IdleStrategy {
        fn id(&self) -> &str {
            "idle"
        }

        fn name(&self) -> &str {
            "Idle"
        }

        fn default_params(&self) -> ParamMap {
            ParamMap::new()
        }

        fn generate_signal(&self, _candles: &[Candle], _params: &ParamMap) -> Option<StrategySignal> {
            Some(StrategySignal::none())
        }
    }

    /// 테스트 전략이 모두 등록된 레지스트리
    pub fn registry() -> StrategyRegistry {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(AlwaysStrategy {
            id: "always_call",
            direction: Direction::Call,
        }));
        registry.register(Arc::new(AlwaysStrategy {
            id: "always_put",
            direction: Direction::Put,
        }));
        registry.register(Arc::new(TrendStrategy));
        registry.register(Arc::new(IdleStrategy));
        registry
    }

    pub const MINUTE: i64 = 60_000;
    pub const BASE_TIME: i64 = 1_700_000_000_000;

    /// 1분 간격, 종가가 `step`씩 변하는 캔들
    pub fn linear_candles(count: usize, start: f64, step: f64) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let close = start + step * i as f64;
                let open = close - step / 2.0;
                Candle::new(
                    BASE_TIME + i as i64 * MINUTE,
                    open,
                    open.max(close) + 0.0005,
                    open.min(close) - 0.0005,
                    close,
                )
                .with_volume(100.0)
            })
            .collect()
    }

    /// 1분 간격 사인파 캔들 (방향 전환이 섞인 데이터)
    pub fn wave_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let t = i as f64;
                let close = 1.10 + 0.01 * (t / 7.0).sin() + 0.003 * (t * 1.3).sin();
                let open = 1.10 + 0.01 * ((t - 0.5) / 7.0).sin() + 0.003 * ((t - 0.5) * 1.3).sin();
                Candle::new(
                    BASE_TIME + i as i64 * MINUTE,
                    open,
                    open.max(close) + 0.0004,
                    open.min(close) - 0.0004,
                    close,
                )
                .with_volume(50.0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_strategies::*;
    use super::*;

    fn run(config: &BacktestConfig, candles: &[Candle]) -> EngineResult<BacktestResult> {
        let registry = registry();
        BacktestEngine::new(&registry).run(config, candles)
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = BacktestConfig::new("always_call");
        assert_eq!(config.initial_balance, 1_000.0);
        assert_eq!(config.payout_percent, 92.0);
        assert_eq!(config.gap_strategy, GapStrategy::Skip);
        assert_eq!(config.max_gap_candles, 10);
        assert!(config.validate().is_ok());

        assert!(config.clone().with_initial_balance(-1.0).validate().is_err());
        assert!(config.clone().with_expiry_seconds(0).validate().is_err());
        assert!(config
            .clone()
            .with_bet_sizing(BetSizing::Percentage { percent: 150.0 })
            .validate()
            .is_err());
        assert!(config.clone().with_latency_ms(-5).validate().is_err());
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: BacktestConfig = serde_json::from_str(
            r#"{"strategy_id":"rsi_reversal","bet_sizing":{"type":"percentage","percent":5}}"#,
        )
        .unwrap();
        assert_eq!(config.bet_sizing, BetSizing::Percentage { percent: 5.0 });
        assert_eq!(config.expiry_seconds, 60);
        assert_eq!(config.max_gap_candles, 10);
    }

    #[test]
    fn test_unknown_strategy() {
        let candles = linear_candles(100, 1.0, 0.001);
        let err = run(&BacktestConfig::new("nope"), &candles).unwrap_err();
        assert_eq!(err, BacktestError::StrategyNotFound("nope".to_string()));
    }

    #[test]
    fn test_insufficient_data() {
        let candles = linear_candles(49, 1.0, 0.001);
        let err = run(&BacktestConfig::new("always_call"), &candles).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::InsufficientData {
                required: 50,
                available: 49
            }
        ));
    }

    #[test]
    fn test_insufficient_after_time_filter() {
        let candles = linear_candles(100, 1.0, 0.001);
        let config = BacktestConfig::new("always_call")
            .with_time_window(Some(candles[60].timestamp), None);
        let err = run(&config, &candles).unwrap_err();
        assert!(matches!(
            err,
            BacktestError::InsufficientData { available: 40, .. }
        ));
    }

    #[test]
    fn test_rising_market_all_calls_win() {
        let candles = linear_candles(100, 1.0, 0.001);
        let result = run(&BacktestConfig::new("always_call"), &candles).unwrap();

        // 50, 52, ..., 98 에서 진입
        assert_eq!(result.total_trades, 25);
        assert_eq!(result.wins, 25);
        assert_eq!(result.win_rate, 100.0);
        assert!((result.net_profit - 25.0 * 10.0 * 0.92).abs() < 1e-9);
        assert!(result.profit_factor.is_infinite());
        assert_eq!(result.max_drawdown, 0.0);
        assert_eq!(result.max_consecutive_wins, 25);
        assert_eq!(result.equity_curve.len(), 26);
        assert_eq!(result.trades[0].entry_time, candles[50].timestamp);
        assert_eq!(result.trades[0].exit_time, candles[51].timestamp);
    }

    #[test]
    fn test_falling_market_all_calls_lose() {
        let candles = linear_candles(100, 2.0, -0.001);
        let result = run(&BacktestConfig::new("always_call"), &candles).unwrap();

        assert_eq!(result.losses, 25);
        assert_eq!(result.profit_factor, 0.0);
        assert!((result.max_drawdown - 250.0).abs() < 1e-9);
        assert!((result.max_drawdown_percent - 25.0).abs() < 1e-9);
        assert_eq!(result.max_consecutive_losses, 25);
        assert!((result.expectancy + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_put_wins_in_falling_market() {
        let candles = linear_candles(100, 2.0, -0.001);
        let result = run(&BacktestConfig::new("always_put"), &candles).unwrap();
        assert_eq!(result.wins, result.total_trades);
    }

    #[test]
    fn test_flat_market_ties() {
        let candles: Vec<Candle> = (0..80)
            .map(|i| Candle::flat(BASE_TIME + i * MINUTE, 1.5))
            .collect();
        let result = run(&BacktestConfig::new("always_call"), &candles).unwrap();
        assert_eq!(result.ties, result.total_trades);
        assert_eq!(result.net_profit, 0.0);
        assert_eq!(result.win_rate, 0.0);
        assert_eq!(result.profit_factor, 0.0);
    }

    #[test]
    fn test_percentage_bet_compounds() {
        let candles = linear_candles(56, 1.0, 0.001);
        let config = BacktestConfig::new("always_call")
            .with_bet_sizing(BetSizing::Percentage { percent: 10.0 });
        let result = run(&config, &candles).unwrap();

        // 50, 52, 54 진입 → 3회 승리
        assert_eq!(result.total_trades, 3);
        assert!((result.trades[0].bet_amount - 100.0).abs() < 1e-9);
        assert!((result.trades[1].bet_amount - 109.2).abs() < 1e-9);
        let expected = 1_000.0 * 1.092_f64.powi(3);
        assert!((result.final_balance - expected).abs() < 1e-6);
    }

    #[test]
    fn test_bet_larger_than_balance_skipped() {
        let candles = linear_candles(100, 1.0, 0.001);
        let config = BacktestConfig::new("always_call").with_initial_balance(5.0);
        let result = run(&config, &candles).unwrap();
        assert_eq!(result.total_trades, 0);
        assert_eq!(result.expectancy, 0.0);
        assert_eq!(result.profit_factor, 0.0);
    }

    #[test]
    fn test_latency_delays_entry() {
        let candles = linear_candles(100, 1.0, 0.001);
        let config = BacktestConfig::new("always_call").with_latency_ms(30_000);
        let result = run(&config, &candles).unwrap();

        let first = &result.trades[0];
        assert_eq!(first.entry_time, candles[51].timestamp);
        assert_eq!(first.entry_price, candles[51].close);
        assert_eq!(first.exit_time, candles[52].timestamp);
    }

    #[test]
    fn test_slippage_moves_entry_against_trader() {
        let candles = linear_candles(100, 1.0, 0.001);
        let config = BacktestConfig::new("always_call").with_slippage(0.002);
        let result = run(&config, &candles).unwrap();

        let first = &result.trades[0];
        assert!((first.entry_price - (candles[50].close + 0.002)).abs() < 1e-12);
        assert_eq!(result.wins, 0);
        assert_eq!(result.losses, result.total_trades);

        let put = run(
            &BacktestConfig::new("always_put").with_slippage(0.002),
            &candles,
        )
        .unwrap();
        assert!((put.trades[0].entry_price - (candles[50].close - 0.002)).abs() < 1e-12);
    }

    #[test]
    fn test_trade_across_data_gap_discarded() {
        let mut candles = linear_candles(100, 1.0, 0.001);
        for candle in candles.iter_mut().skip(61) {
            candle.timestamp += 10 * MINUTE;
        }
        let result = run(&BacktestConfig::new("always_call"), &candles).unwrap();

        assert!(result
            .trades
            .iter()
            .all(|t| t.entry_time != candles[60].timestamp));
        assert!(result
            .trades
            .iter()
            .all(|t| t.exit_time - t.entry_time <= 3 * MINUTE));
        assert_eq!(result.data_quality.gaps_detected, 1);
        assert_eq!(result.data_quality.missing_candles, 10);
    }

    #[test]
    fn test_trades_never_overlap() {
        let candles = wave_candles(400);
        let config = BacktestConfig::new("trend").with_expiry_seconds(180);
        let result = run(&config, &candles).unwrap();

        assert!(result.total_trades > 10);
        for pair in result.trades.windows(2) {
            assert!(pair[1].entry_time >= pair[0].exit_time);
        }
        assert_eq!(
            result.wins + result.losses + result.ties,
            result.total_trades
        );
        let sum: f64 = result.trades.iter().map(|t| t.profit).sum();
        assert!((sum - result.net_profit).abs() < 1e-9);
    }

    #[test]
    fn test_idle_strategy_no_trades() {
        let candles = wave_candles(100);
        let result = run(&BacktestConfig::new("idle"), &candles).unwrap();
        assert_eq!(result.total_trades, 0);
        assert_eq!(result.final_balance, result.initial_balance);
        assert_eq!(result.equity_curve.len(), 1);
        assert!(!result.summary().is_empty());
    }

    #[test]
    fn test_data_quality_copied_from_preprocessing() {
        let mut candles = linear_candles(100, 1.0, 0.001);
        candles.push(candles[10]);
        candles[20].low = candles[20].high + 1.0;

        let result = run(&BacktestConfig::new("always_call"), &candles).unwrap();
        assert_eq!(result.data_quality.input_candles, 101);
        assert_eq!(result.data_quality.duplicates_removed, 1);
        assert_eq!(result.data_quality.invalid_removed, 1);
        assert_eq!(result.data_quality.valid_candles, 99);
    }
}
