//! 백테스트 결과 레코드.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trader_core::{format_params, Direction, ParamMap};

use super::preprocessor::PreprocessResult;

/// 거래 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeOutcome {
    /// 예측 방향으로 이동
    Win,
    /// 반대 방향으로 이동
    Loss,
    /// 진입가 = 청산가
    Tie,
}

/// 시뮬레이션된 단일 포지션. 추가된 뒤에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrade {
    /// 진입 시각 (ms)
    pub entry_time: i64,
    /// 청산 시각 (ms)
    pub exit_time: i64,
    /// 진입가 (슬리피지 반영)
    pub entry_price: f64,
    /// 청산가
    pub exit_price: f64,
    /// 방향
    pub direction: Direction,
    /// 결과
    pub outcome: TradeOutcome,
    /// 베팅 금액
    pub bet_amount: f64,
    /// 페이아웃 (%)
    pub payout_percent: f64,
    /// 손익
    pub profit: f64,
    /// 거래 후 잔고
    pub balance_after: f64,
    /// 시그널 신뢰도
    pub confidence: f64,
    /// 진입 시점 지표 스냅샷
    #[serde(default)]
    pub indicators: BTreeMap<String, f64>,
}

/// 자산 곡선 포인트
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// 시각 (ms)
    pub timestamp: i64,
    /// 잔고
    pub balance: f64,
}

/// 데이터 품질 리포트 (전처리 결과 복사본)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataQuality {
    /// 입력 캔들 수
    pub input_candles: usize,
    /// 검증/중복 제거 후 캔들 수
    pub valid_candles: usize,
    /// 제거된 유효하지 않은 캔들 수
    pub invalid_removed: usize,
    /// 제거된 중복 캔들 수
    pub duplicates_removed: usize,
    /// 탐지된 갭 수
    pub gaps_detected: usize,
    /// 누락 캔들 합계
    pub missing_candles: usize,
    /// 커버리지 (%)
    pub coverage_percent: f64,
    /// 탐지된 간격 (ms)
    pub detected_interval_ms: i64,
    /// 전처리 경고
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<&PreprocessResult> for DataQuality {
    fn from(result: &PreprocessResult) -> Self {
        let analysis = &result.analysis;
        Self {
            input_candles: analysis.input_count,
            valid_candles: analysis.valid_count,
            invalid_removed: analysis.invalid_removed,
            duplicates_removed: analysis.duplicates_removed,
            gaps_detected: analysis.gaps.len(),
            missing_candles: analysis.total_missing,
            coverage_percent: analysis.coverage_percent,
            detected_interval_ms: analysis.detected_interval_ms,
            warnings: result.warnings.clone(),
        }
    }
}

/// 백테스트 실행 결과
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestResult {
    /// 전략 ID
    pub strategy_id: String,
    /// 심볼
    pub symbol: String,
    /// 사용된 전략 파라미터
    pub params: ParamMap,
    /// 초기 잔고
    pub initial_balance: f64,
    /// 최종 잔고
    pub final_balance: f64,

    /// 총 거래 수
    pub total_trades: usize,
    /// 승리 수
    pub wins: usize,
    /// 패배 수
    pub losses: usize,
    /// 무승부 수
    pub ties: usize,
    /// 승률 (%, 무승부 제외)
    pub win_rate: f64,

    /// 순손익
    pub net_profit: f64,
    /// 순손익률 (%)
    pub net_profit_percent: f64,
    /// 총 이익
    pub gross_profit: f64,
    /// 총 손실 (양수)
    pub gross_loss: f64,
    /// 최대 낙폭 (금액)
    pub max_drawdown: f64,
    /// 최대 낙폭 (%, 고점 대비)
    pub max_drawdown_percent: f64,
    /// 프로핏 팩터 (손실이 없고 이익이 있으면 무한대)
    #[serde(with = "trader_core::serde_helpers::float")]
    pub profit_factor: f64,
    /// 거래당 기대 손익
    pub expectancy: f64,
    /// 최대 연승
    pub max_consecutive_wins: usize,
    /// 최대 연패
    pub max_consecutive_losses: usize,
    /// 총 베팅 금액
    pub total_volume: f64,

    /// 자산 곡선
    pub equity_curve: Vec<EquityPoint>,
    /// 거래 목록
    pub trades: Vec<BacktestTrade>,
    /// 데이터 품질
    pub data_quality: DataQuality,

    /// 시뮬레이션 구간 시작 (ms)
    pub start_time: i64,
    /// 시뮬레이션 구간 종료 (ms)
    pub end_time: i64,
}

impl BacktestResult {
    /// 요약 문자열 반환
    pub fn summary(&self) -> String {
        let profit_factor = if self.profit_factor.is_finite() {
            format!("{:.2}", self.profit_factor)
        } else {
            "∞".to_string()
        };

        format!(
            "백테스트 결과 요약\n\
             ═══════════════════════════════════════\n\
             전략: {} ({})\n\
             심볼: {}\n\
             기간: {} → {}\n\
             데이터: 캔들 {}개, 커버리지 {:.1}%, 갭 {}개\n\
             ───────────────────────────────────────\n\
             초기 잔고: {:.2}\n\
             최종 잔고: {:.2}\n\
             순손익: {:.2} ({:.2}%)\n\
             ───────────────────────────────────────\n\
             총 거래: {} (승 {} / 패 {} / 무 {})\n\
             승률: {:.1}%\n\
             프로핏 팩터: {}\n\
             기대 손익: {:.4}\n\
             최대 낙폭: {:.2} ({:.2}%)\n\
             최대 연패: {}\n\
             ═══════════════════════════════════════",
            self.strategy_id,
            format_params(&self.params),
            self.symbol,
            format_timestamp(self.start_time),
            format_timestamp(self.end_time),
            self.data_quality.valid_candles,
            self.data_quality.coverage_percent,
            self.data_quality.gaps_detected,
            self.initial_balance,
            self.final_balance,
            self.net_profit,
            self.net_profit_percent,
            self.total_trades,
            self.wins,
            self.losses,
            self.ties,
            self.win_rate,
            profit_factor,
            self.expectancy,
            self.max_drawdown,
            self.max_drawdown_percent,
            self.max_consecutive_losses,
        )
    }
}

/// ms 타임스탬프를 `YYYY-MM-DD HH:MM` (UTC)로 변환
pub(crate) fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}
