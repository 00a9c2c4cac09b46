//! Strategy trait 정의.

use trader_core::{Candle, ParamMap, ParamRanges, StrategySignal};

/// 바이너리 옵션 시그널 전략을 위한 Strategy trait.
///
/// 모든 전략은 레지스트리에 등록되기 위해 이 trait를 구현해야 합니다.
/// 전략은 상태가 없는 순수 함수로 취급되며, 시뮬레이션 중에는 읽기 전용으로 공유됩니다.
pub trait Strategy: Send + Sync {
    /// 레지스트리 ID (예: "rsi_reversal").
    fn id(&self) -> &str;

    /// 전략 이름 반환.
    fn name(&self) -> &str;

    /// 전략 설명 반환.
    fn description(&self) -> &str {
        ""
    }

    /// 기본 파라미터.
    ///
    /// 리더보드는 이 값으로 각 전략을 실행합니다.
    fn default_params(&self) -> ParamMap;

    /// 최적화 시 권장 탐색 범위.
    fn param_ranges(&self) -> ParamRanges {
        ParamRanges::new()
    }

    /// 시그널 생성.
    ///
    /// `candles`는 시그널 시점 캔들까지(포함)의 과거 데이터입니다.
    /// 데이터가 부족하면 `None`, 평가했지만 진입하지 않으면 `direction: None`인 시그널을 반환합니다.
    /// `params`에 없는 키는 기본값을 사용합니다.
    fn generate_signal(&self, candles: &[Candle], params: &ParamMap) -> Option<StrategySignal>;
}

/// 등록을 위한 전략 메타데이터.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StrategyMetadata {
    /// 전략 ID
    pub id: String,
    /// 전략 이름
    pub name: String,
    /// 전략 설명
    pub description: String,
    /// 기본 파라미터
    pub default_params: ParamMap,
}

impl StrategyMetadata {
    /// 전략에서 메타데이터 추출
    pub fn of(strategy: &dyn Strategy) -> Self {
        Self {
            id: strategy.id().to_string(),
            name: strategy.name().to_string(),
            description: strategy.description().to_string(),
            default_params: strategy.default_params(),
        }
    }
}

/// 파라미터 조회 헬퍼: `params`에 없으면 `defaults`, 그것도 없으면 `fallback`.
pub fn param_or(params: &ParamMap, defaults: &ParamMap, name: &str, fallback: f64) -> f64 {
    params
        .get(name)
        .or_else(|| defaults.get(name))
        .copied()
        .filter(|v| v.is_finite())
        .unwrap_or(fallback)
}

/// 기간 파라미터를 1 이상의 정수로 변환.
pub fn period_param(value: f64) -> usize {
    value.round().max(1.0) as usize
}
