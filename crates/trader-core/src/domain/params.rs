//! 전략 파라미터와 탐색 범위.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 전략 수치 파라미터 (이름 → 값).
///
/// 순서가 고정되어야 조합 열거/로그 출력이 재현 가능하므로 `BTreeMap`을 사용합니다.
pub type ParamMap = BTreeMap<String, f64>;

/// 파라미터 이름별 탐색 범위.
pub type ParamRanges = BTreeMap<String, ParamRange>;

/// 그리드 개수 계산 시 허용 오차
const STEP_EPSILON: f64 = 1e-9;

/// 단일 파라미터의 `{min, max, step}` 범위 (max 포함).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    /// 최솟값
    pub min: f64,
    /// 최댓값 (포함)
    pub max: f64,
    /// 증가 폭
    pub step: f64,
}

impl ParamRange {
    /// 새 범위 생성.
    pub fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    /// 단일 값 범위
    pub fn fixed(value: f64) -> Self {
        Self::new(value, value, 1.0)
    }

    /// 범위 폭 (`max - min`, 음수면 0)
    pub fn span(&self) -> f64 {
        (self.max - self.min).max(0.0)
    }

    /// 그리드 값 개수.
    ///
    /// step이 0 이하이거나 max < min이면 `min` 하나만 사용합니다.
    /// 폭/step 비율이 `usize` 범위를 넘으면 `usize::MAX`로 포화됩니다.
    pub fn len(&self) -> usize {
        if !self.is_steppable() {
            return 1;
        }
        // f64 → usize 변환은 포화되므로 +1만 오버플로 가능
        (((self.span() + STEP_EPSILON) / self.step).floor() as usize).saturating_add(1)
    }

    /// 값이 하나도 없는 범위는 존재하지 않으므로 항상 `false`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `min`부터 `max`까지(포함) step 간격의 모든 값.
    pub fn values(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.value_at(i)).collect()
    }

    /// i번째 그리드 값
    pub fn value_at(&self, index: usize) -> f64 {
        if !self.is_steppable() {
            return self.min;
        }
        let value = self.min + self.step * index as f64;
        round_precision(value.min(self.max))
    }

    /// 임의 값을 가장 가까운 그리드 값으로 맞춥니다 (범위 밖이면 클램프).
    pub fn snap(&self, value: f64) -> f64 {
        if !self.is_steppable() || !value.is_finite() {
            return self.min;
        }
        let clamped = value.clamp(self.min, self.max);
        let index = ((clamped - self.min) / self.step).round() as usize;
        self.value_at(index.min(self.len() - 1))
    }

    /// `[0, 1]` 정규화 (폭이 0이면 0).
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.span();
        if span <= 0.0 {
            0.0
        } else {
            ((value - self.min) / span).clamp(0.0, 1.0)
        }
    }

    /// 정규화 값을 실제 값으로 되돌린 뒤 그리드에 맞춥니다.
    pub fn denormalize(&self, unit: f64) -> f64 {
        self.snap(self.min + unit.clamp(0.0, 1.0) * self.span())
    }

    fn is_steppable(&self) -> bool {
        self.step.is_finite()
            && self.step > 0.0
            && self.min.is_finite()
            && self.max.is_finite()
            && self.max >= self.min
    }
}

/// 누적 오차 제거 (0.1 + 0.2 = 0.30000000000000004 → 0.3).
fn round_precision(value: f64) -> f64 {
    (value * 1e9).round() / 1e9
}

/// 파라미터 맵을 사람이 읽을 수 있는 고정 순서 문자열로 변환 (`a=1, b=2`).
pub fn format_params(params: &ParamMap) -> String {
    params
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(", ")
}
