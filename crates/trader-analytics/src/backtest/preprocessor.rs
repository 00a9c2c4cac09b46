//! 캔들 전처리 모듈
//!
//! 원시 캔들 배열을 백테스트 가능한 형태로 정규화합니다.
//!
//! # 처리 순서
//!
//! 1. 타임스탬프 오름차순 안정 정렬
//! 2. 유효성 검사 (비유한/비양수/OHLC 불일치 제거)
//! 3. 중복 타임스탬프 제거 (마지막 값 유지)
//! 4. 지배적 간격(최빈 간격) 탐지
//! 5. 갭 탐지
//! 6. 갭 처리 전략 적용 (skip / fill / split)
//! 7. 커버리지 계산
//!
//! 전처리는 실패하지 않습니다. 입력이 비어 있거나 이상하면 보수적인 기본값으로 축소됩니다.
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! use trader_analytics::backtest::{preprocess, GapStrategy, PreprocessOptions};
//!
//! let options = PreprocessOptions::default().with_gap_strategy(GapStrategy::Fill);
//! let result = preprocess(&raw_candles, &options);
//! println!("커버리지: {:.1}%", result.analysis.coverage_percent);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use trader_core::Candle;

/// 간격을 알 수 없을 때 사용하는 기본 간격 (1분)
pub const DEFAULT_INTERVAL_MS: i64 = 60_000;

/// 갭 판정 배수 기본값
pub const DEFAULT_TOLERANCE_FACTOR: f64 = 1.5;

/// 보간/분할 허용 최대 누락 캔들 수 기본값
pub const DEFAULT_MAX_GAP_CANDLES: usize = 10;

/// 합성 캔들 고가/저가 스프레드 (0.01%)
const SYNTHETIC_SPREAD: f64 = 0.0001;

// =============================================================================
// 옵션 / 결과 타입
// =============================================================================

/// 갭 처리 전략
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapStrategy {
    /// 데이터 유지, 경고만 기록
    #[default]
    Skip,
    /// 선형 보간 캔들 삽입
    Fill,
    /// 큰 갭 기준으로 구간 분할 후 가장 긴 구간 사용
    Split,
}

impl std::fmt::Display for GapStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GapStrategy::Skip => write!(f, "skip"),
            GapStrategy::Fill => write!(f, "fill"),
            GapStrategy::Split => write!(f, "split"),
        }
    }
}

/// 전처리 옵션
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessOptions {
    /// 갭 처리 전략
    #[serde(default)]
    pub gap_strategy: GapStrategy,

    /// fill/split에서 허용하는 최대 누락 캔들 수
    #[serde(default = "default_max_gap_candles")]
    pub max_gap_candles: usize,

    /// 간격의 몇 배를 넘으면 갭으로 볼지
    #[serde(default = "default_tolerance_factor")]
    pub tolerance_factor: f64,

    /// 간격 강제 지정 (None이면 자동 탐지)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<i64>,
}

fn default_max_gap_candles() -> usize {
    DEFAULT_MAX_GAP_CANDLES
}
fn default_tolerance_factor() -> f64 {
    DEFAULT_TOLERANCE_FACTOR
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            gap_strategy: GapStrategy::default(),
            max_gap_candles: default_max_gap_candles(),
            tolerance_factor: default_tolerance_factor(),
            interval_ms: None,
        }
    }
}

impl PreprocessOptions {
    /// 갭 처리 전략 설정
    pub fn with_gap_strategy(mut self, strategy: GapStrategy) -> Self {
        self.gap_strategy = strategy;
        self
    }

    /// 최대 누락 캔들 수 설정
    pub fn with_max_gap_candles(mut self, max: usize) -> Self {
        self.max_gap_candles = max;
        self
    }

    /// 갭 판정 배수 설정
    pub fn with_tolerance_factor(mut self, factor: f64) -> Self {
        self.tolerance_factor = factor;
        self
    }

    /// 간격 강제 지정
    pub fn with_interval_ms(mut self, interval_ms: i64) -> Self {
        self.interval_ms = Some(interval_ms);
        self
    }

    fn effective_tolerance(&self) -> f64 {
        if self.tolerance_factor.is_finite() && self.tolerance_factor > 0.0 {
            self.tolerance_factor
        } else {
            DEFAULT_TOLERANCE_FACTOR
        }
    }
}

/// 인접한 두 캔들 사이의 누락 구간
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleGap {
    /// 갭 직전 캔들 인덱스
    pub before_index: usize,
    /// 갭 직후 캔들 인덱스
    pub after_index: usize,
    /// 갭 직전 타임스탬프
    pub before_timestamp: i64,
    /// 갭 직후 타임스탬프
    pub after_timestamp: i64,
    /// 누락 캔들 수 (`round(Δt / interval) - 1`)
    pub missing_count: usize,
    /// 갭 길이 (ms)
    pub gap_duration_ms: i64,
}

/// 데이터 분석 결과
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataAnalysis {
    /// 입력 캔들 수
    pub input_count: usize,
    /// 검증/중복 제거 후 캔들 수
    pub valid_count: usize,
    /// 유효성 검사 실패로 제거된 수
    pub invalid_removed: usize,
    /// 중복 타임스탬프로 제거된 수
    pub duplicates_removed: usize,
    /// 탐지된 간격 (ms)
    pub detected_interval_ms: i64,
    /// 탐지된 갭
    pub gaps: Vec<CandleGap>,
    /// 누락 캔들 합계
    pub total_missing: usize,
    /// 커버리지 (0 ~ 100)
    pub coverage_percent: f64,
    /// 첫 타임스탬프
    pub first_timestamp: Option<i64>,
    /// 마지막 타임스탬프
    pub last_timestamp: Option<i64>,
}

/// 전처리 결과
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessResult {
    /// 작업용 캔들 (split이면 가장 긴 구간)
    pub candles: Vec<Candle>,
    /// 연속 구간 목록 (길이 내림차순)
    pub segments: Vec<Vec<Candle>>,
    /// 분석 결과
    pub analysis: DataAnalysis,
    /// 경고 메시지
    pub warnings: Vec<String>,
}

// =============================================================================
// 전처리
// =============================================================================

/// 원시 캔들 전처리. 입력을 변경하지 않습니다.
pub fn preprocess(raw: &[Candle], options: &PreprocessOptions) -> PreprocessResult {
    let mut warnings = Vec::new();

    // 1. 안정 정렬
    let mut sorted = raw.to_vec();
    sorted.sort_by_key(|c| c.timestamp);

    // 2. 유효성 검사
    let before_validation = sorted.len();
    sorted.retain(is_valid_candle);
    let invalid_removed = before_validation - sorted.len();
    if invalid_removed > 0 {
        warnings.push(format!("유효하지 않은 캔들 {}개 제거", invalid_removed));
    }

    // 3. 중복 제거
    let (cleaned, duplicates_removed) = dedupe_keep_last(sorted);
    if duplicates_removed > 0 {
        warnings.push(format!("중복 타임스탬프 캔들 {}개 제거", duplicates_removed));
    }

    // 4. 간격 탐지
    let interval = options
        .interval_ms
        .filter(|ms| *ms > 0)
        .unwrap_or_else(|| detect_interval(&cleaned));

    // 5. 갭 탐지
    let gaps = detect_gaps(&cleaned, interval, options.effective_tolerance());
    let total_missing = gaps.iter().map(|g| g.missing_count).sum();
    let coverage_percent = calculate_coverage(&cleaned, interval);

    let analysis = DataAnalysis {
        input_count: raw.len(),
        valid_count: cleaned.len(),
        invalid_removed,
        duplicates_removed,
        detected_interval_ms: interval,
        total_missing,
        coverage_percent,
        first_timestamp: cleaned.first().map(|c| c.timestamp),
        last_timestamp: cleaned.last().map(|c| c.timestamp),
        gaps,
    };

    // 6. 갭 처리
    let (candles, segments) = match options.gap_strategy {
        GapStrategy::Skip => {
            for gap in &analysis.gaps {
                warnings.push(gap_warning(gap, "유지"));
            }
            let segments = single_segment(&cleaned);
            (cleaned, segments)
        }
        GapStrategy::Fill => {
            for gap in analysis
                .gaps
                .iter()
                .filter(|g| g.missing_count > options.max_gap_candles)
            {
                warnings.push(gap_warning(gap, "보간 한도 초과로 유지"));
            }
            let filled = fill_gaps(&cleaned, &analysis.gaps, interval, options.max_gap_candles);
            let segments = single_segment(&filled);
            (filled, segments)
        }
        GapStrategy::Split => {
            let segments = split_at_gaps(&cleaned, &analysis.gaps, options.max_gap_candles);
            if segments.len() > 1 {
                warnings.push(format!(
                    "데이터를 {}개 구간으로 분할, 가장 긴 구간({}개) 사용",
                    segments.len(),
                    segments[0].len()
                ));
            }
            let largest = segments.first().cloned().unwrap_or_default();
            (largest, segments)
        }
    };

    debug!(
        input = analysis.input_count,
        output = candles.len(),
        interval_ms = interval,
        gaps = analysis.gaps.len(),
        coverage = analysis.coverage_percent,
        strategy = %options.gap_strategy,
        "캔들 전처리 완료"
    );

    PreprocessResult {
        candles,
        segments,
        analysis,
        warnings,
    }
}

/// 캔들 유효성 검사 (도지 허용).
pub fn is_valid_candle(candle: &Candle) -> bool {
    candle.is_valid()
}

/// 정렬된 캔들에서 같은 타임스탬프가 연속되면 마지막 값만 남깁니다.
fn dedupe_keep_last(sorted: Vec<Candle>) -> (Vec<Candle>, usize) {
    let total = sorted.len();
    let mut result: Vec<Candle> = Vec::with_capacity(total);
    for candle in sorted {
        match result.last_mut() {
            Some(last) if last.timestamp == candle.timestamp => *last = candle,
            _ => result.push(candle),
        }
    }
    let removed = total - result.len();
    (result, removed)
}

/// 지배적 간격 탐지.
///
/// 양수인 인접 간격의 최빈값을 반환합니다. 빈도가 같으면 작은 간격을 택하고,
/// 양수 간격이 없으면 [`DEFAULT_INTERVAL_MS`]를 반환합니다.
pub fn detect_interval(candles: &[Candle]) -> i64 {
    let mut frequency: HashMap<i64, usize> = HashMap::new();
    for pair in candles.windows(2) {
        let delta = pair[1].timestamp - pair[0].timestamp;
        if delta > 0 {
            *frequency.entry(delta).or_insert(0) += 1;
        }
    }

    frequency
        .into_iter()
        .max_by(|(delta_a, count_a), (delta_b, count_b)| {
            count_a.cmp(count_b).then_with(|| delta_b.cmp(delta_a))
        })
        .map(|(delta, _)| delta)
        .unwrap_or(DEFAULT_INTERVAL_MS)
}

/// 갭 탐지: `delta > interval * tolerance_factor`인 인접 쌍.
pub fn detect_gaps(candles: &[Candle], interval_ms: i64, tolerance_factor: f64) -> Vec<CandleGap> {
    if interval_ms <= 0 {
        return Vec::new();
    }
    let threshold = interval_ms as f64 * tolerance_factor;

    candles
        .windows(2)
        .enumerate()
        .filter_map(|(i, pair)| {
            let delta = pair[1].timestamp - pair[0].timestamp;
            if (delta as f64) <= threshold {
                return None;
            }
            let slots = (delta as f64 / interval_ms as f64).round() as i64;
            Some(CandleGap {
                before_index: i,
                after_index: i + 1,
                before_timestamp: pair[0].timestamp,
                after_timestamp: pair[1].timestamp,
                missing_count: (slots - 1).max(0) as usize,
                gap_duration_ms: delta,
            })
        })
        .collect()
}

/// 갭을 선형 보간 캔들로 채웁니다.
///
/// `missing_count <= max_gap_candles`인 갭만 채우며, 합성 캔들은 거래량 0으로 표시됩니다.
/// 시가/종가는 갭 직전 종가에서 갭 직후 시가로 선형 이동하고,
/// 고가/저가는 몸통에 0.01% 스프레드를 더한 값입니다.
pub fn fill_gaps(
    candles: &[Candle],
    gaps: &[CandleGap],
    interval_ms: i64,
    max_gap_candles: usize,
) -> Vec<Candle> {
    let extra: usize = gaps
        .iter()
        .filter(|g| g.missing_count <= max_gap_candles)
        .map(|g| g.missing_count)
        .sum();
    let mut result = Vec::with_capacity(candles.len() + extra);
    let mut gap_iter = gaps.iter().peekable();

    for (i, candle) in candles.iter().enumerate() {
        result.push(*candle);

        while let Some(gap) = gap_iter.next_if(|g| g.before_index <= i) {
            if gap.before_index != i || gap.missing_count == 0 || gap.missing_count > max_gap_candles
            {
                continue;
            }
            let Some(next) = candles.get(gap.after_index) else {
                continue;
            };
            result.extend(interpolate(candle, next, gap.missing_count, interval_ms));
        }
    }

    result
}

/// 두 캔들 사이에 `missing`개의 합성 캔들 생성
fn interpolate(before: &Candle, after: &Candle, missing: usize, interval_ms: i64) -> Vec<Candle> {
    let start = before.close;
    let end = after.open;
    let steps = (missing + 1) as f64;

    (1..=missing)
        .map(|k| {
            let open = start + (end - start) * (k - 1) as f64 / steps;
            let close = start + (end - start) * k as f64 / steps;
            Candle {
                timestamp: before.timestamp + interval_ms * k as i64,
                open,
                high: open.max(close) * (1.0 + SYNTHETIC_SPREAD),
                low: open.min(close) * (1.0 - SYNTHETIC_SPREAD),
                close,
                volume: Some(0.0),
            }
        })
        .collect()
}

/// `missing_count > max_gap_candles`인 갭에서 데이터를 분할합니다.
///
/// 결과는 길이 내림차순(같으면 시간순)으로 정렬됩니다.
pub fn split_at_gaps(
    candles: &[Candle],
    gaps: &[CandleGap],
    max_gap_candles: usize,
) -> Vec<Vec<Candle>> {
    if candles.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut start = 0;
    for gap in gaps.iter().filter(|g| g.missing_count > max_gap_candles) {
        segments.push(candles[start..gap.after_index].to_vec());
        start = gap.after_index;
    }
    segments.push(candles[start..].to_vec());

    // 안정 정렬이므로 같은 길이는 시간순 유지
    segments.sort_by(|a, b| b.len().cmp(&a.len()));
    segments
}

/// 커버리지: `min(100, observed / expected * 100)`, `expected = round(span / interval) + 1`.
pub fn calculate_coverage(candles: &[Candle], interval_ms: i64) -> f64 {
    let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
        return 0.0;
    };
    if interval_ms <= 0 {
        return 100.0;
    }
    let span = (last.timestamp - first.timestamp).max(0) as f64;
    let expected = (span / interval_ms as f64).round() + 1.0;
    (candles.len() as f64 / expected * 100.0).min(100.0)
}

fn single_segment(candles: &[Candle]) -> Vec<Vec<Candle>> {
    if candles.is_empty() {
        Vec::new()
    } else {
        vec![candles.to_vec()]
    }
}

fn gap_warning(gap: &CandleGap, action: &str) -> String {
    format!(
        "갭 발견 ({}): {} → {}, 누락 {}개",
        action, gap.before_timestamp, gap.after_timestamp, gap.missing_count
    )
}
