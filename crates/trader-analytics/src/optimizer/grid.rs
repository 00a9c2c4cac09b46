//! 그리드 탐색.

use rayon::prelude::*;
use tracing::warn;
use trader_core::{ParamMap, ParamRanges};

use super::{Trial, TrialRunner};
use crate::progress::{ProgressStage, RunControl};

/// 그리드 탐색 최대 조합 수
pub const MAX_GRID_COMBINATIONS: usize = 1_000_000;

/// 범위의 데카르트 곱 (max 포함).
///
/// 범위가 비어 있으면 빈 조합 하나를 반환합니다 (기본 파라미터로 1회 실행).
/// 순서는 파라미터 이름 순으로 앞쪽이 바깥 루프입니다.
pub fn combinations(ranges: &ParamRanges) -> Vec<ParamMap> {
    ranges.iter().fold(vec![ParamMap::new()], |acc, (name, range)| {
        let values = range.values();
        acc.iter()
            .flat_map(|prefix| {
                values.iter().map(move |value| {
                    let mut params = prefix.clone();
                    params.insert(name.clone(), *value);
                    params
                })
            })
            .collect()
    })
}

/// 조합 개수 (열거하지 않음). `usize`를 넘으면 `None`.
pub fn combination_count(ranges: &ParamRanges) -> Option<usize> {
    ranges
        .values()
        .try_fold(1usize, |count, range| count.checked_mul(range.len()))
}

/// 조합 수가 [`MAX_GRID_COMBINATIONS`] 이하인지 여부
pub fn is_within_limit(ranges: &ParamRanges) -> bool {
    combination_count(ranges).is_some_and(|count| count <= MAX_GRID_COMBINATIONS)
}

pub(crate) fn search(runner: &TrialRunner<'_>, ranges: &ParamRanges, control: &RunControl) -> Vec<Trial> {
    if !is_within_limit(ranges) {
        warn!(
            combinations = ?combination_count(ranges),
            limit = MAX_GRID_COMBINATIONS,
            "그리드 조합 수가 한도를 초과하여 탐색하지 않음"
        );
        return Vec::new();
    }

    let combos = combinations(ranges);
    let tracker = control.tracker(ProgressStage::Grid, combos.len());

    // collect는 입력 순서를 보존하므로 결과 순서가 결정적
    combos
        .par_iter()
        .map(|params| {
            let trial = runner.run_trial(params, None, None, control);
            tracker.tick();
            trial
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trader_core::ParamRange;

    #[test]
    fn test_nine_combinations() {
        let ranges = ParamRanges::from([
            ("period".to_string(), ParamRange::new(10.0, 20.0, 5.0)),
            ("oversold".to_string(), ParamRange::new(25.0, 35.0, 5.0)),
        ]);
        let combos = combinations(&ranges);

        assert_eq!(combos.len(), 9);
        assert_eq!(combination_count(&ranges), Some(9));
        // "oversold" < "period" 이므로 oversold가 바깥 루프
        assert_eq!(combos[0]["oversold"], 25.0);
        assert_eq!(combos[0]["period"], 10.0);
        assert_eq!(combos[1]["period"], 15.0);
        assert_eq!(combos[8]["oversold"], 35.0);
        assert_eq!(combos[8]["period"], 20.0);
    }

    #[test]
    fn test_empty_ranges_single_combination() {
        let combos = combinations(&ParamRanges::new());
        assert_eq!(combos, vec![ParamMap::new()]);
        assert_eq!(combination_count(&ParamRanges::new()), Some(1));
    }

    #[test]
    fn test_fractional_steps() {
        let ranges = ParamRanges::from([("std_dev".to_string(), ParamRange::new(1.5, 3.0, 0.5))]);
        let values: Vec<f64> = combinations(&ranges).iter().map(|p| p["std_dev"]).collect();
        assert_eq!(values, vec![1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn test_oversized_grid_detected_without_enumerating() {
        let huge = ParamRange::new(0.0, 1e300, 1e-300);
        assert_eq!(huge.len(), usize::MAX);

        let ranges = ParamRanges::from([
            ("a".to_string(), huge),
            ("b".to_string(), ParamRange::new(1.0, 3.0, 1.0)),
        ]);
        assert_eq!(combination_count(&ranges), None);
        assert!(!is_within_limit(&ranges));

        let wide = ParamRanges::from([
            ("a".to_string(), ParamRange::new(0.0, 2_000.0, 1.0)),
            ("b".to_string(), ParamRange::new(0.0, 999.0, 1.0)),
        ]);
        assert_eq!(combination_count(&wide), Some(2_001_000));
        assert!(!is_within_limit(&wide));
        assert!(is_within_limit(&ParamRanges::new()));
    }
}
