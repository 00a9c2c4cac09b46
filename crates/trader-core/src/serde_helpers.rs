//! 직렬화 보조 함수.
//!
//! JSON은 `inf`/`NaN`을 표현할 수 없어 serde_json이 `null`로 기록하고, 이를 다시 읽으면
//! `f64` 역직렬화가 실패합니다. 손실 없는 무패 전략의 프로핏 팩터처럼 무한대가 정상 값인
//! 필드에는 [`float`] 모듈을 사용합니다.

/// 비유한 값을 문자열로 기록하는 `f64` 직렬화.
///
/// - 유한 값 → 숫자
/// - `+∞` → `"inf"`, `-∞` → `"-inf"`, NaN → `"nan"`
///
/// 읽을 때는 숫자, 위 문자열, `null`(NaN으로 해석)을 모두 받습니다.
///
/// # 사용 예시
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Report {
///     #[serde(with = "trader_core::serde_helpers::float")]
///     profit_factor: f64,
/// }
/// ```
pub mod float {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("nan")
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(f64::NAN),
            Some(Repr::Number(value)) => Ok(value),
            Some(Repr::Text(text)) => text.trim().parse::<f64>().map_err(|_| {
                de::Error::custom(format!(
                    "invalid float value: '{}'. Expected a number, inf, -inf or nan",
                    text
                ))
            }),
        }
    }
}
