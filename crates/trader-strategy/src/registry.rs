//! 전략 레지스트리.
//!
//! 전역 싱글톤 대신 명시적으로 생성해 참조로 전달하는 ID → 전략 맵입니다.
//! 등록 순서를 보존하며, 시뮬레이션 중에는 읽기 전용으로만 사용됩니다.

use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::strategies::BuiltinStrategy;
use crate::traits::{Strategy, StrategyMetadata};

/// 등록된 전략 목록.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn Strategy>>,
    index: HashMap<String, usize>,
}

impl StrategyRegistry {
    /// 빈 레지스트리 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 내장 전략이 모두 등록된 레지스트리.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for builtin in BuiltinStrategy::ALL {
            registry.register(builtin.create());
        }
        registry
    }

    /// 전략 등록.
    ///
    /// 같은 ID가 이미 있으면 등록 순서를 유지한 채 교체합니다.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        let id = strategy.id().to_string();
        match self.index.get(&id) {
            Some(&slot) => {
                debug!(strategy_id = %id, "전략 교체 등록");
                self.strategies[slot] = strategy;
            }
            None => {
                debug!(strategy_id = %id, "전략 등록");
                self.index.insert(id, self.strategies.len());
                self.strategies.push(strategy);
            }
        }
    }

    /// ID로 전략 조회
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Strategy>> {
        self.index.get(id).map(|&slot| &self.strategies[slot])
    }

    /// 등록 여부
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// 등록 순서대로 전체 전략
    pub fn strategies(&self) -> &[Arc<dyn Strategy>] {
        &self.strategies
    }

    /// 등록 순서대로 전략 ID 목록
    pub fn ids(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    /// 등록 순서대로 메타데이터 목록
    pub fn metadata(&self) -> Vec<StrategyMetadata> {
        self.strategies
            .iter()
            .map(|s| StrategyMetadata::of(s.as_ref()))
            .collect()
    }

    /// 등록된 전략 수
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trader_core::{Candle, ParamMap, StrategySignal};

    struct Fixed {
        id: &'static str,
        name: &'static str,
    }

    impl Strategy for Fixed {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.name
        }

        fn default_params(&self) -> ParamMap {
            ParamMap::new()
        }

        fn generate_signal(&self, _candles: &[Candle], _params: &ParamMap) -> Option<StrategySignal> {
            Some(StrategySignal::none())
        }
    }

    #[test]
    fn test_registration_order_preserved() {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(Fixed { id: "b", name: "B" }));
        registry.register(Arc::new(Fixed { id: "a", name: "A" }));
        registry.register(Arc::new(Fixed { id: "c", name: "C" }));

        assert_eq!(registry.ids(), vec!["b", "a", "c"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_reregister_replaces_in_place() {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(Fixed { id: "a", name: "first" }));
        registry.register(Arc::new(Fixed { id: "b", name: "B" }));
        registry.register(Arc::new(Fixed { id: "a", name: "second" }));

        assert_eq!(registry.ids(), vec!["a", "b"]);
        assert_eq!(registry.get("a").map(|s| s.name()), Some("second"));
    }

    #[test]
    fn test_builtins_registered() {
        let registry = StrategyRegistry::with_builtins();
        assert_eq!(registry.len(), BuiltinStrategy::ALL.len());
        for builtin in BuiltinStrategy::ALL {
            assert!(registry.contains(builtin.id()));
        }
    }
}
