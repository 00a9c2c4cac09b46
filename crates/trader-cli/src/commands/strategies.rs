//! 전략 목록 명령어.

use anyhow::Result;
use trader_core::format_params;
use trader_strategy::{BuiltinStrategy, StrategyRegistry};

use super::render;

/// 등록된 전략 목록 텍스트
pub fn strategies_table(registry: &StrategyRegistry) -> String {
    let mut lines = vec![
        String::new(),
        "📋 사용 가능한 전략 목록:".to_string(),
        "═══════════════════════════════════════════════════════════════".to_string(),
        String::new(),
        format!("  {:<18} | {:<8} | 설명", "전략 ID", "별칭"),
        "  ─────────────────────────────────────────────────────────────".to_string(),
    ];
    for meta in registry.metadata() {
        let alias = BuiltinStrategy::ALL
            .iter()
            .find(|b| b.id() == meta.id)
            .map(|b| b.alias())
            .unwrap_or("-");
        lines.push(format!("  {:<18} | {:<8} | {}", meta.id, alias, meta.description));
        lines.push(format!("  {:<18} | {:<8} |   기본값: {}", "", "", format_params(&meta.default_params)));
    }
    lines.push(String::new());
    lines.push("═══════════════════════════════════════════════════════════════".to_string());
    lines.join("\n")
}

/// 전략 목록 출력
pub fn run_strategies(json: bool) -> Result<()> {
    let registry = StrategyRegistry::with_builtins();
    let text = render(&registry.metadata(), json, || strategies_table(&registry))?;
    println!("{}", text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lists_every_builtin() {
        let registry = StrategyRegistry::with_builtins();
        let table = strategies_table(&registry);
        for builtin in BuiltinStrategy::ALL {
            assert!(table.contains(builtin.id()), "{} 누락", builtin.id());
        }
        assert!(table.contains("period=14"));
    }
}
