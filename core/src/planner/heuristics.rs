// Multi-step intent, matched on the lowercased message.
const PLAN_KEYWORDS: &[&str] = &[
    "analyze",
    "compare",
    "generate",
    "create",
    "build",
    "research",
    "investigate",
    "multiple",
    "steps",
    "first",
    "then",
    "finally",
    "process",
];

const PLAN_KEYWORDS_ZH: &[&str] = &[
    "研究", "分析", "生成", "创建", "设计", "实现", "开发", "调查", "比较", "评估", "制作", "编写",
    "构建", "深度", "报告", "方案", "计划", "策略", "优化", "改进", "财报", "文档", "系统",
];

const SIMPLE_PREFIXES: &[&str] = &[
    "what is", "who is", "when", "where", "define", "tell me", "show me", "list",
];

/// Cheap gate in front of decomposition.
///
/// Keywords or a message longer than `long_message_chars` force a plan, a
/// simple-query prefix skips it, and anything else plans.
pub fn needs_plan(message: &str, long_message_chars: usize) -> bool {
    let lowered = message.trim().to_lowercase();

    if PLAN_KEYWORDS.iter().any(|k| lowered.contains(k))
        || PLAN_KEYWORDS_ZH.iter().any(|k| lowered.contains(k))
    {
        return true;
    }

    if lowered.chars().count() > long_message_chars {
        return true;
    }

    if SIMPLE_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_force_planning() {
        assert!(needs_plan("Analyze the sales data and generate a report", 100));
        assert!(needs_plan("What is the best way to build a cache", 100));
        assert!(needs_plan("请帮我写一份财报", 100));
    }

    #[test]
    fn simple_queries_skip_planning() {
        assert!(!needs_plan("What is Rust?", 100));
        assert!(!needs_plan("  define entropy", 100));
        assert!(!needs_plan("List the planets", 100));
    }

    #[test]
    fn long_simple_query_still_plans() {
        let long = format!("tell me {}", "about the weather ".repeat(10));
        assert!(needs_plan(&long, 100));
        assert!(!needs_plan(&long, 1000));
    }

    #[test]
    fn defaults_to_planning() {
        assert!(needs_plan("Summarize this quarter", 100));
    }
}
