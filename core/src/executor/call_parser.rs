//! Grammar for the `process` field of function-call and delegate-call tasks.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Number, Value};

use crate::capability::CapabilityArgs;

pub const DEFAULT_PERSONA: &str = "ResearchAgent";

static FUNCTION_TAG: OnceLock<Regex> = OnceLock::new();
static AGENT_TAG: OnceLock<Regex> = OnceLock::new();

fn function_tag() -> &'static Regex {
    FUNCTION_TAG.get_or_init(|| {
        Regex::new(r"(?is)<function_call>(.*?)</function_call>").expect("FUNCTION_TAG is valid")
    })
}

fn agent_tag() -> &'static Regex {
    AGENT_TAG.get_or_init(|| {
        Regex::new(r"(?is)<agent_call>(.*?)</agent_call>").expect("AGENT_TAG is valid")
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: CapabilityArgs,
}

/// Parse `name(k1=v1, k2="v 2")` from a `<function_call>` tag, a `function:`
/// prefix, or the bare process text.
///
/// Integers, then floats, are coerced; anything else is a string with
/// surrounding quotes removed. Pairs without `=` are ignored.
pub fn parse_function_call(process: &str) -> Option<FunctionCall> {
    let call = match function_tag().captures(process) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or_default(),
        None => strip_prefix_ci(process.trim(), "function:").unwrap_or(process),
    }
    .trim();

    let (name, args_src) = match call.find('(') {
        Some(open) => {
            let inner = &call[open + 1..];
            let inner = inner.trim_end();
            let inner = inner.strip_suffix(')').unwrap_or(inner);
            (call[..open].trim(), inner)
        }
        None => (call, ""),
    };
    if name.is_empty() {
        return None;
    }

    let mut args = CapabilityArgs::new();
    for pair in split_args(args_src) {
        if let Some((key, value)) = pair.split_once('=') {
            let key = key.trim();
            if !key.is_empty() {
                args.insert(key.to_string(), coerce(value.trim()));
            }
        }
    }

    Some(FunctionCall {
        name: name.to_string(),
        args,
    })
}

/// Persona and instruction of a delegate call.
///
/// Reads `<agent_call>Agent: instruction</agent_call>` or `agent: Agent: instruction`.
/// A lone word names the persona and the description becomes the instruction;
/// with nothing usable the default persona gets the description.
pub fn parse_delegate_call(process: &str, description: &str) -> (String, String) {
    let inner = match agent_tag().captures(process) {
        Some(caps) => caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default(),
        None => {
            let lowered = process.to_ascii_lowercase();
            match lowered.find("agent:") {
                Some(pos) => process[pos + "agent:".len()..].trim(),
                None => "",
            }
        }
    };

    if let Some((agent, instruction)) = inner.split_once(':') {
        let agent = agent.trim();
        let instruction = instruction.trim();
        if !agent.is_empty() && !agent.contains('\n') {
            let instruction = if instruction.is_empty() {
                description
            } else {
                instruction
            };
            return (agent.to_string(), instruction.to_string());
        }
    }

    if !inner.is_empty() && !inner.contains(char::is_whitespace) {
        return (inner.to_string(), description.to_string());
    }
    if !inner.is_empty() {
        return (DEFAULT_PERSONA.to_string(), inner.to_string());
    }
    (DEFAULT_PERSONA.to_string(), description.to_string())
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

// Comma split that leaves quoted commas alone.
fn split_args(src: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in src.char_indices() {
        match (quote, c) {
            (None, '"') | (None, '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, ',') => {
                parts.push(&src[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&src[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

fn coerce(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(raw.trim_matches(|c| c == '"' || c == '\'').to_string())
}
