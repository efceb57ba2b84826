use async_trait::async_trait;
use serde_json::{json, Value};
use taskweave_core::api::{Capability, CapabilityArgs, CapabilityError};
use tokio_util::sync::CancellationToken;

/// Arithmetic, descriptive statistics and a few unit conversions.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalculatorCapability;

impl CalculatorCapability {
    pub fn new() -> Self {
        Self
    }
}

fn exec_err(msg: impl Into<String>) -> CapabilityError {
    CapabilityError::Execution(msg.into())
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text<'a>(args: &'a CapabilityArgs, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).map(str::trim)
}

fn basic(operator: &str, a: f64, b: Option<f64>) -> Result<Value, CapabilityError> {
    let need_b = || b.ok_or_else(|| exec_err(format!("operand 'b' is required for operator {operator}")));

    let (operation, result) = match operator {
        "+" | "add" => {
            let b = need_b()?;
            (format!("{a} + {b}"), a + b)
        }
        "-" | "subtract" => {
            let b = need_b()?;
            (format!("{a} - {b}"), a - b)
        }
        "*" | "multiply" => {
            let b = need_b()?;
            (format!("{a} × {b}"), a * b)
        }
        "/" | "divide" => {
            let b = need_b()?;
            if b == 0.0 {
                return Err(exec_err("division by zero"));
            }
            (format!("{a} ÷ {b}"), a / b)
        }
        "^" | "power" => {
            let b = need_b()?;
            (format!("{a} ^ {b}"), a.powf(b))
        }
        "sqrt" => {
            if a < 0.0 {
                return Err(exec_err("cannot calculate square root of negative number"));
            }
            (format!("√{a}"), a.sqrt())
        }
        "abs" => (format!("|{a}|"), a.abs()),
        other => return Err(exec_err(format!("unsupported operator: {other}"))),
    };

    Ok(json!({
        "operation": operation,
        "result": result,
        "formatted": format!("{operation} = {result}"),
    }))
}

fn values(args: &CapabilityArgs) -> Result<Vec<f64>, CapabilityError> {
    let data: Vec<f64> = match args.get("values").or_else(|| args.get("data")) {
        Some(Value::Array(items)) => items.iter().filter_map(|v| number(Some(v))).collect(),
        Some(Value::String(s)) => s
            .split(',')
            .filter_map(|part| part.trim().parse().ok())
            .collect(),
        Some(v @ Value::Number(_)) => number(Some(v)).into_iter().collect(),
        _ => return Err(exec_err("values parameter is required")),
    };
    if data.is_empty() {
        return Err(exec_err("values cannot be empty"));
    }
    Ok(data)
}

fn statistics(function: &str, data: &[f64]) -> Result<Value, CapabilityError> {
    let n = data.len() as f64;
    let sum: f64 = data.iter().sum();
    let mean = sum / n;
    let variance = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let result = match function {
        "mean" | "average" => json!(mean),
        "sum" => json!(sum),
        "min" => json!(data.iter().copied().fold(f64::INFINITY, f64::min)),
        "max" => json!(data.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        "count" => json!(data.len()),
        "variance" => json!(variance),
        "stddev" => json!(variance.sqrt()),
        other => return Err(exec_err(format!("unsupported statistical function: {other}"))),
    };

    Ok(json!({
        "function": function,
        "data": data,
        "result": result,
        "count": data.len(),
    }))
}

fn conversion(value: f64, from: &str, to: &str) -> Result<Value, CapabilityError> {
    let result = match (from, to) {
        ("celsius", "fahrenheit") => value * 9.0 / 5.0 + 32.0,
        ("fahrenheit", "celsius") => (value - 32.0) * 5.0 / 9.0,
        ("km", "m") | ("kg", "g") => value * 1000.0,
        ("m", "km") | ("g", "kg") => value * 0.001,
        ("lb", "kg") => value * 0.453592,
        ("kg", "lb") => value * 2.20462,
        _ => return Err(exec_err(format!("conversion from {from} to {to} not supported"))),
    };
    Ok(json!({
        "value": value,
        "from": from,
        "to": to,
        "result": result,
        "formatted": format!("{value} {from} = {result} {to}"),
    }))
}

// Single number, or one binary operation `a <op> b`.
fn expression(expr: &str) -> Result<Value, CapabilityError> {
    let expr = expr.trim();
    if let Ok(v) = expr.parse::<f64>() {
        return Ok(json!({ "expression": expr, "result": v }));
    }
    for op in ['+', '-', '*', '/', '^'] {
        // Skip a leading sign so "-3 + 4" splits on '+'.
        let Some((pos, _)) = expr.char_indices().skip(1).find(|(_, c)| *c == op) else {
            continue;
        };
        let (lhs, rhs) = (expr[..pos].trim(), expr[pos + 1..].trim());
        if let (Ok(a), Ok(b)) = (lhs.parse::<f64>(), rhs.parse::<f64>()) {
            return basic(&op.to_string(), a, Some(b));
        }
    }
    Err(exec_err(format!("unable to evaluate expression: {expr}")))
}

#[async_trait]
impl Capability for CalculatorCapability {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform mathematical calculations and statistical operations"
    }

    fn validate(&self, args: &CapabilityArgs) -> Result<(), CapabilityError> {
        if !args.contains_key("operation") && !args.contains_key("expression") {
            return Err(CapabilityError::InvalidArgs(
                "either operation or expression parameter is required".to_string(),
            ));
        }
        Ok(())
    }

    async fn invoke(
        &self,
        _cancel: CancellationToken,
        args: CapabilityArgs,
    ) -> Result<Value, CapabilityError> {
        let Some(operation) = text(&args, "operation") else {
            let expr = text(&args, "expression")
                .ok_or_else(|| exec_err("operation or expression parameter is required"))?;
            return expression(expr);
        };

        match operation {
            "basic" => {
                let operator =
                    text(&args, "operator").ok_or_else(|| exec_err("operator parameter is required"))?;
                let a = number(args.get("a")).ok_or_else(|| exec_err("operand 'a' is required"))?;
                basic(operator, a, number(args.get("b")))
            }
            "statistics" => {
                let function =
                    text(&args, "function").ok_or_else(|| exec_err("function parameter is required"))?;
                statistics(function, &values(&args)?)
            }
            "conversion" => {
                let value =
                    number(args.get("value")).ok_or_else(|| exec_err("value parameter is required"))?;
                let from = text(&args, "from").ok_or_else(|| exec_err("from unit parameter is required"))?;
                let to = text(&args, "to").ok_or_else(|| exec_err("to unit parameter is required"))?;
                conversion(value, from, to)
            }
            other => Err(exec_err(format!("unsupported operation: {other}"))),
        }
    }
}
