use anyhow::{bail, Context};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Renders a decimal without exponent or trailing fractional zeros.
pub fn plain_decimal(value: &BigDecimal) -> String {
    let rendered = value.to_string();
    if rendered.contains('.') {
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        rendered
    }
}

fn threshold_value(key: &str, value: &Value) -> anyhow::Result<BigDecimal> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => bail!("threshold {} is not numeric: {}", key, other),
    };
    BigDecimal::from_str(&raw).with_context(|| format!("threshold {} is not numeric: {}", key, raw))
}

/// Converts every threshold from token base units to whole tokens by
/// dividing by `10^decimals`.
pub fn rescale_threshold(
    threshold: &Map<String, Value>,
    decimals: u32,
) -> anyhow::Result<Map<String, Value>> {
    let divisor = BigDecimal::new(BigInt::from(1), -i64::from(decimals));
    threshold
        .iter()
        .map(|(key, value)| {
            let units = threshold_value(key, value)?;
            let scaled = if decimals == 0 {
                units
            } else {
                units / divisor.clone()
            };
            Ok((key.clone(), Value::String(plain_decimal(&scaled))))
        })
        .collect()
}
