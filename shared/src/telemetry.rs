//! 现场节点上报的遥测行格式解析：
//!
//! ```text
//! [<node-id>] - <timestamp> <metric>:<value>C|<metric>:<value>%|...
//! ```
//!
//! 解析不会 panic，结果为 [`SensorReading`] 或说明丢弃原因的 [`ParseError`]

use crate::types::{FieldValue, SensorReading};

const BODY_SEPARATOR: &str = "] - ";
const UNIT_CHARS: [char; 3] = ['C', '%', 'V'];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("node id brackets missing or empty")]
    MissingNode,

    #[error("body separator \"] - \" not found")]
    MissingSeparator,
}

pub fn parse_sensor_message(raw: &str) -> Result<SensorReading, ParseError> {
    let node = extract_node(raw)?;

    let body = raw
        .split(BODY_SEPARATOR)
        .nth(1)
        .ok_or(ParseError::MissingSeparator)?
        .trim_start();

    let (timestamp, rest) = match body.split_whitespace().next() {
        Some(token) => (Some(token.to_string()), &body[token.len()..]),
        None => (None, ""),
    };

    let mut reading = SensorReading::new(node, timestamp);

    for segment in rest.trim().split('|') {
        let Some((key, value)) = segment.split_once(':') else {
            continue;
        };
        reading
            .fields
            .insert(key.to_lowercase(), coerce_value(value));
    }

    Ok(reading)
}

fn extract_node(raw: &str) -> Result<&str, ParseError> {
    let open = raw.find('[').ok_or(ParseError::MissingNode)?;
    let close = raw.find(']').ok_or(ParseError::MissingNode)?;

    if close <= open + 1 {
        return Err(ParseError::MissingNode);
    }

    Ok(&raw[open + 1..close])
}

/// 去除值中的单位字符；含 `.` 时按浮点数解析，否则按整数解析，失败则保留文本
pub fn coerce_value(raw: &str) -> FieldValue {
    let cleaned: String = raw.chars().filter(|c| !UNIT_CHARS.contains(c)).collect();
    let cleaned = cleaned.trim();

    let number = if cleaned.contains('.') {
        cleaned.parse::<f64>().ok().map(FieldValue::Float)
    } else {
        cleaned.parse::<i64>().ok().map(FieldValue::Int)
    };

    number.unwrap_or_else(|| FieldValue::Text(cleaned.to_string()))
}
