use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

// 默认阈值
pub const DEFAULT_TEMP_THRESHOLD: f64 = 30.0;
pub const DEFAULT_GAS_THRESHOLD: f64 = 1.2;

// 传感器字段值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    /// 去除单位后仍无法转换为数字的原始值
    Text(String),
}

/// 解析后的单条遥测消息，创建后不再修改
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub node: String,
    /// 设备上报的时间字符串，原样保留
    pub timestamp: Option<String>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl SensorReading {
    pub fn new(node: impl Into<String>, timestamp: Option<String>) -> Self {
        Self {
            node: node.into(),
            timestamp,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

// 阈值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    Temperature,
    Gas,
}

// 节点阈值配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub temp_th: f64,
    pub gas_th: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temp_th: DEFAULT_TEMP_THRESHOLD,
            gas_th: DEFAULT_GAS_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn set(&mut self, kind: ThresholdKind, value: f64) {
        match kind {
            ThresholdKind::Temperature => self.temp_th = value,
            ThresholdKind::Gas => self.gas_th = value,
        }
    }
}

/// 合并了节点阈值的最新读数，序列化为 `/realtime` 返回的扁平对象
#[derive(Debug, Clone, PartialEq)]
pub struct LatestRecord {
    pub reading: SensorReading,
    pub thresholds: Thresholds,
}

impl LatestRecord {
    pub fn merge(reading: SensorReading, thresholds: Thresholds) -> Self {
        Self { reading, thresholds }
    }
}

const THRESHOLD_KEYS: [&str; 2] = ["temp_th", "gas_th"];

impl Serialize for LatestRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let fields = &self.reading.fields;
        let mut map = serializer.serialize_map(None)?;

        // 字段覆盖 node/time，阈值覆盖所有同名字段
        if !fields.contains_key("node") {
            map.serialize_entry("node", &self.reading.node)?;
        }
        if let Some(time) = &self.reading.timestamp {
            if !fields.contains_key("time") {
                map.serialize_entry("time", time)?;
            }
        }
        for (key, value) in fields {
            if THRESHOLD_KEYS.contains(&key.as_str()) {
                continue;
            }
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry("temp_th", &self.thresholds.temp_th)?;
        map.serialize_entry("gas_th", &self.thresholds.gas_th)?;
        map.end()
    }
}

// HTTP 请求/响应类型
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    pub device: String,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandResponse {
    pub status: String,
    pub sent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitUpdateRequest {
    pub device: String,
    pub temp_th: Option<f64>,
    pub gas_th: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitsResponse {
    pub status: String,
    pub limits: Thresholds,
}

/// 统一响应：`{"status": "ok"}` 或 `{"status": "error", "msg": ...}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusReply {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl StatusReply {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            msg: None,
        }
    }

    pub fn error() -> Self {
        Self {
            status: "error".to_string(),
            msg: None,
        }
    }

    pub fn error_msg(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            msg: Some(msg.into()),
        }
    }
}

// 用户相关类型
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub username: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserLogin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    pub username: String,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDelete {
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading() -> SensorReading {
        let mut reading = SensorReading::new("N1", Some("12:00".to_string()));
        reading.fields.insert("temp".to_string(), FieldValue::Float(22.5));
        reading.fields.insert("hum".to_string(), FieldValue::Int(55));
        reading
    }

    #[test]
    fn test_latest_record_flattens_reading_and_thresholds() {
        let record = LatestRecord::merge(reading(), Thresholds::default());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(
            value,
            json!({
                "node": "N1",
                "time": "12:00",
                "temp": 22.5,
                "hum": 55,
                "temp_th": 30.0,
                "gas_th": 1.2
            })
        );
    }

    #[test]
    fn test_thresholds_shadow_reading_fields() {
        let mut reading = reading();
        reading.fields.insert("temp_th".to_string(), FieldValue::Int(99));
        reading.fields.insert("node".to_string(), FieldValue::Text("spoofed".to_string()));

        let thresholds = Thresholds { temp_th: 31.0, gas_th: 1.5 };
        let value = serde_json::to_value(LatestRecord::merge(reading, thresholds)).unwrap();

        assert_eq!(value["temp_th"], json!(31.0));
        assert_eq!(value["gas_th"], json!(1.5));
        assert_eq!(value["node"], json!("spoofed"));
    }

    #[test]
    fn test_missing_timestamp_is_omitted() {
        let record = LatestRecord::merge(SensorReading::new("N3", None), Thresholds::default());
        let value = serde_json::to_value(&record).unwrap();

        assert!(value.get("time").is_none());
        assert_eq!(value["node"], json!("N3"));
    }

    #[test]
    fn test_status_reply_skips_empty_msg() {
        assert_eq!(serde_json::to_value(StatusReply::error()).unwrap(), json!({"status": "error"}));
        assert_eq!(
            serde_json::to_value(StatusReply::error_msg("User exists")).unwrap(),
            json!({"status": "error", "msg": "User exists"})
        );
    }
}
