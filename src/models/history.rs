use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 一条历史记录
///
/// 磁盘格式中的类型字段叫 `type`，与既有 history.json 保持兼容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub input: Value,
    pub output: Value,
}
