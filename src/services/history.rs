//! 分析历史存储 - 业务能力层
//!
//! JSON 文件持久化，只保留最近 10 条，旧记录先淘汰。
//! 文件内容无法解析视为硬错误：悄悄丢历史等于掩盖数据丢失

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::Value;
use tracing::debug;

use crate::error::HistoryError;
use crate::models::history::HistoryEntry;

/// 历史记录上限
const HISTORY_LIMIT: usize = 10;

/// 历史存储服务
pub struct HistoryStore {
    path: PathBuf,
    // 写是读-改-写，需要串行化；锁不跨 await 持有
    lock: Mutex<()>,
}

impl HistoryStore {
    /// 创建新的历史存储
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// 追加一条历史记录
    ///
    /// # 参数
    /// - `kind`: 记录类型（text / image / ocr_image / ocr_pdf / parse_demo）
    /// - `input`: 输入摘要
    /// - `output`: 分析产出
    pub fn save(&self, kind: &str, input: Value, output: Value) -> Result<(), HistoryError> {
        let _guard = self.lock.lock().expect("history lock");

        let mut items = self.read_items()?;
        items.push(HistoryEntry {
            timestamp: chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S%.6fZ")
                .to_string(),
            kind: kind.to_string(),
            input,
            output,
        });
        if items.len() > HISTORY_LIMIT {
            let overflow = items.len() - HISTORY_LIMIT;
            items.drain(..overflow);
        }

        let content = serde_json::to_string_pretty(&items)
            .map_err(|e| HistoryError::write_failed(self.path_str(), e))?;
        fs::write(&self.path, content)
            .map_err(|e| HistoryError::write_failed(self.path_str(), e))?;

        debug!("历史记录已保存，类型: {}，当前 {} 条", kind, items.len());
        Ok(())
    }

    /// 读取全部历史记录
    pub fn entries(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let _guard = self.lock.lock().expect("history lock");
        self.read_items()
    }

    fn read_items(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| HistoryError::read_failed(self.path_str(), e))?;

        let value: Value = serde_json::from_str(&content).map_err(|_| HistoryError::Corrupted {
            path: self.path_str(),
        })?;

        match value {
            Value::Array(_) => {
                serde_json::from_value(value).map_err(|_| HistoryError::Corrupted {
                    path: self.path_str(),
                })
            }
            // 合法 JSON 但不是列表：当作空历史处理
            _ => Ok(Vec::new()),
        }
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        (dir, store)
    }

    #[test]
    fn test_save_and_read_roundtrip() {
        let (_dir, store) = temp_store();

        store
            .save("text", json!({"text": "пример"}), json!({"strengths": []}))
            .unwrap();

        let items = store.entries().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, "text");
        assert!(items[0].timestamp.ends_with('Z'));
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let (_dir, store) = temp_store();

        for i in 0..12 {
            store
                .save("text", json!({"n": i}), json!({}))
                .unwrap();
        }

        let items = store.entries().unwrap();
        assert_eq!(items.len(), 10);
        // 最旧的 0 和 1 被淘汰
        assert_eq!(items[0].input["n"], 2);
        assert_eq!(items[9].input["n"], 11);
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let (_dir, store) = temp_store();
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn test_corrupted_file_is_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{не json").unwrap();

        let store = HistoryStore::new(&path);
        let err = store.entries().unwrap_err();
        assert!(matches!(err, HistoryError::Corrupted { .. }));
    }

    #[test]
    fn test_non_list_json_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, r#"{"items": []}"#).unwrap();

        let store = HistoryStore::new(&path);
        assert!(store.entries().unwrap().is_empty());
    }
}
