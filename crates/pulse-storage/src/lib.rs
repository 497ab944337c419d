//! 键值对象存储契约
//!
//! 核心只依赖这里的读/写/追加接口，文件路径与序列化格式等
//! 基础设施问题由具体后端处理。

use async_trait::async_trait;
use pulse_core::{PulseError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 键值存储 trait
#[async_trait]
pub trait KvStore: Send + Sync {
    /// 读取键值
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// 写入键值
    async fn put(&self, key: &str, value: Value) -> Result<()>;

    /// 向列表键追加一项，超出 max_len 时裁剪最旧的条目
    async fn append_to_list(&self, key: &str, value: Value, max_len: usize) -> Result<()>;
}

/// 内存存储实现
#[derive(Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前键数量
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn append_to_list(&self, key: &str, value: Value, max_len: usize) -> Result<()> {
        let mut entries = self.entries.write().await;
        let slot = entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));

        let list = slot
            .as_array_mut()
            .ok_or_else(|| PulseError::Persistence(format!("Key {} is not a list", key)))?;

        list.push(value);

        if list.len() > max_len {
            let excess = list.len() - max_len;
            list.drain(0..excess);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_get() {
        let store = MemoryStore::new();

        store.put("config", json!({"interval": 15})).await.unwrap();
        let value = store.get("config").await.unwrap().unwrap();

        assert_eq!(value["interval"], 15);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_caps_oldest_first() {
        let store = MemoryStore::new();

        for i in 0..5 {
            store
                .append_to_list("alerts", json!(i), 3)
                .await
                .unwrap();
        }

        let value = store.get("alerts").await.unwrap().unwrap();
        let list = value.as_array().unwrap();

        // 最旧的条目先被裁剪
        assert_eq!(list.len(), 3);
        assert_eq!(list[0], json!(2));
        assert_eq!(list[2], json!(4));
    }

    #[tokio::test]
    async fn test_append_rejects_non_list() {
        let store = MemoryStore::new();

        store.put("scalar", json!(1)).await.unwrap();
        let result = store.append_to_list("scalar", json!(2), 10).await;

        assert!(result.is_err());
    }
}
