//! 选购数量存储：独立于目录层级的简单键值持久化
//!
//! 数量属于低价值高频写入的数据，使用应用数据目录下的独立 JSON 文件，
//! 不走文件权限提示；没有数据目录时退化为纯内存

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;

/// 商品 id 到非负数量的映射存储；键缺失即数量为 0
#[derive(Debug)]
pub struct SelectionStore {
    path: Option<PathBuf>,
    cache: HashMap<String, u32>,
}

impl SelectionStore {
    /// 打开选购数量存储；`path` 为 None 时只在内存中生效
    pub fn open(path: Option<PathBuf>) -> Self {
        let cache = path.as_deref().map(load_lenient).unwrap_or_default();
        SelectionStore { path, cache }
    }

    /// 当前全部数量的快照
    pub fn quantities(&self) -> HashMap<String, u32> {
        self.cache.clone()
    }

    /// 整体替换并持久化
    pub fn save(&mut self, quantities: HashMap<String, u32>) {
        self.cache = quantities;
        self.persist();
    }

    /// 清空全部数量
    pub fn clear(&mut self) {
        self.cache.clear();
        self.persist();
    }

    /// 移除单个商品的数量；键不存在时为无操作
    pub fn remove(&mut self, id: &str) {
        if self.cache.remove(id).is_some() {
            self.persist();
        }
    }

    fn persist(&self) {
        let Some(path) = &self.path else { return };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&self.cache) {
            Ok(text) => {
                if let Err(e) = std::fs::write(path, text) {
                    tracing::warn!("选购数量写入失败: {}", e);
                }
            }
            Err(e) => tracing::warn!("选购数量序列化失败: {}", e),
        }
    }
}

/// 宽容加载：文件缺失、JSON 损坏、非对象内容一律视为空映射，
/// 非数字或负数条目被丢弃
fn load_lenient(path: &std::path::Path) -> HashMap<String, u32> {
    let Ok(text) = std::fs::read_to_string(path) else {
        return HashMap::new();
    };
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text) else {
        return HashMap::new();
    };
    map.into_iter()
        .filter_map(|(k, v)| {
            let n = v.as_u64()?;
            Some((k, u32::try_from(n).ok()?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let path = dir.path().join("quantities.json");

        let mut store = SelectionStore::open(Some(path.clone()));
        let mut q = HashMap::new();
        q.insert("ic-vanilla".to_string(), 3u32);
        q.insert("ic-choco".to_string(), 1u32);
        store.save(q.clone());

        let reopened = SelectionStore::open(Some(path));
        assert_eq!(reopened.quantities(), q, "重新打开后应该读回相同数量");
    }

    #[test]
    fn test_remove_existing_and_absent_key() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let mut store = SelectionStore::open(Some(dir.path().join("q.json")));

        let mut q = HashMap::new();
        q.insert("ic-a".to_string(), 2u32);
        store.save(q);

        store.remove("ic-a");
        assert!(!store.quantities().contains_key("ic-a"), "已删除的键不应该存在");

        // 不存在的键：无操作，不panic
        store.remove("ic-missing");
        assert!(store.quantities().is_empty());
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let path = dir.path().join("q.json");
        let mut store = SelectionStore::open(Some(path.clone()));

        let mut q = HashMap::new();
        q.insert("ic-a".to_string(), 5u32);
        store.save(q);
        store.clear();

        assert!(store.quantities().is_empty(), "清空后应该没有数量");
        let reopened = SelectionStore::open(Some(path));
        assert!(reopened.quantities().is_empty(), "清空应该已持久化");
    }

    #[test]
    fn test_lenient_load_drops_garbage() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let path = dir.path().join("q.json");
        std::fs::write(&path, r#"{"ok": 2, "negative": -3, "text": "x"}"#).unwrap();

        let store = SelectionStore::open(Some(path));
        let q = store.quantities();
        assert_eq!(q.get("ok"), Some(&2u32), "合法条目应该保留");
        assert!(!q.contains_key("negative"), "负数条目应该被丢弃");
        assert!(!q.contains_key("text"), "非数字条目应该被丢弃");
    }

    #[test]
    fn test_corrupt_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let path = dir.path().join("q.json");
        std::fs::write(&path, "不是JSON").unwrap();

        let store = SelectionStore::open(Some(path));
        assert!(store.quantities().is_empty(), "损坏的文件应该按空映射处理");
    }

    #[test]
    fn test_memory_only_mode() {
        let mut store = SelectionStore::open(None);
        let mut q = HashMap::new();
        q.insert("ic-a".to_string(), 1u32);
        store.save(q);
        assert_eq!(store.quantities().len(), 1, "无路径时内存中仍应可用");
    }
}
