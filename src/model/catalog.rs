//! 目录存储：核心状态机，持有内存缓存并把每次变更直写到当前绑定的后端

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::model::item::{self, default_items, ExportFile, Item};
use crate::model::selection::SelectionStore;
use crate::storage::backend::{self, AccessMode};
use crate::storage::registry::HandleRegistry;
use crate::storage::tier::Tier;

/// 存储层错误分类
#[derive(Error, Debug)]
pub enum StoreError {
    /// 当前层级不支持该操作，不可重试，上游应禁用对应入口
    #[error("当前环境不支持该操作: {0}")]
    Capability(String),
    /// 用户拒绝或撤销了访问授权，可通过下一次用户动作重新请求
    #[error("没有访问权限: {0}")]
    Permission(String),
    /// 输入不是合法 JSON
    #[error("JSON解析失败: {0}")]
    Parse(#[from] serde_json::Error),
    /// JSON 合法但缺少可识别的 items 数组
    #[error("数据格式不正确: {0}")]
    Schema(String),
    /// 变更已生效于内存缓存，但直写后端失败，缓存与文件可能不一致
    #[error("写入失败: {0}")]
    Persistence(String),
    /// 底层 IO 失败
    #[error("IO失败: {0}")]
    Io(#[from] std::io::Error),
}

/// 缓存与后端的绑定关系
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// 无后端：所有写入只影响内存缓存，进程重启后不保留
    NoBackend,
    /// 绑定到具体文件：每次变更都直写该文件
    BoundFile(PathBuf),
}

/// 新增商品的原始输入，缺失字段由清洗逻辑补默认值
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cny: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// 更新商品的补丁：只有给出的字段会被替换
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub price_cny: Option<f64>,
    pub image_url: Option<String>,
    pub unit: Option<String>,
}

/// 目录存储
///
/// 独占持有内存缓存，是持久化目录表示的唯一写入者。
/// 所有变更操作要求 `&mut self`，天然保证同一实例内同一时刻至多一个在途变更。
#[derive(Debug)]
pub struct CatalogStore {
    tier: Tier,
    registry: Option<HandleRegistry>,
    sandbox_file: Option<PathBuf>,
    selection: SelectionStore,
    cache: Vec<Item>,
    binding: Binding,
    ready: bool,
}

impl CatalogStore {
    /// 按探测到的能力层级与平台默认数据目录构造存储
    pub fn open_default() -> Self {
        let base = dirs::data_dir().map(|d| d.join("xuegao_dinghuo"));
        Self::with_config(Tier::detect(), base)
    }

    /// 以显式层级与基础目录构造存储（测试与多实例场景）
    pub fn with_config(tier: Tier, base_dir: Option<PathBuf>) -> Self {
        let registry = base_dir
            .as_ref()
            .map(|b| HandleRegistry::at(b.join("handle.json")));
        let sandbox_file = base_dir.as_ref().map(|b| b.join("items.json"));
        let selection = SelectionStore::open(base_dir.map(|b| b.join("quantities.json")));
        CatalogStore {
            tier,
            registry,
            sandbox_file,
            selection,
            cache: Vec::new(),
            binding: Binding::NoBackend,
            ready: false,
        }
    }

    /// 初始化：恢复句柄、读取后端内容并建立绑定
    ///
    /// 永不失败：任何加载、权限或解析问题都回退到内置默认目录。
    /// 只执行一次，之后的调用为无操作；读取操作会按需触发。
    pub fn init(&mut self) {
        if self.ready {
            return;
        }
        let (cache, binding) = match self.tier {
            Tier::FilePicker => self.init_from_registry(),
            Tier::SandboxedFile => self.init_sandbox(),
            Tier::MemoryOnly => (default_items(), Binding::NoBackend),
        };
        self.cache = cache;
        self.binding = binding;
        self.ready = true;
        tracing::info!(
            "目录存储就绪: 层级={:?}, 绑定={}, 条目={}",
            self.tier,
            match &self.binding {
                Binding::NoBackend => "无后端".to_string(),
                Binding::BoundFile(p) => p.display().to_string(),
            },
            self.cache.len()
        );
    }

    /// FilePicker 层级：尝试恢复上次持久化的句柄并读回内容
    fn init_from_registry(&self) -> (Vec<Item>, Binding) {
        let handle = self.registry.as_ref().and_then(|r| r.load_handle());
        let Some(handle) = handle else {
            return (default_items(), Binding::NoBackend);
        };
        if !backend::ensure_permission(&handle, AccessMode::Read) {
            tracing::warn!("存储句柄的读取授权未通过，回退到默认目录");
            return (default_items(), Binding::NoBackend);
        }
        match backend::read_catalog(&handle) {
            Ok(items) => (items, Binding::BoundFile(handle)),
            Err(e) => {
                tracing::warn!("读取数据文件失败，回退到默认目录: {}", e);
                (default_items(), Binding::NoBackend)
            }
        }
    }

    /// SandboxedFile 层级：确保应用托管的数据文件存在并可读
    ///
    /// 文件缺失或内容损坏时用默认目录重建文件并保持绑定
    fn init_sandbox(&self) -> (Vec<Item>, Binding) {
        let Some(path) = self.sandbox_file.clone() else {
            return (default_items(), Binding::NoBackend);
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("创建数据目录失败，退化为内存模式: {}", e);
                return (default_items(), Binding::NoBackend);
            }
        }
        match backend::read_catalog(&path) {
            Ok(items) => (items, Binding::BoundFile(path)),
            Err(_) => {
                let items = default_items();
                match backend::write_catalog(&path, &items) {
                    Ok(()) => (items, Binding::BoundFile(path)),
                    Err(e) => {
                        tracing::warn!("初始化沙箱数据文件失败，退化为内存模式: {}", e);
                        (items, Binding::NoBackend)
                    }
                }
            }
        }
    }

    fn ensure_ready(&mut self) {
        if !self.ready {
            self.init();
        }
    }

    /// 当前目录条目的快照
    pub fn items(&mut self) -> Vec<Item> {
        self.ensure_ready();
        self.cache.clone()
    }

    /// 当前绑定状态
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// 当前层级
    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// 当前绑定文件的显示名；无后端时为 None
    pub fn current_file_name(&self) -> Option<String> {
        match &self.binding {
            Binding::NoBackend => None,
            Binding::BoundFile(p) => Some(
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "已选择数据文件".to_string()),
            ),
        }
    }

    /// 新增商品：清洗输入、追加到缓存并直写后端
    ///
    /// 直写失败返回 `Persistence`，此时新条目已在内存中可见但尚未落盘
    pub fn add_item(&mut self, draft: ItemDraft) -> Result<Item, StoreError> {
        self.ensure_ready();
        let raw = serde_json::to_value(&draft)?;
        let clean = item::sanitize(&raw, 0);
        self.cache.push(clean.clone());
        self.write_through()?;
        tracing::info!("新增商品: {} ({})", clean.name, clean.id);
        Ok(clean)
    }

    /// 按补丁更新商品；目标 id 不存在时返回 Ok(false)
    pub fn update_item(&mut self, id: &str, patch: ItemPatch) -> Result<bool, StoreError> {
        self.ensure_ready();
        let Some(idx) = self.cache.iter().position(|x| x.id == id) else {
            return Ok(false);
        };
        let current = &mut self.cache[idx];
        if let Some(name) = patch.name {
            current.name = if name.is_empty() {
                item::DEFAULT_NAME.to_string()
            } else {
                name
            };
        }
        if let Some(price) = patch.price_cny {
            current.price_cny = item::clamp_price(price);
        }
        if let Some(image_url) = patch.image_url {
            current.image_url = image_url;
        }
        if let Some(unit) = patch.unit {
            current.unit = if unit.is_empty() {
                item::DEFAULT_UNIT.to_string()
            } else {
                unit
            };
        }
        self.write_through()?;
        Ok(true)
    }

    /// 删除商品并清理选购数量中的对应键；id 不存在时为无操作
    pub fn delete_item(&mut self, id: &str) -> Result<(), StoreError> {
        self.ensure_ready();
        let before = self.cache.len();
        self.cache.retain(|x| x.id != id);
        if self.cache.len() != before {
            self.write_through()?;
        }
        self.selection.remove(id);
        Ok(())
    }

    /// 整体替换目录内容（所有条目仍会过一遍清洗）并直写后端
    pub fn replace_items(&mut self, items: Vec<Item>) -> Result<(), StoreError> {
        self.ensure_ready();
        let mut cleaned = Vec::with_capacity(items.len());
        for (i, it) in items.into_iter().enumerate() {
            let raw = serde_json::to_value(&it)?;
            cleaned.push(item::sanitize(&raw, i));
        }
        self.cache = cleaned;
        self.write_through()
    }

    /// 从文本批量导入：替换整个缓存、直写后端并清空选购数量
    ///
    /// 返回导入条目数。旧 id 大概率已失效，因此选购数量整体清空
    pub fn import_from_text(&mut self, text: &str) -> Result<usize, StoreError> {
        self.ensure_ready();
        let data: serde_json::Value = serde_json::from_str(text)?;
        let arr = item::items_array(&data)
            .ok_or_else(|| StoreError::Schema("导入失败：未找到 items 数组".to_string()))?;
        let cleaned: Vec<Item> = arr
            .iter()
            .enumerate()
            .map(|(i, raw)| item::sanitize(raw, i))
            .collect();
        let count = cleaned.len();
        self.cache = cleaned;
        self.write_through()?;
        self.selection.clear();
        tracing::info!("导入完成: {} 条数据", count);
        Ok(count)
    }

    /// 导出当前内存缓存为带 generatedAt 时间戳的文本
    ///
    /// 始终反映内存视图，从不回读后端
    pub fn export_text(&mut self) -> Result<String, StoreError> {
        self.ensure_ready();
        let payload = ExportFile {
            version: 1,
            generated_at: backend::now_iso(),
            items: self.cache.clone(),
        };
        Ok(serde_json::to_string_pretty(&payload)?)
    }

    /// 让用户选择一个已有的 JSON 数据文件并重新绑定
    ///
    /// 仅 FilePicker 层级可用；用户取消选择返回 Ok(None)
    pub fn choose_data_file(&mut self) -> Result<Option<String>, StoreError> {
        self.ensure_ready();
        if !self.tier.supports_picker() {
            return Err(StoreError::Capability(
                "当前环境不支持选择本地文件".to_string(),
            ));
        }
        let Some(path) = backend::pick_json_file() else {
            return Ok(None);
        };
        self.bind_existing_file(path).map(Some)
    }

    /// 让用户指定保存目标创建新数据文件，立即写入默认目录建立合法文件
    ///
    /// 仅 FilePicker 层级可用；用户取消返回 Ok(None)
    pub fn create_data_file(&mut self) -> Result<Option<String>, StoreError> {
        self.ensure_ready();
        if !self.tier.supports_picker() {
            return Err(StoreError::Capability(
                "当前环境不支持创建本地文件".to_string(),
            ));
        }
        let Some(path) = backend::save_json_file("xuegao-items.json") else {
            return Ok(None);
        };
        self.bind_new_file(path).map(Some)
    }

    /// 绑定到用户选中的已有文件：请求读权限、持久化句柄、回读内容
    fn bind_existing_file(&mut self, path: PathBuf) -> Result<String, StoreError> {
        if !backend::ensure_permission(&path, AccessMode::Read) {
            return Err(StoreError::Permission("读取所选文件被拒绝".to_string()));
        }
        if let Some(registry) = &self.registry {
            registry.save_handle(&path)?;
        }
        self.binding = Binding::BoundFile(path.clone());
        // 回读失败时句柄保持已持久化状态，缓存不变，错误交给调用方
        self.cache = backend::read_catalog(&path)?;
        Ok(self.display_name(&path))
    }

    /// 绑定到新建文件：持久化句柄并写入默认目录
    fn bind_new_file(&mut self, path: PathBuf) -> Result<String, StoreError> {
        if let Some(registry) = &self.registry {
            registry.save_handle(&path)?;
        }
        self.binding = Binding::BoundFile(path.clone());
        self.cache = default_items();
        backend::write_catalog(&path, &self.cache)
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(self.display_name(&path))
    }

    fn display_name(&self, path: &std::path::Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "已选择数据文件".to_string())
    }

    /// 全量直写：把当前缓存整体写回绑定的后端
    ///
    /// 无后端时为无操作；写权限被拒或写入出错映射为 `Persistence`
    fn write_through(&mut self) -> Result<(), StoreError> {
        let Binding::BoundFile(path) = &self.binding else {
            return Ok(());
        };
        if !backend::ensure_permission(path, AccessMode::ReadWrite) {
            return Err(StoreError::Persistence("没有写入权限".to_string()));
        }
        backend::write_catalog(path, &self.cache)
            .map_err(|e| StoreError::Persistence(e.to_string()))
    }

    // ====== 选购数量（独立于目录层级的键值存储） ======

    /// 当前选购数量快照；键缺失即数量为 0
    pub fn quantities(&self) -> HashMap<String, u32> {
        self.selection.quantities()
    }

    /// 整体保存选购数量
    pub fn save_quantities(&mut self, quantities: HashMap<String, u32>) {
        self.selection.save(quantities);
    }

    /// 清空选购数量
    pub fn clear_quantities(&mut self) {
        self.selection.clear();
    }
}
