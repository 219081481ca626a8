//! 雪糕订货目录持久化库
//!
//! 提供带后端能力协商的商品目录存储：原生文件选择、应用沙箱文件、
//! 纯内存三个层级下保持同一套 CRUD/导入导出契约，并附带独立的选购数量存储

pub mod model;
pub mod storage;
pub mod utils;

// 重新导出主要类型
pub use model::catalog::{Binding, CatalogStore, ItemDraft, ItemPatch, StoreError};
pub use model::item::{default_items, sanitize, Item};
pub use model::selection::SelectionStore;
pub use storage::registry::HandleRegistry;
pub use storage::tier::Tier;
