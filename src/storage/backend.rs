//! 文件后端：权限协议、目录文件读写与原生文件对话框

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::model::catalog::StoreError;
use crate::model::item::{self, CatalogFile, Item};
use crate::utils::fs::{read_json_file, write_json_file};

/// 访问模式，查询与请求权限时区分读/写
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    ReadWrite,
}

/// 查询当前权限状态（不触发任何可能打扰用户的动作）
///
/// 读：文件元数据可见即视为已授权；写：另需 readonly 标志未置位
pub fn query_permission(path: &Path, mode: AccessMode) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => match mode {
            AccessMode::Read => true,
            AccessMode::ReadWrite => !meta.permissions().readonly(),
        },
        Err(_) => false,
    }
}

/// 显式请求权限：以目标访问模式实际打开一次文件
pub fn request_permission(path: &Path, mode: AccessMode) -> bool {
    let mut opts = OpenOptions::new();
    match mode {
        AccessMode::Read => opts.read(true),
        AccessMode::ReadWrite => opts.read(true).write(true),
    };
    opts.open(path).is_ok()
}

/// 权限协议：先查询，未授权时才发起请求
pub fn ensure_permission(path: &Path, mode: AccessMode) -> bool {
    if query_permission(path, mode) {
        return true;
    }
    request_permission(path, mode)
}

/// 从句柄指向的文件读取并清洗目录内容
///
/// 无法识别 items 数组时返回 Schema 错误，JSON 损坏时返回 Parse 错误
pub fn read_catalog(path: &Path) -> Result<Vec<Item>, StoreError> {
    let data: Value = read_json_file(path)?;
    let arr = item::items_array(&data)
        .ok_or_else(|| StoreError::Schema("文件格式不正确：未找到 items 数组".to_string()))?;
    Ok(arr
        .iter()
        .enumerate()
        .map(|(i, raw)| item::sanitize(raw, i))
        .collect())
}

/// 将完整目录以包装格式写入句柄指向的文件
pub fn write_catalog(path: &Path, items: &[Item]) -> Result<(), StoreError> {
    let payload = CatalogFile {
        version: 1,
        updated_at: now_iso(),
        items: items.to_vec(),
    };
    let value = serde_json::to_value(&payload)?;
    write_json_file(path, &value)?;
    tracing::debug!("目录已写入: {} ({} 条)", path.display(), items.len());
    Ok(())
}

/// ISO-8601 时间戳（毫秒精度，UTC）
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 显示文件选择对话框（仅限 JSON 文件）
pub fn pick_json_file() -> Option<PathBuf> {
    let picked = rfd::FileDialog::new()
        .add_filter("JSON文件", &["json"])
        .set_title("选择数据文件")
        .pick_file();

    match picked {
        Some(path) => {
            tracing::info!("用户选择了数据文件: {}", path.display());
            Some(path)
        }
        None => {
            tracing::info!("用户取消了文件选择");
            None
        }
    }
}

/// 显示保存目标对话框，带建议文件名
pub fn save_json_file(suggested: &str) -> Option<PathBuf> {
    let picked = rfd::FileDialog::new()
        .add_filter("JSON文件", &["json"])
        .set_title("创建数据文件")
        .set_file_name(suggested)
        .save_file();

    match picked {
        Some(path) => {
            tracing::info!("用户指定了新数据文件: {}", path.display());
            Some(path)
        }
        None => {
            tracing::info!("用户取消了文件创建");
            None
        }
    }
}
