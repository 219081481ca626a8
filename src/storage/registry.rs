//! 句柄注册表：跨进程重启持久化存储句柄的唯一槽位

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::catalog::StoreError;

/// 槽位文件内容：只记录当前绑定的数据文件路径
#[derive(Debug, Serialize, Deserialize)]
struct HandleSlot {
    data_file: PathBuf,
}

/// 持久化的句柄注册表
///
/// 只有一个槽位：选择新文件总是整体覆盖，从不追加或合并
#[derive(Debug, Clone)]
pub struct HandleRegistry {
    slot_path: PathBuf,
}

impl HandleRegistry {
    /// 在指定槽位文件上打开注册表
    pub fn at(slot_path: PathBuf) -> Self {
        HandleRegistry { slot_path }
    }

    /// 读取上次持久化的句柄
    ///
    /// 任何失败（文件缺失、JSON损坏、路径字段缺失）都静默返回 None：
    /// 句柄丢失可以通过回退到默认目录恢复，从不致命
    pub fn load_handle(&self) -> Option<PathBuf> {
        let text = std::fs::read_to_string(&self.slot_path).ok()?;
        let slot: HandleSlot = serde_json::from_str(&text).ok()?;
        tracing::debug!("已恢复存储句柄: {}", slot.data_file.display());
        Some(slot.data_file)
    }

    /// 覆盖写入槽位，返回前保证已落盘（无写后延迟）
    pub fn save_handle(&self, handle: &Path) -> Result<(), StoreError> {
        if let Some(parent) = self.slot_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let slot = HandleSlot {
            data_file: handle.to_path_buf(),
        };
        let text = serde_json::to_string_pretty(&slot)?;
        let mut f = File::create(&self.slot_path)?;
        f.write_all(text.as_bytes())?;
        f.sync_all()?;
        tracing::info!("存储句柄已持久化: {}", handle.display());
        Ok(())
    }
}
