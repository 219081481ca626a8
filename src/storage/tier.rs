//! 存储能力协商：探测运行环境提供的持久化层级

/// 存储能力层级，进程生命周期内对每个 store 实例只协商一次
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// 可弹出原生文件选择/保存对话框，由用户指定数据文件
    FilePicker,
    /// 仅有应用私有数据目录，数据文件由应用托管
    SandboxedFile,
    /// 无任何持久化能力，数据只存在于内存中
    MemoryOnly,
}

impl Tier {
    /// 纯能力探测：只检查平台入口是否存在，不做任何 I/O
    pub fn detect() -> Tier {
        if picker_available() {
            Tier::FilePicker
        } else if dirs::data_dir().is_some() {
            Tier::SandboxedFile
        } else {
            Tier::MemoryOnly
        }
    }

    /// 当前层级是否支持文件选择对话框
    pub fn supports_picker(&self) -> bool {
        matches!(self, Tier::FilePicker)
    }
}

/// 原生对话框可用性：Windows/macOS 总是可用，Linux 需要图形会话
fn picker_available() -> bool {
    if cfg!(target_os = "windows") || cfg!(target_os = "macos") {
        return true;
    }
    std::env::var_os("DISPLAY").is_some() || std::env::var_os("WAYLAND_DISPLAY").is_some()
}
