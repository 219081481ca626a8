//! 商品数据模型与清洗：把不可信的原始记录规整为合法目录条目

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 缺省名称（原始记录缺少 name 时使用）
pub const DEFAULT_NAME: &str = "未命名";
/// 缺省计量单位
pub const DEFAULT_UNIT: &str = "支";

/// 单个商品条目
///
/// 不变量：id 在目录内唯一；priceCny 非负；所有字符串字段始终为具体字符串
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub price_cny: f64,
    pub image_url: String,
    pub unit: String,
}

/// 磁盘上的目录包装格式：`{ version: 1, updatedAt, items }`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFile {
    pub version: u32,
    pub updated_at: String,
    pub items: Vec<Item>,
}

/// 导出格式：与磁盘格式相同，但时间戳键为 generatedAt
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub version: u32,
    pub generated_at: String,
    pub items: Vec<Item>,
}

/// 内置默认目录（4 条种子数据），在无后端或内容损坏时兜底
pub fn default_items() -> Vec<Item> {
    vec![
        seed("ic-vanilla", "香草雪糕", 6.0),
        seed("ic-choco", "巧克力雪糕", 8.5),
        seed("ic-matcha", "抹茶雪糕", 9.9),
        seed("ic-strawberry", "草莓雪球", 7.5),
    ]
}

fn seed(id: &str, name: &str, price: f64) -> Item {
    Item {
        id: id.to_string(),
        name: name.to_string(),
        price_cny: price,
        image_url: String::new(),
        unit: DEFAULT_UNIT.to_string(),
    }
}

/// 将原始 JSON 记录清洗为合法条目，任何字段缺失或类型错误都以缺省值替代，永不失败
///
/// `index` 为批次内序号，参与合成 id，保证同一批导入内 id 不冲突
pub fn sanitize(raw: &Value, index: usize) -> Item {
    Item {
        id: coerce_string(raw.get("id"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| synth_id(index)),
        name: coerce_string(raw.get("name"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_NAME.to_string()),
        price_cny: sanitize_price(raw.get("priceCny")),
        image_url: coerce_string(raw.get("imageUrl")).unwrap_or_default(),
        unit: coerce_string(raw.get("unit"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_UNIT.to_string()),
    }
}

/// 从 JSON 值中提取 items 数组：兼容 `{items:[...]}` 包装与裸数组两种形态
pub fn items_array(data: &Value) -> Option<&Vec<Value>> {
    if let Some(arr) = data.get("items").and_then(Value::as_array) {
        return Some(arr);
    }
    data.as_array()
}

/// 价格清洗：max(0, 数值或0)，宽容接受数字字符串
pub fn sanitize_price(raw: Option<&Value>) -> f64 {
    let n = match raw {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    clamp_price(n)
}

/// 非负裁剪，NaN/无穷视为 0
pub fn clamp_price(n: f64) -> f64 {
    if n.is_finite() && n > 0.0 {
        n
    } else {
        0.0
    }
}

/// 标量到字符串的宽容转换；对象/数组/null 视为缺失
fn coerce_string(raw: Option<&Value>) -> Option<String> {
    match raw {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    }
}

/// 合成 id：`ic-<毫秒时间戳base36>-<批内序号>`
///
/// 时间戳来源是进程内单调递增的（落后于上次发号时强制 +1），
/// 因此同一毫秒内的重复导入也不会产生相同 id
fn synth_id(index: usize) -> String {
    format!("ic-{}-{}", base36(unique_millis()), index)
}

fn unique_millis() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    LAST.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        Some(now.max(last + 1))
    })
    .map(|last| now.max(last + 1))
    .unwrap_or(now)
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}
