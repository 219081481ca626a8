//! IO helper: safe file read/write for JSON

use std::{fs::File, io::BufReader, path::Path};

use serde_json::Value;

use crate::model::catalog::StoreError;

/// 从文件读取JSON数据
pub fn read_json_file(p: &Path) -> Result<Value, StoreError> {
    let f = File::open(p)?;
    let rdr = BufReader::new(f);
    let v: Value = serde_json::from_reader(rdr)?;
    Ok(v)
}

/// 将JSON数据保存到文件（格式化输出）
pub fn write_json_file(p: &Path, value: &Value) -> Result<(), StoreError> {
    let f = File::create(p)?;
    serde_json::to_writer_pretty(f, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let path = dir.path().join("data.json");

        let value = json!({"version": 1, "items": [{"name": "测试"}]});
        write_json_file(&path, &value).expect("写入失败");

        let back = read_json_file(&path).expect("读取失败");
        assert_eq!(back, value, "写入后读回应该相同");
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let err = read_json_file(Path::new("/nonexistent/data.json")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)), "文件不存在应该是IO错误");
    }
}
