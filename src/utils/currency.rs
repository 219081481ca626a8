//! 货币显示：人民币金额格式化

/// 将金额格式化为 `CNY 6.00` 形式，非有限数值按 0 处理
pub fn format_cny(n: f64) -> String {
    let n = if n.is_finite() { n } else { 0.0 };
    format!("CNY {:.2}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cny() {
        assert_eq!(format_cny(6.0), "CNY 6.00");
        assert_eq!(format_cny(9.9), "CNY 9.90");
        assert_eq!(format_cny(0.0), "CNY 0.00");
        assert_eq!(format_cny(f64::NAN), "CNY 0.00", "NaN应该按0处理");
    }
}
