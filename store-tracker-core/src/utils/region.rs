//! 都道府県の並び順と郵便番号ソート

use std::cmp::Ordering;

/// 47 prefectures in JIS X 0401 code order.
pub const PREFECTURES: [&str; 47] = [
    "北海道", "青森県", "岩手県", "宮城県", "秋田県", "山形県", "福島県",
    "茨城県", "栃木県", "群馬県", "埼玉県", "千葉県", "東京都", "神奈川県",
    "新潟県", "富山県", "石川県", "福井県", "山梨県", "長野県", "岐阜県",
    "静岡県", "愛知県", "三重県", "滋賀県", "京都府", "大阪府", "兵庫県",
    "奈良県", "和歌山県", "鳥取県", "島根県", "岡山県", "広島県", "山口県",
    "徳島県", "香川県", "愛媛県", "高知県", "福岡県", "佐賀県", "長崎県",
    "熊本県", "大分県", "宮崎県", "鹿児島県", "沖縄県",
];

/// Placeholder used for records whose prefecture could not be determined.
pub const UNKNOWN_PREFECTURE: &str = "不明";

/// JIS code (1-based) of a prefecture name.
pub fn prefecture_code(name: &str) -> Option<usize> {
    PREFECTURES.iter().position(|p| *p == name).map(|i| i + 1)
}

/// Whether the prefecture is set and not the unknown placeholder.
pub fn is_known_prefecture(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && name != UNKNOWN_PREFECTURE
}

/// Orders prefectures by code; unlisted names sort last, alphabetically.
pub fn compare_prefectures(a: &str, b: &str) -> Ordering {
    let rank = |p: &str| prefecture_code(p).unwrap_or(usize::MAX);
    rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
}

/// Numeric value of a postal code (`"150-0001"` → `1500001`); unparsable codes sort last.
pub fn zip_key(zipcode: &str) -> u64 {
    let digits: String = zipcode.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(u64::MAX)
}

/// `part / whole` as a percentage rounded to one decimal; `0.0` when `whole` is zero.
#[allow(clippy::cast_precision_loss)]
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_jis_order() {
        assert_eq!(prefecture_code("北海道"), Some(1));
        assert_eq!(prefecture_code("東京都"), Some(13));
        assert_eq!(prefecture_code("沖縄県"), Some(47));
        assert_eq!(prefecture_code("Atlantis"), None);
    }

    #[test]
    fn unknown_sorts_last() {
        assert_eq!(compare_prefectures("沖縄県", "不明"), Ordering::Less);
        assert_eq!(compare_prefectures("大阪府", "東京都"), Ordering::Greater);
    }

    #[test]
    fn zip_keys() {
        assert_eq!(zip_key("150-0001"), 1_500_001);
        assert_eq!(zip_key("0600000"), 600_000);
        assert_eq!(zip_key(""), u64::MAX);
    }

    #[test]
    fn percentages_round_to_one_decimal() {
        assert!((percentage(1, 3) - 33.3).abs() < f64::EPSILON);
        assert!((percentage(2, 3) - 66.7).abs() < f64::EPSILON);
        assert!(percentage(0, 0).abs() < f64::EPSILON);
    }
}
