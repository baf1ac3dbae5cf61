use crate::domain::model::DetectResult;
use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::LazyLock;

const CART_PROMPT: &str = "장바구니에 담긴 상품입니다. 제거할까요?";
const SINO_DIGITS: [&str; 10] = ["영", "일", "이", "삼", "사", "오", "육", "칠", "팔", "구"];

static ML_SPACED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*m\s*[lℓ]\b").expect("valid regex"));
static ML_PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*ml\b").expect("valid regex"));
static ML_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+)\s*㎖").expect("valid regex"));
static ML_DOTTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*ml\.").expect("valid regex"));
static ONE_PLUS_ONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b1\+1\b").expect("valid regex"));
static TWO_PLUS_ONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b2\+1\b").expect("valid regex"));
static DIGIT_PLUS_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9])\+([0-9])\b").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerKind {
    Warning,
    Info,
    Success,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
}

impl Banner {
    pub fn new(kind: BannerKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// `1700` → `1,700`.
pub fn format_price(price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if price < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Spells out millilitre units so TTS engines read them in Korean.
pub fn normalize_tts_ko(text: &str) -> String {
    let t = ML_SPACED.replace_all(text, "$1 밀리리터");
    let t = ML_PLAIN.replace_all(&t, "$1 밀리리터");
    let t = ML_SYMBOL.replace_all(&t, "$1 밀리리터");
    ML_DOTTED.replace_all(&t, "$1 밀리리터").into_owned()
}

/// Rewrites banner text for reading aloud: pipes, promotions and units.
pub fn normalize_banner_ko(text: &str) -> String {
    let t = text.replace('|', ", ");
    let t = ONE_PLUS_ONE.replace_all(&t, "원 플러스 원");
    let t = TWO_PLUS_ONE.replace_all(&t, "이 플러스 일");
    let t = DIGIT_PLUS_DIGIT.replace_all(&t, |caps: &Captures| {
        format!("{} 플러스 {}", sino_digit(&caps[1]), sino_digit(&caps[2]))
    });
    let t = t.replace("행사품입니다", "행사 상품입니다");
    normalize_tts_ko(&t)
}

fn sino_digit(digit: &str) -> &'static str {
    digit
        .parse::<usize>()
        .ok()
        .and_then(|d| SINO_DIGITS.get(d).copied())
        .unwrap_or("")
}

/// One line `name | 1,700원 | 2+1 행사품입니다.`, plus a warning line for allergens.
pub fn to_banner(result: &DetectResult) -> Banner {
    let mut parts = vec![result.name.clone()];
    if let Some(price) = result.price {
        parts.push(format!("{}원", format_price(price)));
    }
    if let Some(promo) = &result.promo {
        parts.push(format!("{} 행사품입니다.", promo));
    }
    let line = parts.join(" | ");

    if result.has_allergy {
        let note = result.allergy_note.as_deref().unwrap_or("알레르기 성분");
        Banner::new(BannerKind::Warning, format!("{}\n주의: {} 포함", line, note))
    } else {
        Banner::new(BannerKind::Info, line)
    }
}

pub fn to_voice(result: &DetectResult) -> String {
    let price = result
        .price
        .map(|p| format!("가격은 {}원", format_price(p)))
        .unwrap_or_default();
    let promo = result
        .promo
        .as_ref()
        .map(|p| format!(", 행사 {}", p))
        .unwrap_or_default();
    let warning = if result.has_allergy { ", 주의 성분 포함" } else { "" };

    normalize_tts_ko(&format!(
        "{}를 찾았습니다. {}{}{}.",
        result.name, price, promo, warning
    ))
}

pub fn to_cart_banner(result: &DetectResult, in_cart: bool) -> Banner {
    let mut banner = to_banner(result);
    if in_cart {
        banner.text = format!("{}\n{}", banner.text, CART_PROMPT);
    }
    banner
}

pub fn to_cart_voice(result: &DetectResult, in_cart: bool) -> String {
    let voice = to_voice(result);
    if in_cart {
        normalize_tts_ko(&format!("{} {}", voice, CART_PROMPT))
    } else {
        voice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snack(price: Option<i64>, promo: Option<&str>, allergy: bool) -> DetectResult {
        DetectResult {
            id: "1".to_string(),
            name: "먹태깡 청양마요 맛".to_string(),
            price,
            promo: promo.map(str::to_string),
            has_allergy: allergy,
            allergy_note: allergy.then(|| "우유".to_string()),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0), "0");
        assert_eq!(format_price(950), "950");
        assert_eq!(format_price(1700), "1,700");
        assert_eq!(format_price(1234567), "1,234,567");
        assert_eq!(format_price(-2500), "-2,500");
    }

    #[test]
    fn test_normalize_units() {
        assert_eq!(normalize_tts_ko("콜라 500ml"), "콜라 500 밀리리터");
        assert_eq!(normalize_tts_ko("콜라 500 ML"), "콜라 500 밀리리터");
        assert_eq!(normalize_tts_ko("주스 500mL"), "주스 500 밀리리터");
        assert_eq!(normalize_tts_ko("우유 200 mℓ"), "우유 200 밀리리터");
        assert_eq!(normalize_tts_ko("우유 200㎖"), "우유 200 밀리리터");
        assert_eq!(normalize_tts_ko("물 500ml."), "물 500 밀리리터.");
        assert_eq!(normalize_tts_ko("가격 1,700원"), "가격 1,700원");
    }

    #[test]
    fn test_normalize_banner() {
        assert_eq!(
            normalize_banner_ko("먹태깡 | 1,700원 | 2+1 행사품입니다."),
            "먹태깡 ,  1,700원 ,  이 플러스 일 행사 상품입니다."
        );
        assert_eq!(normalize_banner_ko("1+1"), "원 플러스 원");
        assert_eq!(normalize_banner_ko("3+1 행사"), "삼 플러스 일 행사");
    }

    #[test]
    fn test_banner_lines() {
        let banner = to_banner(&snack(Some(1700), Some("2+1"), false));
        assert_eq!(banner.kind, BannerKind::Info);
        assert_eq!(banner.text, "먹태깡 청양마요 맛 | 1,700원 | 2+1 행사품입니다.");

        let warned = to_banner(&snack(None, None, true));
        assert_eq!(warned.kind, BannerKind::Warning);
        assert_eq!(warned.text, "먹태깡 청양마요 맛\n주의: 우유 포함");
    }

    #[test]
    fn test_voice_text() {
        assert_eq!(
            to_voice(&snack(Some(1700), Some("1+1"), true)),
            "먹태깡 청양마요 맛를 찾았습니다. 가격은 1,700원, 행사 1+1, 주의 성분 포함."
        );
        assert_eq!(to_voice(&snack(None, None, false)), "먹태깡 청양마요 맛를 찾았습니다. .");
    }

    #[test]
    fn test_cart_variants() {
        let result = snack(Some(1500), None, false);
        assert!(to_cart_banner(&result, true).text.ends_with("\n장바구니에 담긴 상품입니다. 제거할까요?"));
        assert_eq!(to_cart_banner(&result, false), to_banner(&result));
        assert!(to_cart_voice(&result, true).ends_with(" 장바구니에 담긴 상품입니다. 제거할까요?"));
        assert_eq!(to_cart_voice(&result, false), to_voice(&result));
    }
}
