use crate::domain::model::{Sides, VisionAnalyzeResponse};
use serde::Serialize;

/// Walking guidance derived from one vision analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NavGuidance {
    pub summary: Option<String>,
    pub actions: Vec<String>,
    pub tts_hint: Option<String>,
}

impl NavGuidance {
    pub fn from_response(response: &VisionAnalyzeResponse) -> Self {
        let Some(data) = &response.data else {
            return Self::default();
        };

        let open = data.directions.labels();
        let mut summary = if open.is_empty() {
            "이동 가능한 방향이 없습니다.".to_string()
        } else {
            format!("이동 가능: {}", open.join(", "))
        };
        if data.counter {
            summary.push_str(" | 계산대 감지");
        }

        let category = category_ko(data.category.as_deref());

        let mut actions = Vec::new();
        if data.directions.left {
            actions.push("왼쪽으로 이동".to_string());
        }
        if data.directions.front {
            actions.push("앞으로 이동".to_string());
        }
        if data.directions.right {
            actions.push("오른쪽으로 이동".to_string());
        }
        if data.counter {
            actions.push("계산대 방향".to_string());
        }
        if let Some(zone) = &category {
            actions.push(format!("현재 구역: {}", zone));
        }
        actions.extend(sides_message("사람 감지", &data.people));
        actions.extend(sides_message("장애물", &data.obstacles));

        let caution = (data.people.front || data.obstacles.front).then_some("정면 주의".to_string());
        let movement = if data.directions.front {
            Some("앞으로 이동 가능합니다".to_string())
        } else if data.directions.right {
            Some("오른쪽으로 이동 가능합니다".to_string())
        } else if data.directions.left {
            Some("왼쪽으로 이동 가능합니다".to_string())
        } else {
            None
        };
        let zone = category.map(|c| format!("현재 구역은 {}입니다", c));

        let hint = [caution, movement, zone]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(". ");

        Self {
            summary: Some(summary),
            actions,
            tts_hint: (!hint.trim().is_empty()).then_some(hint),
        }
    }
}

fn sides_message(label: &str, sides: &Sides) -> Option<String> {
    let labels = sides.labels();
    (!labels.is_empty()).then(|| format!("{}: {}", label, labels.join(", ")))
}

fn category_ko(category: Option<&str>) -> Option<String> {
    let raw = category?.trim();
    match raw.to_lowercase().as_str() {
        "" | "unknown" => None,
        "snack" | "snacks" => Some("과자".to_string()),
        "beverage" | "beverages" | "drink" | "drinks" => Some("음료".to_string()),
        _ => Some(raw.to_string()),
    }
}
