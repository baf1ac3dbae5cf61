use serde::Serialize;
use std::fmt;

/// Nine-cell position of a product relative to the camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DirectionBucket {
    LeftUp,
    Up,
    RightUp,
    Left,
    Center,
    Right,
    LeftDown,
    Down,
    RightDown,
}

impl DirectionBucket {
    pub const ALL: [DirectionBucket; 9] = [
        DirectionBucket::LeftUp,
        DirectionBucket::Up,
        DirectionBucket::RightUp,
        DirectionBucket::Left,
        DirectionBucket::Center,
        DirectionBucket::Right,
        DirectionBucket::LeftDown,
        DirectionBucket::Down,
        DirectionBucket::RightDown,
    ];

    /// Parses the server's compact bucket names (`왼쪽위`, `가운데`, ...).
    pub fn parse(raw: &str) -> Option<Self> {
        let bucket = match raw.trim() {
            "왼쪽위" => Self::LeftUp,
            "위" => Self::Up,
            "오른쪽위" => Self::RightUp,
            "왼쪽" => Self::Left,
            "가운데" | "중간" => Self::Center,
            "오른쪽" => Self::Right,
            "왼쪽아래" => Self::LeftDown,
            "아래" => Self::Down,
            "오른쪽아래" => Self::RightDown,
            _ => return None,
        };
        Some(bucket)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::LeftUp => "왼쪽 위",
            Self::Up => "위",
            Self::RightUp => "오른쪽 위",
            Self::Left => "왼쪽",
            Self::Center => "가운데",
            Self::Right => "오른쪽",
            Self::LeftDown => "왼쪽 아래",
            Self::Down => "아래",
            Self::RightDown => "오른쪽 아래",
        }
    }

    /// Spoken target of a move instruction. `None` for the centre cell.
    pub fn phrase(&self) -> Option<&'static str> {
        match self {
            Self::Up => Some("위쪽"),
            Self::Down => Some("아래쪽"),
            Self::Center => None,
            other => Some(other.label()),
        }
    }
}

impl fmt::Display for DirectionBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What to say for a raw bucket string from the location endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectionCue {
    /// The product is straight ahead; the user should step closer.
    Approach,
    Move(String),
    /// Blank bucket: nothing to say.
    Silent,
}

impl DirectionCue {
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::Silent;
        }
        match DirectionBucket::parse(raw) {
            Some(bucket) => match bucket.phrase() {
                Some(phrase) => Self::Move(phrase.to_string()),
                None => Self::Approach,
            },
            // unknown buckets are read out as sent
            None => Self::Move(raw.trim().to_string()),
        }
    }

    pub fn utterance(&self) -> String {
        match self {
            Self::Approach => "상품이 정면에 있습니다. 가까이 가주세요.".to_string(),
            Self::Move(target) => format!("{}로 이동하세요", target),
            Self::Silent => String::new(),
        }
    }
}
