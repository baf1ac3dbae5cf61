use serde::{Deserialize, Serialize};

/// Common `{status, message, result|data}` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn payload(&self) -> Option<&T> {
        self.result.as_ref().or(self.data.as_ref())
    }

    pub fn into_payload(self) -> Option<T> {
        self.result.or(self.data)
    }
}

/// `{"items": [...]}` wrapper used by every list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

// ---- auth ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginData {
    #[serde(rename = "jwtToken")]
    pub jwt_token: String,
    #[serde(
        rename = "refreshToken",
        alias = "refresh_token",
        alias = "refresh",
        default
    )]
    pub refresh_token: Option<String>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<i64>,
    #[serde(rename = "userName", default)]
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

// ---- allergy ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allergy {
    /// Row id of the user's allergy entry.
    pub id: i64,
    /// Catalogue id, used for add/delete.
    pub allergy_list_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllergyItem {
    #[serde(rename = "allergyId")]
    pub allergy_id: i64,
    #[serde(rename = "allergyListId")]
    pub allergy_list_id: i64,
    #[serde(rename = "allergyName")]
    pub allergy_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllergySearchItem {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllergyRequest {
    #[serde(rename = "allergyId")]
    pub allergy_id: i64,
}

impl From<AllergyItem> for Allergy {
    fn from(item: AllergyItem) -> Self {
        Self {
            id: item.allergy_id,
            allergy_list_id: item.allergy_list_id,
            name: item.allergy_name,
        }
    }
}

impl From<AllergySearchItem> for Allergy {
    fn from(item: AllergySearchItem) -> Self {
        // search results only carry the catalogue id
        Self {
            id: item.id,
            allergy_list_id: item.id,
            name: item.name,
        }
    }
}

// ---- cart ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub cart_id: i64,
    pub product_id: i64,
    pub product_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub cart_id: Option<i64>,
    pub product_id: Option<i64>,
    pub name: Option<String>,
    pub qty: u32,
}

impl CartLine {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            cart_id: None,
            product_id: None,
            name: Some(name.into()),
            qty: 1,
        }
    }
}

impl From<CartItem> for CartLine {
    fn from(item: CartItem) -> Self {
        Self {
            cart_id: Some(item.cart_id),
            product_id: Some(item.product_id),
            name: Some(item.product_name),
            qty: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductItem {
    pub product_id: i64,
    pub product_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartAddRequest {
    pub product_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartRemoveRequest {
    pub cart_id: i64,
}

// ---- stores ----

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub distance: Option<u32>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(alias = "placeId", default)]
    pub place_id: Option<String>,
}

// ---- vision ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShelfSearchResult {
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub matched_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationSearchResult {
    #[serde(rename = "case", default)]
    pub case_type: Option<String>,
    #[serde(default)]
    pub target: Option<LocationTarget>,
    #[serde(default)]
    pub info: Option<ProductInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationTarget {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "directionBucket", default)]
    pub direction_bucket: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub allergy: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionAnalyzeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<VisionData>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionData {
    #[serde(default)]
    pub people: Sides,
    #[serde(default)]
    pub directions: Sides,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub obstacles: Sides,
    #[serde(default)]
    pub counter: bool,
}

/// Left / front / right flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sides {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub front: bool,
    #[serde(default)]
    pub right: bool,
}

impl Sides {
    pub fn any(&self) -> bool {
        self.left || self.front || self.right
    }

    /// Korean labels of the raised sides, in left/front/right order.
    pub fn labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.left {
            labels.push("왼쪽");
        }
        if self.front {
            labels.push("정면");
        }
        if self.right {
            labels.push("오른쪽");
        }
        labels
    }
}

/// A recognised product, ready for banner and voice output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectResult {
    pub id: String,
    pub name: String,
    pub price: Option<i64>,
    pub promo: Option<String>,
    pub has_allergy: bool,
    pub allergy_note: Option<String>,
    pub confidence: f32,
}

impl DetectResult {
    pub fn from_info(info: Option<&ProductInfo>, fallback_name: &str) -> Self {
        let name = info
            .and_then(|i| i.name.clone())
            .unwrap_or_else(|| fallback_name.to_string());
        let has_allergy = info.and_then(|i| i.allergy).unwrap_or(false);

        Self {
            id: name.clone(),
            name,
            price: info.and_then(|i| i.price),
            promo: info.and_then(|i| i.event.clone()),
            has_allergy,
            allergy_note: has_allergy.then(|| "알레르기 주의".to_string()),
            confidence: 0.95,
        }
    }
}

/// An already-encoded JPEG camera frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Frame {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}
