use crate::domain::model::{
    Allergy, ApiEnvelope, CartLine, Coordinates, Frame, LocationSearchResult, Place, ProductItem,
    ShelfSearchResult, VisionAnalyzeResponse,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::RwLock;

/// Holds the current access/refresh token pair.
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn set_tokens(&self, access: String, refresh: Option<String>);
    fn set_access_token(&self, access: String);
    fn clear(&self);
}

/// Notified when the client drops the session after a failed refresh.
pub trait AuthListener: Send + Sync {
    fn on_logout(&self);
}

/// Text-to-speech output device.
pub trait SpeechSink: Send + Sync {
    fn speak(&self, text: &str);
    fn stop(&self);
}

pub trait FrameSource: Send + Sync {
    fn next_frame(&self) -> impl std::future::Future<Output = Option<Frame>> + Send;
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Option<Coordinates>;
}

/// Cart view used by the scan flow to tick off found products.
pub trait CartPort: Send + Sync {
    fn is_in_cart(&self, name: &str) -> bool;
    fn remove(&self, line: &CartLine);
    fn names_snapshot(&self) -> Vec<String>;
}

#[async_trait]
pub trait AllergyRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Allergy>>;
    async fn search(&self, query: &str) -> Result<Vec<Allergy>>;
    async fn add(&self, allergy_list_id: i64) -> Result<()>;
    async fn delete(&self, allergy_list_id: i64) -> Result<()>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<CartLine>>;
    async fn search(&self, keyword: &str) -> Result<Option<Vec<ProductItem>>>;
    async fn add(&self, product_id: i64) -> Result<bool>;
    async fn remove(&self, cart_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait PlaceRepository: Send + Sync {
    async fn nearby(&self, at: Coordinates) -> Result<Vec<Place>>;
}

/// Remote recognition endpoints used by the scan session.
#[async_trait]
pub trait ProductVision: Send + Sync {
    async fn shelf_search(&self, frame: &Frame) -> Result<ApiEnvelope<ShelfSearchResult>>;
    async fn locate(
        &self,
        frame: &Frame,
        product_name: &str,
    ) -> Result<ApiEnvelope<LocationSearchResult>>;
    async fn analyze(&self, frame: &Frame) -> Result<Option<VisionAnalyzeResponse>>;
}

#[derive(Debug, Default)]
struct TokenPair {
    access: Option<String>,
    refresh: Option<String>,
}

/// In-memory token store; tokens live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<TokenPair>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(access: Option<String>, refresh: Option<String>) -> Self {
        Self {
            tokens: RwLock::new(TokenPair { access, refresh }),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.tokens.read().ok()?.access.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.tokens.read().ok()?.refresh.clone()
    }

    fn set_tokens(&self, access: String, refresh: Option<String>) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.access = Some(access);
            tokens.refresh = refresh;
        }
    }

    fn set_access_token(&self, access: String) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.access = Some(access);
        }
    }

    fn clear(&self) {
        if let Ok(mut tokens) = self.tokens.write() {
            *tokens = TokenPair::default();
        }
    }
}

/// Writes utterances to stdout.
#[derive(Debug, Default, Clone)]
pub struct ConsoleSpeech;

impl SpeechSink for ConsoleSpeech {
    fn speak(&self, text: &str) {
        // zero-width pause markers are for TTS engines only
        println!("🔊 {}", text.trim_end_matches('\u{200B}'));
    }

    fn stop(&self) {}
}

/// A location that never moves, e.g. from command line flags.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Option<Coordinates>);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Option<Coordinates> {
        self.0
    }
}
