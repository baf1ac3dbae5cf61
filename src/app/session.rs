use crate::adapters::http::{
    ApiClient, AuthApi, HttpAllergyRepository, HttpCartRepository, HttpPlaceRepository,
    HttpProductVision,
};
use crate::app::allergy::AllergyController;
use crate::app::cart::CartController;
use crate::app::store_finder::StoreFinder;
use crate::config::TomlConfig;
use crate::core::{ScanSession, SpeechQueue};
use crate::domain::ports::{
    AuthListener, CartPort, ConsoleSpeech, FixedLocation, FrameSource, MemoryTokenStore,
    SpeechSink, TokenStore,
};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::sync::Arc;

/// Tells the user out loud that the session was dropped.
struct SpokenLogoutNotice {
    speech: Arc<SpeechQueue>,
}

impl AuthListener for SpokenLogoutNotice {
    fn on_logout(&self) {
        tracing::warn!("🚪 Session ended, login required");
        self.speech.say("세션이 만료되었습니다. 다시 로그인해주세요.");
    }
}

/// Everything one signed-in user needs, built from a single configuration.
pub struct LookeySession {
    config: TomlConfig,
    tokens: Arc<MemoryTokenStore>,
    client: Arc<ApiClient>,
    speech: Arc<SpeechQueue>,
    vision: Arc<HttpProductVision>,
    pub auth: AuthApi,
    pub allergies: AllergyController,
    pub cart: Arc<CartController>,
    pub stores: StoreFinder,
}

impl LookeySession {
    /// Builds a session speaking to stdout. Must run inside a Tokio runtime.
    pub fn new(config: TomlConfig) -> Result<Self> {
        Self::with_speech_sink(config, Arc::new(ConsoleSpeech))
    }

    pub fn with_speech_sink(config: TomlConfig, sink: Arc<dyn SpeechSink>) -> Result<Self> {
        config.validate()?;

        let tokens = Arc::new(MemoryTokenStore::with_tokens(
            config.access_token(),
            config.refresh_token(),
        ));
        let speech = Arc::new(SpeechQueue::spawn(sink, config.speech_pacing()));

        let client = Arc::new(
            ApiClient::new(config.api_settings(), tokens.clone())?.with_auth_listener(Arc::new(
                SpokenLogoutNotice {
                    speech: speech.clone(),
                },
            )),
        );

        let location = Arc::new(FixedLocation(config.location()));

        tracing::info!("🚀 Session ready for {}", config.base_url());

        Ok(Self {
            auth: AuthApi::new(client.clone()),
            allergies: AllergyController::new(Arc::new(HttpAllergyRepository::new(client.clone()))),
            cart: Arc::new(CartController::new(Arc::new(HttpCartRepository::new(client.clone())))),
            stores: StoreFinder::new(Arc::new(HttpPlaceRepository::new(client.clone())), location),
            vision: Arc::new(HttpProductVision::new(client.clone())),
            config,
            tokens,
            client,
            speech,
        })
    }

    pub fn config(&self) -> &TomlConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn tokens(&self) -> &Arc<MemoryTokenStore> {
        &self.tokens
    }

    pub fn is_logged_in(&self) -> bool {
        self.tokens.access_token().is_some()
    }

    pub fn speech(&self) -> &Arc<SpeechQueue> {
        &self.speech
    }

    /// A scan flow over `frames` that ticks found products off this cart.
    pub fn scan_session<F: FrameSource + 'static>(&self, frames: F) -> ScanSession<F> {
        let cart: Arc<dyn CartPort> = self.cart.clone();
        ScanSession::new(frames, self.vision.clone(), self.speech.clone())
            .with_cart(cart)
            .with_timings(self.config.scan_timings())
    }

    /// Waits for queued speech, then stops the speech worker.
    pub async fn close(&self) {
        self.speech.flush().await;
        self.speech.shutdown();
    }
}
