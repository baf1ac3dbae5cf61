use crate::core::direction::{DirectionBucket, DirectionCue};
use crate::core::formatter::{
    normalize_banner_ko, to_banner, to_cart_banner, to_cart_voice, Banner, BannerKind,
};
use crate::core::navigation::NavGuidance;
use crate::core::speech::SpeechQueue;
use crate::domain::model::{CartLine, DetectResult, LocationSearchResult, ProductInfo};
use crate::domain::ports::{CartPort, FrameSource, ProductVision};
use crate::utils::error::{LookeyError, Result};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const RECOGNIZED_CASES: [&str; 3] = ["SINGLE_RECOGNIZED", "RECOGNIZED", "FOUND"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ScanMode {
    #[default]
    Scan,
    Guide,
}

/// Everything a screen needs to render the scan flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanState {
    pub mode: ScanMode,
    pub scanning: bool,
    pub capturing: bool,
    pub current: Option<DetectResult>,
    pub banner: Option<Banner>,

    pub cart_guide_queue: Vec<String>,
    pub cart_guide_target: Option<String>,
    pub show_cart_guide_prompt: bool,

    pub guiding: bool,
    pub guide_direction: Option<DirectionBucket>,

    pub nav_summary: Option<String>,
    pub nav_actions: Vec<String>,
    pub nav_busy: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanTimings {
    /// Wait after a shelf search before the result is shown.
    pub settle: Duration,
    pub banner: Duration,
    pub prompt_gap: Duration,
    pub locate_start: Duration,
    pub missing_frame_retry: Duration,
    pub after_direction: Duration,
    pub direction_cooldown: Duration,
    pub found_pause: Duration,
    pub banner_read_delay: Duration,
    pub chunk_pause: Duration,
    pub retry: Duration,
    pub guide_poll: Duration,
    pub max_locate_attempts: usize,
}

impl Default for ScanTimings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(3000),
            banner: Duration::from_millis(2500),
            prompt_gap: Duration::from_millis(150),
            locate_start: Duration::from_millis(1000),
            missing_frame_retry: Duration::from_millis(500),
            after_direction: Duration::from_millis(1500),
            direction_cooldown: Duration::from_millis(2000),
            found_pause: Duration::from_millis(500),
            banner_read_delay: Duration::from_millis(700),
            chunk_pause: Duration::from_millis(350),
            retry: Duration::from_millis(1000),
            guide_poll: Duration::from_millis(1000),
            max_locate_attempts: 10,
        }
    }
}

impl ScanTimings {
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            banner: Duration::ZERO,
            prompt_gap: Duration::ZERO,
            locate_start: Duration::ZERO,
            missing_frame_retry: Duration::ZERO,
            after_direction: Duration::ZERO,
            direction_cooldown: Duration::ZERO,
            found_pause: Duration::ZERO,
            banner_read_delay: Duration::ZERO,
            chunk_pause: Duration::ZERO,
            retry: Duration::ZERO,
            guide_poll: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocateOutcome {
    /// No cart target is waiting for guidance.
    NoTarget,
    Found(DetectResult),
    NotFound,
}

struct Inner<F> {
    frames: F,
    vision: Arc<dyn ProductVision>,
    speech: Arc<SpeechQueue>,
    cart: Option<Arc<dyn CartPort>>,
    timings: ScanTimings,
    state: watch::Sender<ScanState>,
    last_spoken_id: Mutex<Option<String>>,
    last_nav_hint: Mutex<Option<String>>,
}

/// Camera scan flow: shelf search, cart-guided product location and
/// walking guidance, with all speech going through one queue.
pub struct ScanSession<F> {
    inner: Arc<Inner<F>>,
    guide_task: Mutex<Option<JoinHandle<()>>>,
}

impl<F: FrameSource + 'static> ScanSession<F> {
    pub fn new(frames: F, vision: Arc<dyn ProductVision>, speech: Arc<SpeechQueue>) -> Self {
        let (state, _) = watch::channel(ScanState::default());
        Self {
            inner: Arc::new(Inner {
                frames,
                vision,
                speech,
                cart: None,
                timings: ScanTimings::default(),
                state,
                last_spoken_id: Mutex::new(None),
                last_nav_hint: Mutex::new(None),
            }),
            guide_task: Mutex::new(None),
        }
    }

    // the inner Arc is only shared once a guide loop starts
    pub fn with_cart(mut self, cart: Arc<dyn CartPort>) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.cart = Some(cart);
        }
        self
    }

    pub fn with_timings(mut self, timings: ScanTimings) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.timings = timings;
        }
        self
    }

    pub fn state(&self) -> ScanState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.inner.state.subscribe()
    }

    pub fn speech(&self) -> &Arc<SpeechQueue> {
        &self.inner.speech
    }

    pub fn set_mode(&self, mode: ScanMode) {
        self.inner.update(|s| {
            s.mode = mode;
            if mode != ScanMode::Scan {
                s.scanning = false;
            }
            s.capturing = false;
        });
        self.stop_guide_loop();
    }

    /// Sends one shelf frame and queues the matched cart products for guidance.
    pub async fn start_panorama(&self) -> Result<Vec<String>> {
        self.inner.start_panorama().await
    }

    /// Accepts the guidance prompt and searches for the current target.
    pub async fn confirm_cart_guide(&self) -> Result<LocateOutcome> {
        let Some(target) = self.state().cart_guide_target else {
            return Ok(LocateOutcome::NoTarget);
        };
        self.inner
            .speech
            .say(format!("{} 를 찾기 시작합니다. 카메라를 천천히 움직여 주세요.", target));
        self.inner.update(|s| {
            s.show_cart_guide_prompt = false;
            s.guiding = true;
            s.guide_direction = None;
        });
        self.inner.locate_loop(&target).await
    }

    /// Guides to a single named product without a shelf search first.
    pub async fn locate_product(&self, name: &str) -> Result<LocateOutcome> {
        self.inner.update(|s| {
            s.cart_guide_queue = vec![name.to_string()];
            s.cart_guide_target = Some(name.to_string());
            s.show_cart_guide_prompt = false;
        });
        self.confirm_cart_guide().await
    }

    pub async fn skip_cart_guide(&self) {
        self.inner.proceed_to_next_target().await;
    }

    pub async fn nav_guide_once(&self) -> Option<NavGuidance> {
        self.inner.update(|s| s.nav_busy = true);
        let guidance = self.inner.nav_guide_step().await;
        self.inner.update(|s| s.nav_busy = false);
        guidance
    }

    /// Polls the vision endpoint while in Guide mode. Returns false if a
    /// loop is already running or the session is not in Guide mode.
    pub fn start_guide_loop(&self) -> bool {
        let mut task = lock(&self.guide_task);
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return false;
        }
        if self.inner.state.borrow().mode != ScanMode::Guide {
            tracing::debug!("🧭 Guide loop requested outside Guide mode");
            return false;
        }

        let inner = self.inner.clone();
        *task = Some(tokio::spawn(async move { inner.guide_loop().await }));
        true
    }

    pub fn stop_guide_loop(&self) {
        if let Some(task) = lock(&self.guide_task).take() {
            task.abort();
        }
        *lock(&self.inner.last_nav_hint) = None;
        self.inner.update(|s| {
            s.nav_summary = None;
            s.nav_actions.clear();
        });
    }

    /// Shows a locally recognised product; the voice is skipped when the
    /// same product was announced last.
    pub fn on_detected(&self, result: DetectResult) {
        let in_cart = self
            .inner
            .cart
            .as_ref()
            .is_some_and(|cart| cart.is_in_cart(&result.name));
        let banner = to_cart_banner(&result, in_cart);
        let voice = to_cart_voice(&result, in_cart);

        let mut last = lock(&self.inner.last_spoken_id);
        if last.as_deref() != Some(result.id.as_str()) {
            self.inner.speech.say(voice);
            *last = Some(result.id.clone());
        }
        drop(last);

        self.inner.update(|s| {
            s.current = Some(result);
            s.banner = Some(banner);
        });
    }

    pub fn clear_banner(&self) {
        self.inner.update(|s| s.banner = None);
    }

    pub fn shutdown(&self) {
        self.stop_guide_loop();
        self.inner.speech.shutdown();
    }
}

impl<F> Drop for ScanSession<F> {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.guide_task).take() {
            task.abort();
        }
    }
}

impl<F: FrameSource> Inner<F> {
    fn update(&self, modify: impl FnOnce(&mut ScanState)) {
        self.state.send_modify(modify);
    }

    async fn start_panorama(&self) -> Result<Vec<String>> {
        if self.state.borrow().mode != ScanMode::Scan {
            return Ok(Vec::new());
        }

        self.update(|s| {
            s.scanning = true;
            s.capturing = true;
            s.banner = None;
            s.cart_guide_queue.clear();
            s.cart_guide_target = None;
            s.show_cart_guide_prompt = false;
        });

        let Some(frame) = self.frames.next_frame().await else {
            self.update(|s| {
                s.scanning = false;
                s.capturing = false;
            });
            return Err(LookeyError::NoFrameError);
        };

        let response = self.vision.shelf_search(&frame).await;
        tokio::time::sleep(self.timings.settle).await;
        self.update(|s| {
            s.scanning = false;
            s.capturing = false;
        });

        let envelope = response.map_err(|e| {
            tracing::error!("🛍️ Shelf search failed: {}", e);
            e
        })?;
        let result = envelope.into_payload().unwrap_or_default();
        let matched = result.matched_names.unwrap_or_default();
        let count = result.count.unwrap_or(0);
        let next = matched.first().cloned();

        let text = if count == 0 {
            "상품을 찾을 수 없습니다. 카메라를 상품에 가까이 대주세요.".to_string()
        } else if matched.is_empty() {
            "인식된 상품이 장바구니에 없습니다.".to_string()
        } else {
            format!("상품 {}개를 찾았습니다.", matched.len())
        };
        let kind = if count > 0 { BannerKind::Success } else { BannerKind::Info };
        tracing::info!("🛍️ Shelf search: {} products, {} in cart", count, matched.len());

        self.update(|s| {
            s.banner = Some(Banner::new(kind, text.clone()));
            s.cart_guide_queue = matched.clone();
            s.cart_guide_target = next.clone();
            s.show_cart_guide_prompt = false;
        });
        self.speech.say(text);

        tokio::time::sleep(self.timings.banner).await;
        self.update(|s| s.banner = None);
        tokio::time::sleep(self.timings.prompt_gap).await;
        self.update(|s| s.show_cart_guide_prompt = next.is_some());

        Ok(matched)
    }

    async fn locate_loop(&self, target: &str) -> Result<LocateOutcome> {
        tokio::time::sleep(self.timings.locate_start).await;
        let attempts = self.timings.max_locate_attempts;

        for attempt in 0..attempts {
            tracing::debug!("🎯 Locate attempt {} of {} for {}", attempt + 1, attempts, target);

            let cooldown = self.speech.cooldown_remaining();
            if !cooldown.is_zero() {
                tokio::time::sleep(cooldown + Duration::from_millis(50)).await;
            }

            let Some(frame) = self.frames.next_frame().await else {
                tracing::warn!("📷 No frame at attempt {}", attempt + 1);
                tokio::time::sleep(self.timings.missing_frame_retry).await;
                continue;
            };

            let result = match self.vision.locate(&frame, target).await {
                Ok(envelope) => envelope.into_payload(),
                Err(e @ (LookeyError::SessionExpired | LookeyError::UnauthorizedError { .. })) => {
                    self.update(|s| {
                        s.guiding = false;
                        s.guide_direction = None;
                    });
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("🎯 Location search failed: {}", e);
                    None
                }
            };

            if let Some(raw) = direction_of(result.as_ref()) {
                self.announce_direction(&raw).await;
                continue;
            }

            if let Some(info) = recognized_info(result.as_ref()) {
                return Ok(self.finish_found(target, info.as_ref()).await);
            }

            if attempt + 1 < attempts && attempt % 3 == 2 {
                self.speech.say("계속 찾고 있습니다.");
            }
            tokio::time::sleep(self.timings.retry).await;
        }

        self.speech
            .say(format!("{} 를 찾을 수 없습니다. 다시 시도해주세요.", target));
        self.update(|s| {
            s.guiding = false;
            s.guide_direction = None;
        });
        Ok(LocateOutcome::NotFound)
    }

    async fn announce_direction(&self, raw: &str) {
        self.update(|s| s.guide_direction = DirectionBucket::parse(raw));
        let cue = DirectionCue::from_raw(raw);
        tracing::debug!("🎯 Direction {} -> {:?}", raw, cue);
        if cue != DirectionCue::Silent {
            self.speech.say(cue.utterance());
            self.speech.extend_cooldown(self.timings.direction_cooldown);
        }
        tokio::time::sleep(self.timings.after_direction).await;
    }

    async fn finish_found(&self, target: &str, info: Option<&ProductInfo>) -> LocateOutcome {
        self.speech.say("상품을 찾았습니다!");
        tokio::time::sleep(self.timings.found_pause).await;

        let detected = DetectResult::from_info(info, target);
        let banner = to_banner(&detected);
        tracing::info!("🎯 Found {}", detected.name);

        self.update(|s| {
            s.banner = Some(banner.clone());
            s.current = Some(detected.clone());
            s.guiding = false;
            s.guide_direction = None;
        });

        tokio::time::sleep(self.timings.banner_read_delay).await;
        self.read_banner_slowly(&banner.text);

        if let Some(cart) = &self.cart {
            cart.remove(&CartLine::named(detected.name.clone()));
        }
        self.proceed_to_next_target().await;

        LocateOutcome::Found(detected)
    }

    /// Reads each `|` separated part of a banner with a short pause between.
    fn read_banner_slowly(&self, text: &str) {
        let chunks: Vec<&str> = text
            .split('|')
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .collect();

        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                self.speech.pause(self.timings.chunk_pause);
            }
            self.speech.say(normalize_banner_ko(chunk));
        }
    }

    async fn proceed_to_next_target(&self) {
        let queue = self.state.borrow().cart_guide_queue.clone();
        if queue.is_empty() {
            self.update(|s| {
                s.cart_guide_target = None;
                s.show_cart_guide_prompt = false;
            });
            return;
        }

        let rest: Vec<String> = queue.into_iter().skip(1).collect();
        let next = rest.first().cloned();

        tokio::time::sleep(self.timings.banner).await;
        self.update(|s| {
            s.banner = None;
            s.show_cart_guide_prompt = next.is_some();
            s.cart_guide_target = next;
            s.cart_guide_queue = rest;
        });
    }

    async fn analyze_frame(&self) -> Option<NavGuidance> {
        let frame = self.frames.next_frame().await?;
        match self.vision.analyze(&frame).await {
            Ok(response) => response.as_ref().map(NavGuidance::from_response),
            Err(e) => {
                tracing::error!("🧭 Vision analyze failed: {}", e);
                None
            }
        }
    }

    async fn nav_guide_step(&self) -> Option<NavGuidance> {
        let Some(frame) = self.frames.next_frame().await else {
            self.speech.say("카메라 프레임을 가져올 수 없습니다.");
            return None;
        };

        let guidance = match self.vision.analyze(&frame).await {
            Ok(response) => response.as_ref().map(NavGuidance::from_response),
            Err(e) => {
                tracing::error!("🧭 Vision analyze failed: {}", e);
                None
            }
        };
        self.publish_guidance(guidance.as_ref());

        if let Some(hint) = guidance.as_ref().and_then(|g| g.tts_hint.as_deref()) {
            self.speech.say(hint);
        }
        guidance
    }

    async fn guide_loop(&self) {
        self.speech
            .say("길 안내를 시작합니다. 카메라를 천천히 움직여 주세요.");

        while self.state.borrow().mode == ScanMode::Guide {
            let guidance = self.analyze_frame().await;
            self.publish_guidance(guidance.as_ref());

            if let Some(hint) = guidance.and_then(|g| g.tts_hint) {
                let mut last = lock(&self.last_nav_hint);
                if last.as_deref() != Some(hint.as_str()) {
                    self.speech.say(hint.clone());
                    *last = Some(hint);
                }
            }

            tokio::time::sleep(self.timings.guide_poll).await;
        }
    }

    fn publish_guidance(&self, guidance: Option<&NavGuidance>) {
        self.update(|s| {
            s.nav_summary = guidance.and_then(|g| g.summary.clone());
            s.nav_actions = guidance.map(|g| g.actions.clone()).unwrap_or_default();
        });
    }
}

fn direction_of(result: Option<&LocationSearchResult>) -> Option<String> {
    let result = result?;
    let bucket = result.target.as_ref().and_then(|t| t.direction_bucket.clone());
    let is_direction_case = result
        .case_type
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case("DIRECTION"));

    match bucket {
        Some(raw) => Some(raw),
        // still a direction turn: wait it out without speaking
        None if is_direction_case => {
            tracing::warn!("🎯 DIRECTION answer without a bucket");
            Some(String::new())
        }
        None => None,
    }
}

/// `Some(info)` when the answer means the product is in view.
fn recognized_info(result: Option<&LocationSearchResult>) -> Option<Option<ProductInfo>> {
    let result = result?;
    let case = result.case_type.as_deref().unwrap_or_default().to_uppercase();
    let named = result.info.as_ref().is_some_and(|i| i.name.is_some());

    (RECOGNIZED_CASES.contains(&case.as_str()) || named).then(|| result.info.clone())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
