use crate::core::formatter::normalize_tts_ko;
use crate::domain::ports::SpeechSink;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// Timing model for the speech worker.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechPacing {
    pub base: Duration,
    pub per_char: Duration,
    pub min: Duration,
    pub max: Duration,
    /// Extra quiet time after an utterance before the camera may be used.
    pub gap: Duration,
    pub honor_pauses: bool,
}

impl Default for SpeechPacing {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(700),
            per_char: Duration::from_millis(110),
            min: Duration::from_millis(1200),
            max: Duration::from_millis(8000),
            gap: Duration::from_millis(250),
            honor_pauses: true,
        }
    }
}

impl SpeechPacing {
    /// No waiting at all, for tests and batch runs.
    pub fn immediate() -> Self {
        Self {
            base: Duration::ZERO,
            per_char: Duration::ZERO,
            min: Duration::ZERO,
            max: Duration::ZERO,
            gap: Duration::ZERO,
            honor_pauses: false,
        }
    }

    pub fn estimate(&self, text: &str) -> Duration {
        let chars = text.chars().count() as u32;
        // max wins over min when they are inverted
        (self.base + self.per_char * chars).max(self.min).min(self.max)
    }
}

#[derive(Debug)]
enum SpeechItem {
    Say(String),
    Pause(Duration),
    Flush(oneshot::Sender<()>),
}

/// FIFO of utterances played one at a time by a single worker task.
pub struct SpeechQueue {
    tx: mpsc::UnboundedSender<SpeechItem>,
    sink: Arc<dyn SpeechSink>,
    cooldown_until: Arc<Mutex<Instant>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SpeechQueue {
    pub fn spawn(sink: Arc<dyn SpeechSink>, pacing: SpeechPacing) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cooldown_until = Arc::new(Mutex::new(Instant::now()));

        let worker = tokio::spawn(run_worker(
            rx,
            sink.clone(),
            pacing,
            cooldown_until.clone(),
        ));

        Self {
            tx,
            sink,
            cooldown_until,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn say(&self, text: impl Into<String>) {
        if self.tx.send(SpeechItem::Say(text.into())).is_err() {
            tracing::debug!("🔇 Speech worker stopped, dropping utterance");
        }
    }

    pub fn pause(&self, duration: Duration) {
        let _ = self.tx.send(SpeechItem::Pause(duration));
    }

    /// Resolves once everything queued before this call has been spoken.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(SpeechItem::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    pub fn cooldown_remaining(&self) -> Duration {
        lock(&self.cooldown_until).saturating_duration_since(Instant::now())
    }

    /// Keeps the cooldown running for at least `duration` from now.
    pub fn extend_cooldown(&self, duration: Duration) {
        let mut until = lock(&self.cooldown_until);
        let candidate = Instant::now() + duration;
        if candidate > *until {
            *until = candidate;
        }
    }

    pub fn shutdown(&self) {
        if let Some(worker) = lock(&self.worker).take() {
            worker.abort();
        }
        self.sink.stop();
    }
}

impl Drop for SpeechQueue {
    fn drop(&mut self) {
        if let Some(worker) = lock(&self.worker).take() {
            worker.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<SpeechItem>,
    sink: Arc<dyn SpeechSink>,
    pacing: SpeechPacing,
    cooldown_until: Arc<Mutex<Instant>>,
) {
    let mut last: Option<String> = None;

    while let Some(item) = rx.recv().await {
        match item {
            SpeechItem::Pause(duration) => {
                if pacing.honor_pauses && !duration.is_zero() {
                    tokio::time::sleep(duration).await;
                }
            }
            SpeechItem::Flush(done) => {
                let _ = done.send(());
            }
            SpeechItem::Say(text) => {
                let normalized = normalize_tts_ko(&text).trim().to_string();
                if normalized.is_empty() || last.as_deref() == Some(normalized.as_str()) {
                    continue;
                }

                let spoken = with_terminal_pause(&normalized);
                tracing::debug!("🔊 {}", normalized);
                sink.speak(&spoken);
                last = Some(normalized);

                let estimate = pacing.estimate(&spoken);
                *lock(&cooldown_until) = Instant::now() + estimate + pacing.gap;
                if !estimate.is_zero() {
                    tokio::time::sleep(estimate).await;
                }
            }
        }
    }
}

/// Ends the sentence so engines do not clip the last syllable.
fn with_terminal_pause(text: &str) -> String {
    if text.ends_with(['.', '!', '?', '…']) {
        format!("{}{}", text, ZERO_WIDTH_SPACE)
    } else {
        format!("{}.{}", text, ZERO_WIDTH_SPACE)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub spoken: Mutex<Vec<String>>,
        pub stops: Mutex<usize>,
    }

    impl RecordingSink {
        pub fn lines(&self) -> Vec<String> {
            lock(&self.spoken).clone()
        }
    }

    impl SpeechSink for RecordingSink {
        fn speak(&self, text: &str) {
            lock(&self.spoken).push(text.to_string());
        }

        fn stop(&self) {
            *lock(&self.stops) += 1;
        }
    }

    #[test]
    fn test_estimate_is_clamped() {
        let pacing = SpeechPacing::default();
        assert_eq!(pacing.estimate("네"), Duration::from_millis(1200));
        assert_eq!(pacing.estimate("가나다라마바사아자차"), Duration::from_millis(1800));
        assert_eq!(pacing.estimate(&"가".repeat(200)), Duration::from_millis(8000));
        assert_eq!(SpeechPacing::immediate().estimate("아무 말"), Duration::ZERO);
    }

    #[test]
    fn test_estimate_with_inverted_bounds() {
        let pacing = SpeechPacing {
            min: Duration::from_millis(9000),
            ..SpeechPacing::default()
        };
        assert_eq!(pacing.estimate("네"), Duration::from_millis(8000));
    }

    #[test]
    fn test_terminal_pause() {
        assert_eq!(with_terminal_pause("안녕"), "안녕.\u{200B}");
        assert_eq!(with_terminal_pause("찾았습니다!"), "찾았습니다!\u{200B}");
        assert_eq!(with_terminal_pause("정말?"), "정말?\u{200B}");
    }

    #[tokio::test]
    async fn test_fifo_with_dedupe() {
        let sink = Arc::new(RecordingSink::default());
        let queue = SpeechQueue::spawn(sink.clone(), SpeechPacing::immediate());

        queue.say("콜라 500ml");
        queue.say("콜라 500ml");
        queue.say("   ");
        queue.pause(Duration::from_millis(350));
        queue.say("다음 상품");
        queue.say("콜라 500ml");
        queue.flush().await;

        assert_eq!(
            sink.lines(),
            vec![
                "콜라 500 밀리리터.\u{200B}",
                "다음 상품.\u{200B}",
                "콜라 500 밀리리터.\u{200B}"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_follows_estimate() {
        let sink = Arc::new(RecordingSink::default());
        let queue = SpeechQueue::spawn(sink.clone(), SpeechPacing::default());
        assert_eq!(queue.cooldown_remaining(), Duration::ZERO);

        queue.say("네");
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        // "네.\u{200B}" is three chars: clamped to 1200ms, plus the 250ms gap
        assert_eq!(queue.cooldown_remaining(), Duration::from_millis(1450));

        queue.extend_cooldown(Duration::from_secs(5));
        assert_eq!(queue.cooldown_remaining(), Duration::from_secs(5));

        queue.flush().await;
        assert_eq!(sink.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_sink_and_worker() {
        let sink = Arc::new(RecordingSink::default());
        let queue = SpeechQueue::spawn(sink.clone(), SpeechPacing::immediate());
        queue.shutdown();
        assert_eq!(*lock(&sink.stops), 1);

        queue.say("무시됨");
        tokio::task::yield_now().await;
        assert!(sink.lines().is_empty());
    }
}
