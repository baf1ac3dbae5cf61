use crate::domain::model::Allergy;
use crate::domain::ports::AllergyRepository;
use crate::utils::error::LookeyError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllergyState {
    pub loading: bool,
    pub my_allergies: Vec<Allergy>,
    pub suggestions: Vec<Allergy>,
    pub query: String,
    pub message: Option<String>,
}

/// Keeps the user's allergy list and the catalogue search in sync with the API.
pub struct AllergyController {
    repo: Arc<dyn AllergyRepository>,
    state: watch::Sender<AllergyState>,
    in_flight: Mutex<Option<String>>,
    generation: AtomicU64,
}

impl AllergyController {
    pub fn new(repo: Arc<dyn AllergyRepository>) -> Self {
        let (state, _) = watch::channel(AllergyState::default());
        Self {
            repo,
            state,
            in_flight: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> AllergyState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AllergyState> {
        self.state.subscribe()
    }

    pub async fn load(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.message = None;
        });
        self.reload().await;
    }

    pub fn update_query(&self, query: &str) {
        self.state.send_modify(|s| s.query = query.to_string());
    }

    /// Searches the catalogue with `query`, or with the stored query if `None`.
    pub async fn search(&self, query: Option<&str>) {
        let query = query
            .map(str::to_string)
            .unwrap_or_else(|| self.state.borrow().query.clone())
            .trim()
            .to_string();
        self.state.send_modify(|s| s.query = query.clone());

        if query.is_empty() {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *self.lock_in_flight() = None;
            self.state.send_modify(|s| s.suggestions.clear());
            return;
        }

        {
            let mut in_flight = self.lock_in_flight();
            if in_flight.as_deref() == Some(query.as_str()) {
                tracing::debug!("🥜 Search for '{}' already running", query);
                return;
            }
            *in_flight = Some(query.clone());
        }

        // a newer search supersedes this one
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = SearchGuard {
            owner: self,
            generation,
        };
        self.state.send_modify(|s| {
            s.loading = true;
            s.message = None;
        });

        let result = self.repo.search(&query).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }

        match result {
            Ok(list) => self.state.send_modify(|s| {
                s.loading = false;
                s.suggestions = list;
                s.message = None;
            }),
            Err(e) => {
                tracing::error!("🥜 Allergy search failed: {}", e);
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.suggestions.clear();
                    s.message = Some(clean_message(&e));
                });
            }
        }
    }

    pub async fn add(&self, allergy_list_id: i64) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.message = None;
        });

        match self.repo.add(allergy_list_id).await {
            Ok(()) => {
                tracing::info!("🥜 Added allergy {}", allergy_list_id);
                self.state.send_modify(|s| {
                    s.suggestions.clear();
                    s.query.clear();
                });
                self.reload().await;
            }
            Err(e) => self.fail("add", &e),
        }
    }

    pub async fn delete(&self, allergy_list_id: i64) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.message = None;
        });

        match self.repo.delete(allergy_list_id).await {
            Ok(()) => {
                tracing::info!("🥜 Deleted allergy {}", allergy_list_id);
                self.reload().await;
            }
            Err(e) => self.fail("delete", &e),
        }
    }

    /// Takes the pending user message, if any.
    pub fn consume_message(&self) -> Option<String> {
        let mut taken = None;
        self.state.send_modify(|s| taken = s.message.take());
        taken
    }

    async fn reload(&self) {
        match self.repo.list().await {
            Ok(list) => {
                tracing::debug!("🥜 {} allergies loaded", list.len());
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.my_allergies = list;
                });
            }
            Err(e) => self.fail("list", &e),
        }
    }

    fn fail(&self, operation: &str, error: &LookeyError) {
        tracing::error!("🥜 Allergy {} failed: {}", operation, error);
        self.state.send_modify(|s| {
            s.loading = false;
            s.message = Some(clean_message(error));
        });
    }

    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Releases the in-flight slot when a search finishes or its future is dropped.
struct SearchGuard<'a> {
    owner: &'a AllergyController,
    generation: u64,
}

impl Drop for SearchGuard<'_> {
    fn drop(&mut self) {
        if self.owner.generation.load(Ordering::SeqCst) != self.generation {
            return;
        }
        *self.owner.lock_in_flight() = None;
        self.owner.state.send_if_modified(|s| std::mem::replace(&mut s.loading, false));
    }
}

/// 5xx bodies are HTML error pages; show a friendly line instead.
fn clean_message(error: &LookeyError) -> String {
    if error.is_server_error() {
        error.user_friendly_message()
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::Result;
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeAllergies {
        mine: Mutex<Vec<Allergy>>,
        fail_add_with: Option<u16>,
        search_delay: Option<Duration>,
    }

    fn allergy(id: i64, name: &str) -> Allergy {
        Allergy {
            id,
            allergy_list_id: id,
            name: name.to_string(),
        }
    }

    #[async_trait]
    impl AllergyRepository for FakeAllergies {
        async fn list(&self) -> Result<Vec<Allergy>> {
            Ok(self.mine.lock().unwrap().clone())
        }

        async fn search(&self, query: &str) -> Result<Vec<Allergy>> {
            if let Some(delay) = self.search_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(["우유", "땅콩", "대두"]
                .iter()
                .enumerate()
                .filter(|(_, name)| name.contains(query))
                .map(|(i, name)| allergy(i as i64 + 1, name))
                .collect())
        }

        async fn add(&self, allergy_list_id: i64) -> Result<()> {
            if let Some(status) = self.fail_add_with {
                return Err(LookeyError::api_status("api/v1/allergy", status, "<html>oops</html>"));
            }
            self.mine.lock().unwrap().push(allergy(allergy_list_id, "땅콩"));
            Ok(())
        }

        async fn delete(&self, allergy_list_id: i64) -> Result<()> {
            self.mine.lock().unwrap().retain(|a| a.allergy_list_id != allergy_list_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_search_and_add_flow() {
        let controller = AllergyController::new(Arc::new(FakeAllergies::default()));
        controller.load().await;
        assert!(controller.state().my_allergies.is_empty());

        controller.update_query("  땅콩 ");
        controller.search(None).await;
        let state = controller.state();
        assert_eq!(state.query, "땅콩");
        assert_eq!(state.suggestions, vec![allergy(2, "땅콩")]);

        controller.add(2).await;
        let state = controller.state();
        assert!(state.suggestions.is_empty());
        assert!(state.query.is_empty());
        assert_eq!(state.my_allergies.len(), 1);
        assert!(!state.loading);

        controller.delete(2).await;
        assert!(controller.state().my_allergies.is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_clears_suggestions() {
        let controller = AllergyController::new(Arc::new(FakeAllergies::default()));
        controller.search(Some("우")).await;
        assert_eq!(controller.state().suggestions.len(), 1);

        controller.search(Some("   ")).await;
        assert!(controller.state().suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_message_is_friendly() {
        let controller = AllergyController::new(Arc::new(FakeAllergies {
            fail_add_with: Some(503),
            ..Default::default()
        }));
        controller.add(1).await;
        assert_eq!(
            controller.consume_message().as_deref(),
            Some("서버가 잠시 불안정해요. 잠시 후 다시 시도해주세요.")
        );
        assert!(controller.consume_message().is_none());
        assert!(!controller.state().loading);
    }

    #[tokio::test]
    async fn test_client_error_message_kept() {
        let controller = AllergyController::new(Arc::new(FakeAllergies {
            fail_add_with: Some(409),
            ..Default::default()
        }));
        controller.add(1).await;
        let message = controller.consume_message().unwrap();
        assert!(message.contains("409"));
    }

    #[tokio::test]
    async fn test_cancelled_search_does_not_block_retry() {
        let controller = AllergyController::new(Arc::new(FakeAllergies {
            search_delay: Some(Duration::from_millis(200)),
            ..Default::default()
        }));

        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), controller.search(Some("땅콩"))).await;
        assert!(cancelled.is_err());
        assert!(!controller.state().loading);

        controller.search(Some("땅콩")).await;
        let state = controller.state();
        assert!(!state.loading);
        assert_eq!(state.suggestions, vec![allergy(2, "땅콩")]);
    }
}
