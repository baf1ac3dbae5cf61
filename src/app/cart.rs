use crate::domain::model::{CartLine, ProductItem};
use crate::domain::ports::{CartPort, CartRepository};
use crate::utils::error::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartState {
    pub lines: Vec<CartLine>,
    pub results: Vec<ProductItem>,
}

/// Shopping cart backed by the carts API. One line per product.
pub struct CartController {
    repo: Arc<dyn CartRepository>,
    state: watch::Sender<CartState>,
}

impl CartController {
    pub fn new(repo: Arc<dyn CartRepository>) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self { repo, state }
    }

    pub fn state(&self) -> CartState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }

    pub async fn load(&self) -> Result<Vec<CartLine>> {
        match self.repo.list().await {
            Ok(lines) => {
                tracing::debug!("🛒 Loaded cart: {} lines", lines.len());
                self.state.send_modify(|s| s.lines = lines.clone());
                Ok(lines)
            }
            Err(e) => {
                tracing::error!("🛒 Cart load failed: {}", e);
                self.state.send_modify(|s| s.lines.clear());
                Err(e)
            }
        }
    }

    pub async fn search(&self, keyword: &str) -> Result<Vec<ProductItem>> {
        match self.repo.search(keyword).await {
            Ok(items) => {
                let items = items.unwrap_or_default();
                self.state.send_modify(|s| s.results = items.clone());
                Ok(items)
            }
            Err(e) => {
                tracing::error!("🛒 Product search failed: {}", e);
                self.state.send_modify(|s| s.results.clear());
                Err(e)
            }
        }
    }

    /// Adds a product and refreshes the cart from the server on success.
    pub async fn add(&self, product_id: i64) -> Result<bool> {
        let added = self.repo.add(product_id).await?;
        if added {
            self.load().await?;
        } else {
            tracing::warn!("🛒 Server refused to add product {}", product_id);
        }
        Ok(added)
    }

    pub async fn remove(&self, cart_id: i64) -> Result<bool> {
        let removed = self.repo.remove(cart_id).await?;
        if removed {
            self.state
                .send_modify(|s| s.lines.retain(|line| line.cart_id != Some(cart_id)));
        }
        Ok(removed)
    }
}

/// NFC composed, lowercased, with all whitespace removed.
pub fn normalize_name(name: &str) -> String {
    name.nfc()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl CartPort for CartController {
    fn is_in_cart(&self, name: &str) -> bool {
        let wanted = normalize_name(name);
        self.state
            .borrow()
            .lines
            .iter()
            .filter_map(|line| line.name.as_deref())
            .any(|n| normalize_name(n) == wanted)
    }

    /// Drops the matching line locally and removes it on the server in the background.
    fn remove(&self, line: &CartLine) {
        let wanted = line.name.as_deref().map(normalize_name);
        let mut removed_id = None;

        self.state.send_modify(|s| {
            if let Some(pos) = s.lines.iter().position(|l| {
                (line.cart_id.is_some() && l.cart_id == line.cart_id)
                    || (wanted.is_some() && l.name.as_deref().map(normalize_name) == wanted)
            }) {
                removed_id = s.lines.remove(pos).cart_id;
            }
        });

        let Some(cart_id) = removed_id else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("🛒 No runtime to remove cart line {}", cart_id);
            return;
        };
        let repo = self.repo.clone();
        runtime.spawn(async move {
            match repo.remove(cart_id).await {
                Ok(true) => tracing::info!("🛒 Removed found product from cart ({})", cart_id),
                Ok(false) => tracing::warn!("🛒 Server kept cart line {}", cart_id),
                Err(e) => tracing::error!("🛒 Cart removal failed: {}", e),
            }
        });
    }

    fn names_snapshot(&self) -> Vec<String> {
        self.state
            .borrow()
            .lines
            .iter()
            .filter_map(|line| line.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::CartItem;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCart {
        items: Mutex<Vec<CartItem>>,
        removed: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl CartRepository for FakeCart {
        async fn list(&self) -> Result<Vec<CartLine>> {
            Ok(self.items.lock().unwrap().iter().cloned().map(CartLine::from).collect())
        }

        async fn search(&self, keyword: &str) -> Result<Option<Vec<ProductItem>>> {
            if keyword == "없음" {
                return Ok(None);
            }
            Ok(Some(vec![ProductItem {
                product_id: 11,
                product_name: format!("{} 500ml", keyword),
            }]))
        }

        async fn add(&self, product_id: i64) -> Result<bool> {
            let mut items = self.items.lock().unwrap();
            let cart_id = items.len() as i64 + 1;
            items.push(CartItem {
                cart_id,
                product_id,
                product_name: "코카콜라 제로 500ml".to_string(),
            });
            Ok(true)
        }

        async fn remove(&self, cart_id: i64) -> Result<bool> {
            self.removed.lock().unwrap().push(cart_id);
            self.items.lock().unwrap().retain(|i| i.cart_id != cart_id);
            Ok(true)
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(" Coca Cola\t제로 "), "cocacola제로");
    }

    #[test]
    fn test_normalize_name_composes_hangul() {
        let decomposed: String = "바나나우유".nfd().collect();
        assert_ne!(decomposed, "바나나우유");
        assert_eq!(normalize_name(&decomposed), "바나나우유");
        assert_eq!(normalize_name(&decomposed), normalize_name("바나나 우유"));
    }

    #[tokio::test]
    async fn test_add_reloads_and_matches_names() {
        let controller = CartController::new(Arc::new(FakeCart::default()));
        assert!(controller.add(11).await.unwrap());

        assert_eq!(controller.state().lines.len(), 1);
        assert!(controller.is_in_cart("코카콜라제로 500ML"));
        assert!(!controller.is_in_cart("펩시"));
        let decomposed: String = "코카콜라 제로 500ml".nfd().collect();
        assert!(controller.is_in_cart(&decomposed));
        assert_eq!(controller.names_snapshot(), vec!["코카콜라 제로 500ml"]);
    }

    #[tokio::test]
    async fn test_search_none_is_empty() {
        let controller = CartController::new(Arc::new(FakeCart::default()));
        assert!(controller.search("없음").await.unwrap().is_empty());
        assert_eq!(controller.search("콜라").await.unwrap().len(), 1);
        assert_eq!(controller.state().results.len(), 1);
    }

    #[tokio::test]
    async fn test_port_remove_by_name() {
        let repo = Arc::new(FakeCart::default());
        let controller = CartController::new(repo.clone());
        controller.add(11).await.unwrap();

        CartPort::remove(&controller, &CartLine::named("코카콜라 제로 500ML"));
        assert!(controller.state().lines.is_empty());

        for _ in 0..10 {
            if !repo.removed.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(*repo.removed.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_remove_by_id() {
        let controller = CartController::new(Arc::new(FakeCart::default()));
        controller.add(11).await.unwrap();
        assert!(controller.remove(1).await.unwrap());
        assert!(controller.state().lines.is_empty());
    }
}
