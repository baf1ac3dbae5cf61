use super::client::{ApiClient, ApiRequest};
use crate::domain::model::{
    ApiEnvelope, CartAddRequest, CartItem, CartLine, CartRemoveRequest, ItemList, ProductItem,
};
use crate::domain::ports::CartRepository;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

const CART_PATH: &str = "api/v1/carts";

pub struct HttpCartRepository {
    client: Arc<ApiClient>,
}

impl HttpCartRepository {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CartRepository for HttpCartRepository {
    async fn list(&self) -> Result<Vec<CartLine>> {
        let response = self.client.execute(&ApiRequest::get(CART_PATH)).await?;
        if !response.is_success() {
            tracing::error!("getCartList failed: HTTP {}", response.status);
            return Ok(Vec::new());
        }

        let envelope: ApiEnvelope<ItemList<CartItem>> = response.json()?;
        Ok(envelope
            .into_payload()
            .map(|list| list.items.into_iter().map(CartLine::from).collect())
            .unwrap_or_default())
    }

    async fn search(&self, keyword: &str) -> Result<Option<Vec<ProductItem>>> {
        let request = ApiRequest::get("api/v1/carts/search").segment(keyword.trim());
        let response = self.client.execute(&request).await?;
        if !response.is_success() {
            tracing::warn!("product search failed: HTTP {}", response.status);
            return Ok(None);
        }

        let envelope: ApiEnvelope<ItemList<ProductItem>> = response.json()?;
        Ok(envelope.into_payload().map(|list| list.items))
    }

    async fn add(&self, product_id: i64) -> Result<bool> {
        let request = ApiRequest::post(CART_PATH).json(&CartAddRequest { product_id })?;
        let response = self.client.execute(&request).await?;
        tracing::debug!("🛒 Add cart response: HTTP {}", response.status);
        Ok(response.is_success())
    }

    async fn remove(&self, cart_id: i64) -> Result<bool> {
        let request = ApiRequest::delete(CART_PATH).json(&CartRemoveRequest { cart_id })?;
        let response = self.client.execute(&request).await?;
        tracing::debug!("🛒 Remove cart response: HTTP {}", response.status);
        Ok(response.is_success())
    }
}
