use super::client::{ApiClient, ApiRequest};
use crate::domain::model::{ApiEnvelope, Coordinates, ItemList, Place};
use crate::domain::ports::PlaceRepository;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub struct HttpPlaceRepository {
    client: Arc<ApiClient>,
}

impl HttpPlaceRepository {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PlaceRepository for HttpPlaceRepository {
    async fn nearby(&self, at: Coordinates) -> Result<Vec<Place>> {
        let request = ApiRequest::get("api/v1/path")
            .query("lat", at.lat)
            .query("lng", at.lng);
        let response = self.client.execute(&request).await?.error_for_status()?;
        let envelope: ApiEnvelope<ItemList<Place>> = response.json()?;
        Ok(envelope.into_payload().map(|list| list.items).unwrap_or_default())
    }
}
