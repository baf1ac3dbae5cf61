use super::client::{ApiClient, ApiRequest};
use crate::domain::model::{Allergy, AllergyItem, AllergyRequest, AllergySearchItem, ApiEnvelope, ItemList};
use crate::domain::ports::AllergyRepository;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

const ALLERGY_PATH: &str = "api/v1/allergy";

pub struct HttpAllergyRepository {
    client: Arc<ApiClient>,
}

impl HttpAllergyRepository {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AllergyRepository for HttpAllergyRepository {
    async fn list(&self) -> Result<Vec<Allergy>> {
        let response = self.client.execute(&ApiRequest::get(ALLERGY_PATH)).await?;
        if !response.is_success() {
            tracing::error!("getAllergies failed: HTTP {}", response.status);
            return Ok(Vec::new());
        }

        let envelope: ApiEnvelope<ItemList<AllergyItem>> = response.json()?;
        let allergies: Vec<Allergy> = envelope
            .into_payload()
            .map(|list| list.items.into_iter().map(Allergy::from).collect())
            .unwrap_or_default();
        tracing::debug!("🥜 Loaded {} allergies", allergies.len());
        Ok(allergies)
    }

    async fn search(&self, query: &str) -> Result<Vec<Allergy>> {
        let keyword = query.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }

        let request = ApiRequest::get("api/v1/allergy/search").segment(keyword);
        let response = self.client.execute(&request).await?;
        if !response.is_success() {
            tracing::error!("searchAllergies failed: HTTP {}", response.status);
            return Ok(Vec::new());
        }

        let envelope: ApiEnvelope<ItemList<AllergySearchItem>> = response.json()?;
        Ok(envelope
            .into_payload()
            .map(|list| list.items.into_iter().map(Allergy::from).collect())
            .unwrap_or_default())
    }

    async fn add(&self, allergy_list_id: i64) -> Result<()> {
        tracing::debug!("🥜 Adding allergyListId {}", allergy_list_id);
        let request = ApiRequest::post(ALLERGY_PATH).json(&AllergyRequest {
            allergy_id: allergy_list_id,
        })?;
        self.client.execute(&request).await?.error_for_status()?;
        Ok(())
    }

    async fn delete(&self, allergy_list_id: i64) -> Result<()> {
        tracing::debug!("🥜 Deleting allergyListId {}", allergy_list_id);
        let request = ApiRequest::delete(ALLERGY_PATH).json(&AllergyRequest {
            allergy_id: allergy_list_id,
        })?;
        self.client.execute(&request).await?.error_for_status()?;
        Ok(())
    }
}
