use super::client::{ApiClient, ApiRequest, FormPart};
use crate::domain::model::{
    ApiEnvelope, Frame, LocationSearchResult, ShelfSearchResult, VisionAnalyzeResponse,
};
use crate::domain::ports::ProductVision;
use crate::utils::error::{LookeyError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Shelf search, product location and navigation analysis endpoints.
pub struct HttpProductVision {
    client: Arc<ApiClient>,
}

impl HttpProductVision {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProductVision for HttpProductVision {
    async fn shelf_search(&self, frame: &Frame) -> Result<ApiEnvelope<ShelfSearchResult>> {
        self.client.ensure_token()?;

        let request = ApiRequest::post("api/v1/product/search").multipart(vec![FormPart::jpeg(
            "file",
            &frame.file_name,
            &frame.bytes,
        )]);
        let response = self.client.execute(&request).await?.error_for_status()?;
        let envelope: ApiEnvelope<ShelfSearchResult> = response.json()?;
        tracing::debug!("🛍️ Shelf search: {:?}", envelope.payload());
        Ok(envelope)
    }

    async fn locate(
        &self,
        frame: &Frame,
        product_name: &str,
    ) -> Result<ApiEnvelope<LocationSearchResult>> {
        self.client.ensure_token()?;

        let request = ApiRequest::post("api/v1/product/search/location").multipart(vec![
            FormPart::jpeg("current_frame", &frame.file_name, &frame.bytes),
            FormPart::text("product_name", product_name),
        ]);
        let response = self.client.execute(&request).await?;
        if !response.is_success() {
            return Err(LookeyError::api_status(
                response.endpoint,
                response.status,
                "Location API failed",
            ));
        }
        let envelope: ApiEnvelope<LocationSearchResult> = response.json()?;
        tracing::debug!("🎯 Location search for {}: {:?}", product_name, envelope.payload());
        Ok(envelope)
    }

    async fn analyze(&self, frame: &Frame) -> Result<Option<VisionAnalyzeResponse>> {
        let request = ApiRequest::post("api/v1/vision/ai/analyze")
            .without_auth()
            .multipart(vec![FormPart::jpeg("file", &frame.file_name, &frame.bytes)]);
        let response = self.client.execute(&request).await?;
        if !response.is_success() {
            tracing::warn!("🧭 Vision analyze failed: HTTP {}", response.status);
            return Ok(None);
        }
        Ok(Some(response.json()?))
    }
}
