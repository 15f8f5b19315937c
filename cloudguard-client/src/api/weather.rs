use cloudguard_api::models::WeatherResponse;

use super::ApiClient;
use crate::error::Result;

impl ApiClient {
    pub async fn weather(&self, latitude: f64, longitude: f64) -> Result<WeatherResponse> {
        let url = self.url(&format!(
            "/weather?latitude={latitude}&longitude={longitude}"
        ));
        let response = self.send_authorized(|| self.http.get(&url)).await?;

        Self::decode(response).await
    }
}
