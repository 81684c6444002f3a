use crate::domain::model::HealthStatus;
use crate::utils::error::{ApiError, Result};
use crate::utils::validation::validate_url;
use std::time::Duration;

/// 呼叫健康檢查端點並解析回應
pub async fn probe_health(url: &str, timeout: Duration) -> Result<HealthStatus> {
    validate_url("probe.url", url, &["http", "https"])?;

    let client = reqwest::Client::builder().timeout(timeout).build()?;
    tracing::debug!("🔍 Probing {}", url);
    let response = client.get(url).send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::UnhealthyResponse {
            url: url.to_string(),
            details: format!("HTTP {}: {}", status, body),
        });
    }

    let health: HealthStatus = response.json().await?;
    tracing::info!("✅ {} answered {:?}", url, health.status);
    Ok(health)
}
