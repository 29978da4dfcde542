//! Typed HTTP client for the patient-facing app.
//!
//! There is no process-wide session: callers build an `ApiSession` and hand
//! it to `PainTrackClient`, which keeps it for every request.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::api::endpoints::health::HealthResponse;
use crate::api::endpoints::patients::{NewPainLog, NewStatusLog, PatientUpdateResponse};
use crate::api::endpoints::physicians::PhysicianAlertsResponse;
use crate::api::error::ErrorBody;
use crate::models::{Alert, Patient};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where to reach the server and who the caller is.
#[derive(Debug, Clone)]
pub struct ApiSession {
    pub base_url: String,
    pub token: String,
}

impl ApiSession {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Cannot reach server at {0}")]
    Connection(String),
    #[error("HTTP error: {0}")]
    Transport(String),
    #[error("Server returned {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("Unexpected response payload: {0}")]
    UnexpectedPayload(String),
}

pub struct PainTrackClient {
    session: ApiSession,
    http: reqwest::Client,
}

impl PainTrackClient {
    pub fn new(session: ApiSession) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self { session, http })
    }

    pub fn session(&self) -> &ApiSession {
        &self.session
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let request = self.http.get(self.url("/api/health"));
        self.execute(request).await
    }

    pub async fn fetch_patient(&self, patient_id: &Uuid) -> Result<Patient, ClientError> {
        let request = self.authed(self.http.get(self.url(&format!("/api/patients/{patient_id}"))));
        self.execute(request).await
    }

    /// Replace the stored patient record. The server reconciles alerts.
    pub async fn update_patient(&self, patient: &Patient) -> Result<PatientUpdateResponse, ClientError> {
        let url = self.url(&format!("/api/patients/{}", patient.id));
        self.send_json(self.http.put(url), patient).await
    }

    pub async fn record_pain_log(
        &self,
        patient_id: &Uuid,
        entry: &NewPainLog,
    ) -> Result<PatientUpdateResponse, ClientError> {
        let url = self.url(&format!("/api/patients/{patient_id}/pain-logs"));
        self.send_json(self.http.post(url), entry).await
    }

    pub async fn record_status_log(
        &self,
        patient_id: &Uuid,
        entry: &NewStatusLog,
    ) -> Result<PatientUpdateResponse, ClientError> {
        let url = self.url(&format!("/api/patients/{patient_id}/status-logs"));
        self.send_json(self.http.post(url), entry).await
    }

    pub async fn physician_alerts(&self, physician_id: &Uuid) -> Result<Vec<Alert>, ClientError> {
        let url = self.url(&format!("/api/physicians/{physician_id}/alerts"));
        let response: PhysicianAlertsResponse = self.execute(self.authed(self.http.get(url))).await?;
        Ok(response.alerts)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.session.base_url, path)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.session.token)
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        body: &B,
    ) -> Result<T, ClientError> {
        self.execute(self.authed(request).json(body)).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                ClientError::Connection(self.session.base_url.clone())
            } else {
                ClientError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => (body.error.code, body.error.message),
                Err(_) => ("UNKNOWN".to_string(), text),
            };
            tracing::warn!(status = status.as_u16(), %code, "API request failed");
            return Err(ClientError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::UnexpectedPayload(e.to_string()))
    }
}
