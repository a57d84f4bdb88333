//! HTTP client for a running installer server.

use async_trait::async_trait;
use reqwest::Url;
use webinstall_common::{InstallStep, StepParams, StepResponse};

use super::StepClient;
use crate::errors::TransportError;

pub struct HttpClient {
    client: reqwest::Client,
    base: Url,
}

impl HttpClient {
    /// `base` is the server root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base: &str) -> Result<Self, TransportError> {
        let mut base = Url::parse(base).map_err(|e| TransportError::Request {
            url: base.to_string(),
            message: e.to_string(),
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base,
        })
    }

    pub fn step_url(&self, step: InstallStep) -> Result<Url, TransportError> {
        self.base
            .join(&format!("api/install/{}", step.name()))
            .map_err(|e| TransportError::Request {
                url: self.base.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl StepClient for HttpClient {
    async fn invoke(
        &self,
        step: InstallStep,
        params: &StepParams,
    ) -> Result<StepResponse, TransportError> {
        let url = self.step_url(step)?;
        let resp = self
            .client
            .post(url.clone())
            .json(params)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| TransportError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        // Error statuses still carry a step response when the server produced one.
        match serde_json::from_slice::<StepResponse>(&body) {
            Ok(response) => Ok(response),
            Err(_) if !status.is_success() => Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
            Err(e) => Err(TransportError::Decode(e.to_string())),
        }
    }
}
