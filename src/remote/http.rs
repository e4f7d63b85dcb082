//! JSON-over-HTTP worker client
//!
//! Endpoints, relative to the worker URL:
//! - `POST /pipelines` submit, answers `{"id": "..."}`
//! - `GET /pipelines/{id}/status?rows=<bool>`
//! - `POST /pipelines/{id}/abort`
//! - `POST /pipelines/{id}/cleanup`
//! - `POST /sockets/release`

use super::{RemoteHandle, SubmitRequest, TrustStore, WorkerClient, WorkerError, WorkerStatus};
use crate::model::WorkerDescriptor;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Header carrying the worker's identity key
pub const WORKER_KEY_HEADER: &str = "x-worker-key";

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct ReleaseSocketsRequest<'a> {
    pipeline: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    run_id: Option<&'a str>,
}

pub struct HttpWorkerClient {
    client: Client,
    trust: Arc<TrustStore>,
}

impl HttpWorkerClient {
    pub fn new(timeout: Duration, trust: Arc<TrustStore>) -> Result<Self, WorkerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WorkerError::Protocol {
                worker: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client, trust })
    }

    fn url(worker: &WorkerDescriptor, path: &str) -> String {
        format!("{}{}", worker.url.trim_end_matches('/'), path)
    }

    fn authorize(worker: &WorkerDescriptor, request: RequestBuilder) -> RequestBuilder {
        match &worker.username {
            Some(user) => request.basic_auth(user, worker.password.as_deref()),
            None => request,
        }
    }

    async fn send(
        &self,
        worker: &WorkerDescriptor,
        request: RequestBuilder,
    ) -> Result<Response, WorkerError> {
        let response = Self::authorize(worker, request)
            .send()
            .await
            .map_err(|e| WorkerError::unreachable(worker, e.to_string()))?;

        if let Some(key) = response.headers().get(WORKER_KEY_HEADER) {
            let key = key.to_str().map_err(|_| WorkerError::Protocol {
                worker: worker.name.clone(),
                message: format!("{} header is not valid text", WORKER_KEY_HEADER),
            })?;
            self.trust.verify(&worker.name, &worker.url, key)?;
        }

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WorkerError::Rejected {
                worker: worker.name.clone(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn json<T: for<'de> Deserialize<'de>>(
        worker: &WorkerDescriptor,
        response: Response,
    ) -> Result<T, WorkerError> {
        response.json().await.map_err(|e| WorkerError::Protocol {
            worker: worker.name.clone(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl WorkerClient for HttpWorkerClient {
    async fn submit(
        &self,
        worker: &WorkerDescriptor,
        request: &SubmitRequest,
    ) -> Result<RemoteHandle, WorkerError> {
        debug!("Submitting pipeline '{}' to {}", request.pipeline.name, worker);
        let response = self
            .send(
                worker,
                self.client
                    .post(Self::url(worker, "/pipelines"))
                    .json(request),
            )
            .await?;
        let submitted: SubmitResponse = Self::json(worker, response).await?;

        Ok(RemoteHandle {
            id: submitted.id,
            pipeline: request.pipeline.name.clone(),
            worker: worker.clone(),
        })
    }

    async fn status(
        &self,
        handle: &RemoteHandle,
        include_rows: bool,
    ) -> Result<WorkerStatus, WorkerError> {
        trace!("Status request for {}", handle);
        let url = Self::url(&handle.worker, &format!("/pipelines/{}/status", handle.id));
        let response = self
            .send(
                &handle.worker,
                self.client
                    .get(url)
                    .query(&[("rows", include_rows.to_string())]),
            )
            .await?;
        Self::json(&handle.worker, response).await
    }

    async fn abort(&self, handle: &RemoteHandle) -> Result<(), WorkerError> {
        debug!("Aborting {}", handle);
        let url = Self::url(&handle.worker, &format!("/pipelines/{}/abort", handle.id));
        self.send(&handle.worker, self.client.post(url)).await?;
        Ok(())
    }

    async fn cleanup(&self, handle: &RemoteHandle) -> Result<(), WorkerError> {
        debug!("Cleaning up {}", handle);
        let url = Self::url(&handle.worker, &format!("/pipelines/{}/cleanup", handle.id));
        self.send(&handle.worker, self.client.post(url)).await?;
        Ok(())
    }

    async fn release_sockets(
        &self,
        worker: &WorkerDescriptor,
        pipeline: &str,
        run_id: Option<&str>,
    ) -> Result<(), WorkerError> {
        debug!("Releasing sockets of '{}' on {}", pipeline, worker);
        let body = ReleaseSocketsRequest { pipeline, run_id };
        self.send(
            worker,
            self.client
                .post(Self::url(worker, "/sockets/release"))
                .json(&body),
        )
        .await?;
        Ok(())
    }
}
