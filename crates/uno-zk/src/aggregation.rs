//! proof aggregation service client
//!
//! proofs are submitted once and then polled at a fixed interval for a
//! bounded number of attempts. transport errors during polling are retried
//! within the same budget, a rejected job ends polling immediately.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::AggregationConfig;
use crate::error::{Error, Result};
use crate::prover::{CircuitKind, ProofData};

/// outcome of a single poll
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollStatus<T> {
    Pending,
    Ready(T),
}

/// poll `f` up to `max_attempts` times, sleeping `interval` between attempts
pub async fn poll_until<T, F, Fut>(max_attempts: u32, interval: Duration, mut f: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollStatus<T>>>,
{
    for attempt in 1..=max_attempts {
        match f(attempt).await {
            Ok(PollStatus::Ready(value)) => return Ok(value),
            Ok(PollStatus::Pending) => {
                debug!("poll {}/{}: pending", attempt, max_attempts);
            }
            Err(Error::Network(e)) => {
                warn!("poll {}/{} failed, retrying: {}", attempt, max_attempts, e);
            }
            Err(e) => return Err(e),
        }

        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }

    Err(Error::AggregationTimeout {
        attempts: max_attempts,
    })
}

/// where an aggregated proof landed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationReceipt {
    pub aggregation_id: u64,
    /// hex root of the aggregation tree
    pub root: String,
    pub leaf_index: u64,
    #[serde(default)]
    pub path: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Aggregated { receipt: AggregationReceipt },
    Failed { reason: String },
}

/// decode a status body; a malformed body is a format error, not a retry
pub fn parse_job_status(body: &str) -> Result<JobStatus> {
    Ok(serde_json::from_str(body)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    job_id: String,
}

#[derive(Clone)]
pub struct AggregationClient {
    url: String,
    client: Client,
    max_attempts: u32,
    poll_interval: Duration,
}

impl AggregationClient {
    pub fn new(config: &AggregationConfig) -> Self {
        Self {
            url: config.url.trim_end_matches('/').to_string(),
            client: Client::new(),
            max_attempts: config.max_attempts,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    /// submit a proof, returns the service's job id
    pub async fn submit(&self, kind: CircuitKind, proof: &ProofData) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/submit", self.url))
            .json(&json!({
                "circuit": kind,
                "proof": proof,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::AggregationRejected(format!(
                "submit returned {}: {}",
                status,
                body.trim()
            )));
        }

        let submitted: SubmitResponse = response.json().await?;
        info!("submitted {} proof for aggregation, job {}", kind, submitted.job_id);
        Ok(submitted.job_id)
    }

    pub async fn status(&self, job_id: &str) -> Result<JobStatus> {
        let body = self
            .client
            .get(format!("{}/status/{}", self.url, job_id))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_job_status(&body)
    }

    /// poll until the job is aggregated, fails, or the attempt budget runs out
    pub async fn wait(&self, job_id: &str) -> Result<AggregationReceipt> {
        let receipt = poll_until(self.max_attempts, self.poll_interval, |_| async move {
            match self.status(job_id).await? {
                JobStatus::Pending => Ok(PollStatus::Pending),
                JobStatus::Aggregated { receipt } => Ok(PollStatus::Ready(receipt)),
                JobStatus::Failed { reason } => Err(Error::AggregationRejected(reason)),
            }
        })
        .await?;

        info!(
            "job {} aggregated as #{} leaf {}",
            job_id, receipt.aggregation_id, receipt.leaf_index
        );
        Ok(receipt)
    }

    pub async fn submit_and_wait(
        &self,
        kind: CircuitKind,
        proof: &ProofData,
    ) -> Result<AggregationReceipt> {
        let job_id = self.submit(kind, proof).await?;
        self.wait(&job_id).await
    }
}
