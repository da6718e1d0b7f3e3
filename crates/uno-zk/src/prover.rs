//! proof generation through an external proving service
//!
//! circuits are loaded once per process and shared. the first caller for a
//! circuit drives the load, concurrent callers wait on the same cell. a
//! failed load leaves the cell empty so the next call retries.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use alloy::primitives::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::ProverConfig;
use crate::error::{Error, Result};
use crate::inputs::{DealInput, DrawInput, PlayInput, ShuffleInput};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitKind {
    Shuffle,
    Deal,
    Draw,
    Play,
}

impl CircuitKind {
    pub const ALL: [CircuitKind; 4] = [Self::Shuffle, Self::Deal, Self::Draw, Self::Play];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Shuffle => "shuffle",
            Self::Deal => "deal",
            Self::Draw => "draw",
            Self::Play => "play",
        }
    }
}

impl fmt::Display for CircuitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// opaque proof as produced by the backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofData {
    pub proof: Bytes,
    /// public inputs as field strings, hex or decimal
    pub public_inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_key: Option<Bytes>,
}

/// a circuit the backend has compiled and is ready to prove with
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedCircuit {
    pub kind: CircuitKind,
    pub id: String,
}

#[derive(Deserialize)]
struct CircuitResponse {
    id: String,
}

/// proving backend seam
pub trait ProvingBackend: Send + Sync {
    fn load_circuit(
        &self,
        kind: CircuitKind,
    ) -> impl Future<Output = Result<LoadedCircuit>> + Send;

    fn prove(
        &self,
        circuit: &LoadedCircuit,
        inputs: Value,
    ) -> impl Future<Output = Result<ProofData>> + Send;
}

/// json over http to a prover service
#[derive(Clone)]
pub struct HttpProvingBackend {
    url: String,
    client: Client,
}

impl HttpProvingBackend {
    pub fn new(config: &ProverConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn health(&self) -> Result<bool> {
        let response = self.client.get(format!("{}/health", self.url)).send().await?;
        Ok(response.status().is_success())
    }
}

impl ProvingBackend for HttpProvingBackend {
    async fn load_circuit(&self, kind: CircuitKind) -> Result<LoadedCircuit> {
        let load_error = |reason: String| Error::CircuitLoad {
            circuit: kind.to_string(),
            reason,
        };

        let response = self
            .client
            .get(format!("{}/circuits/{}", self.url, kind))
            .send()
            .await
            .map_err(|e| load_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(load_error(format!("status {}", response.status())));
        }

        let loaded: CircuitResponse = response
            .json()
            .await
            .map_err(|e| load_error(e.to_string()))?;
        Ok(LoadedCircuit {
            kind,
            id: loaded.id,
        })
    }

    async fn prove(&self, circuit: &LoadedCircuit, inputs: Value) -> Result<ProofData> {
        let proof_error = |reason: String| Error::ProofGeneration {
            circuit: circuit.kind.to_string(),
            reason,
        };

        let payload = json!({
            "circuitId": circuit.id,
            "inputs": inputs,
        });

        let response = self
            .client
            .post(format!("{}/prove/{}", self.url, circuit.kind))
            .json(&payload)
            .send()
            .await
            .map_err(|e| proof_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(proof_error(format!("status {}: {}", status, body.trim())));
        }

        response.json().await.map_err(|e| proof_error(e.to_string()))
    }
}

/// circuit cache plus typed entry points per circuit
pub struct ProofClient<B> {
    backend: B,
    circuits: HashMap<CircuitKind, OnceCell<LoadedCircuit>>,
}

impl<B: ProvingBackend> ProofClient<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            circuits: CircuitKind::ALL
                .into_iter()
                .map(|kind| (kind, OnceCell::new()))
                .collect(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// loaded circuit for `kind`, loading it on first use
    pub async fn circuit(&self, kind: CircuitKind) -> Result<&LoadedCircuit> {
        let cell = self.circuits.get(&kind).ok_or_else(|| Error::CircuitLoad {
            circuit: kind.to_string(),
            reason: "unknown circuit".into(),
        })?;

        cell.get_or_try_init(|| async {
            let start = Instant::now();
            let circuit = self.backend.load_circuit(kind).await?;
            info!("loaded {} circuit in {:?}", kind, start.elapsed());
            Ok::<_, Error>(circuit)
        })
        .await
    }

    pub fn is_loaded(&self, kind: CircuitKind) -> bool {
        self.circuits
            .get(&kind)
            .is_some_and(|cell| cell.initialized())
    }

    pub async fn prove(&self, kind: CircuitKind, inputs: Value) -> Result<ProofData> {
        let circuit = self.circuit(kind).await?;
        let start = Instant::now();
        let proof = self.backend.prove(circuit, inputs).await?;
        info!(
            "{} proof: {} bytes, {} public inputs, {:?}",
            kind,
            proof.proof.len(),
            proof.public_inputs.len(),
            start.elapsed()
        );
        Ok(proof)
    }

    pub async fn prove_shuffle(&self, input: &ShuffleInput) -> Result<ProofData> {
        self.prove(CircuitKind::Shuffle, input.to_json()?).await
    }

    pub async fn prove_deal(&self, input: &DealInput) -> Result<ProofData> {
        debug!("proving deal of {} cards", input.positions.len());
        self.prove(CircuitKind::Deal, input.to_json()?).await
    }

    pub async fn prove_draw(&self, input: &DrawInput) -> Result<ProofData> {
        debug!("proving draw at position {}", input.position);
        self.prove(CircuitKind::Draw, input.to_json()?).await
    }

    pub async fn prove_play(&self, input: &PlayInput) -> Result<ProofData> {
        self.prove(CircuitKind::Play, input.to_json()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::task::JoinSet;

    /// counts loads, fails the first `fail_loads` of them
    #[derive(Default)]
    struct MockBackend {
        loads: AtomicUsize,
        proofs: AtomicUsize,
        fail_loads: usize,
    }

    impl ProvingBackend for MockBackend {
        async fn load_circuit(&self, kind: CircuitKind) -> Result<LoadedCircuit> {
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if n < self.fail_loads {
                return Err(Error::CircuitLoad {
                    circuit: kind.to_string(),
                    reason: "artifact missing".into(),
                });
            }
            Ok(LoadedCircuit {
                kind,
                id: format!("{}-v1", kind),
            })
        }

        async fn prove(&self, circuit: &LoadedCircuit, inputs: Value) -> Result<ProofData> {
            self.proofs.fetch_add(1, Ordering::SeqCst);
            let position = inputs
                .get("position")
                .and_then(Value::as_str)
                .unwrap_or("0")
                .to_string();
            Ok(ProofData {
                proof: Bytes::from(circuit.id.clone().into_bytes()),
                public_inputs: vec![position],
                verification_key: None,
            })
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_use_loads_once() {
        let client = Arc::new(ProofClient::new(MockBackend::default()));

        let mut tasks = JoinSet::new();
        for _ in 0..8 {
            let client = client.clone();
            tasks.spawn(async move { client.prove(CircuitKind::Draw, json!({})).await });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        assert_eq!(client.backend().loads.load(Ordering::SeqCst), 1);
        assert_eq!(client.backend().proofs.load(Ordering::SeqCst), 8);
        assert!(client.is_loaded(CircuitKind::Draw));
        assert!(!client.is_loaded(CircuitKind::Play));
    }

    #[tokio::test]
    async fn test_failed_load_retried() {
        let client = ProofClient::new(MockBackend {
            fail_loads: 1,
            ..Default::default()
        });

        let err = client.prove(CircuitKind::Deal, json!({})).await.unwrap_err();
        assert!(matches!(err, Error::CircuitLoad { ref circuit, .. } if circuit == "deal"));
        assert!(!client.is_loaded(CircuitKind::Deal));

        client.prove(CircuitKind::Deal, json!({})).await.unwrap();
        assert_eq!(client.backend().loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_typed_entry_point_sends_circuit_fields() {
        use crate::config::GameConfig;
        use crate::inputs::draw_input;
        use crate::state::GameZkState;
        use rand::SeedableRng;

        let mut state = GameZkState::new("g", GameConfig::default());
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(5);
        state.initialize_deck(&["1R", "2G", "3B"], &mut rng).unwrap();
        let consumed = state.consume_card("3B", 2).unwrap().unwrap();

        let client = ProofClient::new(MockBackend::default());
        let proof = client.prove_draw(&draw_input(&consumed)).await.unwrap();
        assert_eq!(proof.public_inputs, vec!["2".to_string()]);
        assert_eq!(proof.proof.as_ref(), b"draw-v1");
    }

    #[test]
    fn test_proof_data_wire_format() {
        let proof: ProofData = serde_json::from_str(
            r#"{"proof":"0x0102","publicInputs":["0x01","7"]}"#,
        )
        .unwrap();
        assert_eq!(proof.proof.as_ref(), &[1, 2]);
        assert_eq!(proof.verification_key, None);
        let back = serde_json::to_value(&proof).unwrap();
        assert!(back.get("verificationKey").is_none());
    }
}
