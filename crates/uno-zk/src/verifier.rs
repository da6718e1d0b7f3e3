//! on-chain verifier adapter
//!
//! read-only verification always goes through the verifier's own chain rpc,
//! whatever network a signer happens to be on. recording a verification is
//! a transaction: a wallet on another chain is rebound to the verifier's
//! rpc before submitting, an explicitly supplied provider is only checked.

use alloy::{
    contract::Error as ContractError,
    network::EthereumWallet,
    primitives::{Address, Bytes, B256, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    sol,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::VerifierConfig;
use crate::error::{Error, Result};
use crate::prover::ProofData;

sol! {
    #[sol(rpc)]
    interface IUnoVerifier {
        function verify(bytes calldata proof, bytes32[] calldata publicInputs) external view returns (bool);
        function verifyAndRecord(bytes calldata proof, bytes32[] calldata publicInputs, bytes32 gameId) external returns (bool);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifierError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("verifier returned no data, is the contract deployed? {0}")]
    NoData(String),

    #[error("verifier abi mismatch: {0}")]
    AbiMismatch(String),

    #[error("user rejected the request")]
    UserRejected,

    #[error("invalid verifier address: {0:?}")]
    InvalidAddress(String),

    #[error("wrong network: verifier lives on chain {expected}, signer is on {actual}")]
    WrongNetwork { expected: u64, actual: u64 },
}

/// result of a read-only verification
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Valid,
    Invalid,
    /// the verifier rejected the proof by reverting
    Reverted(String),
}

impl VerifyOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    pub success: bool,
}

#[derive(Clone, Debug)]
pub enum RecordOutcome {
    Recorded(TxReceipt),
    Reverted(String),
}

/// proof and public inputs in the verifier's calldata shape
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractProof {
    pub proof: Bytes,
    pub public_inputs: Vec<B256>,
}

impl ContractProof {
    /// 0x-prefixed hex of the proof bytes
    pub fn proof_hex(&self) -> String {
        self.proof.to_string()
    }
}

/// parse one public input, hex with 0x prefix or decimal, into a 32-byte word
pub fn public_input_word(input: &str) -> Result<B256> {
    let trimmed = input.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(digits) if digits.is_empty() => Ok(U256::ZERO),
        Some(digits) => U256::from_str_radix(digits, 16),
        None => U256::from_str_radix(trimmed, 10),
    };
    parsed
        .map(B256::from)
        .map_err(|e| Error::InvalidInput(format!("public input {:?}: {}", input, e)))
}

pub fn format_for_contract(proof: &ProofData) -> Result<ContractProof> {
    let public_inputs = proof
        .public_inputs
        .iter()
        .map(|input| public_input_word(input))
        .collect::<Result<Vec<_>>>()?;
    Ok(ContractProof {
        proof: proof.proof.clone(),
        public_inputs,
    })
}

/// sort a failed call message into an outcome (revert) or an error kind
///
/// fallback for errors that carry no typed variant, see
/// [`classify_contract_error`].
pub fn classify_call_error(message: &str) -> std::result::Result<VerifyOutcome, VerifierError> {
    let lower = message.to_lowercase();

    if lower.contains("user rejected") || lower.contains("user denied") || lower.contains("code 4001") {
        return Err(VerifierError::UserRejected);
    }
    if lower.contains("revert") {
        return Ok(VerifyOutcome::Reverted(message.to_string()));
    }
    if lower.contains("returned no data") || lower.contains("zero data") {
        return Err(VerifierError::NoData(message.to_string()));
    }
    if lower.contains("abi decod")
        || lower.contains("abi encod")
        || lower.contains("could not decode")
        || lower.contains("type check failed")
    {
        return Err(VerifierError::AbiMismatch(message.to_string()));
    }
    Err(VerifierError::Rpc(message.to_string()))
}

/// sort a failed contract call, typed variants first
pub fn classify_contract_error(
    error: &ContractError,
) -> std::result::Result<VerifyOutcome, VerifierError> {
    let message = error.to_string();
    match error {
        ContractError::ZeroData(..) => Err(VerifierError::NoData(message)),
        ContractError::AbiError(..)
        | ContractError::UnknownFunction(..)
        | ContractError::UnknownSelector(..) => Err(VerifierError::AbiMismatch(message)),
        ContractError::TransportError(e)
            if e.as_error_resp()
                .is_some_and(|payload| payload.as_revert_data().is_some()) =>
        {
            Ok(VerifyOutcome::Reverted(message))
        }
        _ => classify_call_error(&message),
    }
}

/// fail unless the signer is on the verifier's chain
pub fn check_network(expected: u64, actual: u64) -> std::result::Result<(), VerifierError> {
    if expected != actual {
        return Err(VerifierError::WrongNetwork { expected, actual });
    }
    Ok(())
}

/// what it takes to put a signer on the verifier's chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkSwitch {
    Stay,
    Switch { from: u64, to: u64 },
}

pub fn plan_network_switch(expected: u64, actual: u64) -> NetworkSwitch {
    if expected == actual {
        NetworkSwitch::Stay
    } else {
        NetworkSwitch::Switch {
            from: actual,
            to: expected,
        }
    }
}

/// wallet from a hex private key
pub fn wallet_from_key(private_key: &str) -> Result<EthereumWallet> {
    let signer: PrivateKeySigner = private_key
        .parse()
        .map_err(|e| Error::Config(format!("invalid private key: {}", e)))?;
    Ok(EthereumWallet::from(signer))
}

fn parse_rpc_url(rpc_url: &str) -> std::result::Result<reqwest::Url, VerifierError> {
    rpc_url
        .parse()
        .map_err(|e| VerifierError::Rpc(format!("invalid rpc url {:?}: {}", rpc_url, e)))
}

/// signing provider for `wallet` on an arbitrary rpc
pub fn signer_provider(rpc_url: &str, wallet: EthereumWallet) -> Result<DynProvider> {
    let url = parse_rpc_url(rpc_url)?;
    Ok(DynProvider::new(
        ProviderBuilder::new().wallet(wallet).connect_http(url),
    ))
}

pub struct VerifierClient {
    address: Address,
    chain_id: u64,
    rpc_url: reqwest::Url,
    reader: DynProvider,
}

impl VerifierClient {
    pub fn new(config: &VerifierConfig) -> Result<Self> {
        let address: Address = config
            .contract_address
            .parse()
            .map_err(|_| VerifierError::InvalidAddress(config.contract_address.clone()))?;
        if address == Address::ZERO {
            return Err(VerifierError::InvalidAddress(config.contract_address.clone()).into());
        }
        let url = parse_rpc_url(&config.rpc_url)?;

        Ok(Self {
            address,
            chain_id: config.chain_id,
            reader: DynProvider::new(ProviderBuilder::new().connect_http(url.clone())),
            rpc_url: url,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// `wallet` bound to the verifier's own rpc
    pub fn signer_on_chain(&self, wallet: EthereumWallet) -> DynProvider {
        DynProvider::new(
            ProviderBuilder::new()
                .wallet(wallet)
                .connect_http(self.rpc_url.clone()),
        )
    }

    /// provider for `wallet` on the verifier's chain
    ///
    /// starts from `signer_rpc` when given and switches to the verifier's
    /// rpc if that lands on another chain.
    pub async fn switch_signer(
        &self,
        wallet: EthereumWallet,
        signer_rpc: Option<&str>,
    ) -> Result<DynProvider> {
        let Some(rpc) = signer_rpc else {
            return Ok(self.signer_on_chain(wallet));
        };

        let provider = signer_provider(rpc, wallet.clone())?;
        let actual = provider
            .get_chain_id()
            .await
            .map_err(|e| VerifierError::Rpc(e.to_string()))?;

        match plan_network_switch(self.chain_id, actual) {
            NetworkSwitch::Stay => Ok(provider),
            NetworkSwitch::Switch { from, to } => {
                info!("signer on chain {}, switching to {}", from, to);
                Ok(self.signer_on_chain(wallet))
            }
        }
    }

    /// read-only verification on the verifier's own chain
    pub async fn verify(&self, proof: &ProofData) -> Result<VerifyOutcome> {
        let call = format_for_contract(proof)?;
        let verifier = IUnoVerifier::new(self.address, &self.reader);

        debug!(
            "verify: {} proof bytes, {} public inputs on chain {}",
            call.proof.len(),
            call.public_inputs.len(),
            self.chain_id
        );

        match verifier
            .verify(call.proof, call.public_inputs)
            .call()
            .await
        {
            Ok(true) => Ok(VerifyOutcome::Valid),
            Ok(false) => Ok(VerifyOutcome::Invalid),
            Err(e) => {
                let outcome = classify_contract_error(&e)?;
                warn!("verify call reverted: {:?}", outcome);
                Ok(outcome)
            }
        }
    }

    /// verify and record on-chain, switching `wallet` onto the verifier's
    /// chain first
    pub async fn verify_and_record(
        &self,
        wallet: EthereumWallet,
        signer_rpc: Option<&str>,
        proof: &ProofData,
        game_id: B256,
    ) -> Result<RecordOutcome> {
        let signer = self.switch_signer(wallet, signer_rpc).await?;
        self.verify_and_record_with(&signer, proof, game_id).await
    }

    /// verify and record through a caller-owned provider
    ///
    /// the provider cannot be switched, so it must already be on the
    /// verifier's chain.
    pub async fn verify_and_record_with(
        &self,
        signer: &DynProvider,
        proof: &ProofData,
        game_id: B256,
    ) -> Result<RecordOutcome> {
        let actual = signer
            .get_chain_id()
            .await
            .map_err(|e| VerifierError::Rpc(e.to_string()))?;
        check_network(self.chain_id, actual)?;

        let call = format_for_contract(proof)?;
        let verifier = IUnoVerifier::new(self.address, signer);

        let pending = match verifier
            .verifyAndRecord(call.proof, call.public_inputs, game_id)
            .send()
            .await
        {
            Ok(pending) => pending,
            Err(e) => {
                return match classify_contract_error(&e)? {
                    VerifyOutcome::Reverted(reason) => Ok(RecordOutcome::Reverted(reason)),
                    _ => Err(VerifierError::Rpc(e.to_string()).into()),
                };
            }
        };

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| VerifierError::Rpc(e.to_string()))?;

        let receipt = TxReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.unwrap_or(0),
            gas_used: receipt.gas_used,
            success: receipt.status(),
        };
        info!(
            "recorded verification in {} (block {}, success {})",
            receipt.tx_hash, receipt.block_number, receipt.success
        );
        Ok(RecordOutcome::Recorded(receipt))
    }
}
