//! Prover reading pre-generated attestations from disk.

use async_trait::async_trait;
use p2p_core::{FlowError, ProverInterface};
use p2p_proof::ProofArtifact;
use p2p_types::{truncate_hash, IntentTuple, B256};
use std::path::PathBuf;
use tracing::debug;

/// Serves proof artifacts from files. A file whose contents start with
/// `0x` is decoded as hex, anything else is taken as raw bytes.
pub struct FileProver {
	paths: Vec<PathBuf>,
}

impl FileProver {
	pub fn new(paths: Vec<PathBuf>) -> Self {
		Self { paths }
	}
}

#[async_trait]
impl ProverInterface for FileProver {
	async fn prove(
		&self,
		intent_hash: B256,
		_intent: &IntentTuple,
	) -> Result<Vec<ProofArtifact>, FlowError> {
		let mut artifacts = Vec::with_capacity(self.paths.len());
		for path in &self.paths {
			let bytes = tokio::fs::read(path)
				.await
				.map_err(|e| FlowError::Prover(format!("{}: {}", path.display(), e)))?;

			let artifact = match std::str::from_utf8(&bytes).map(str::trim) {
				Ok(text) if text.starts_with("0x") => ProofArtifact::from_hex(text)?,
				_ => ProofArtifact::new(bytes),
			};
			debug!(
				intent_hash = %truncate_hash(&intent_hash.to_string()),
				path = %path.display(),
				bytes = artifact.as_bytes().len(),
				"Loaded proof artifact"
			);
			artifacts.push(artifact);
		}
		Ok(artifacts)
	}
}
