//! Payment proof encoding for intent fulfillment.
//!
//! The fulfillment call takes a single `bytes` argument carrying one or two
//! attestation proofs. Proof artifacts are opaque here; this crate only lays
//! them out the way the verifier contract decodes them:
//!
//! - one proof: `abi.encode(bytes proof)`
//! - two proofs: `abi.encode(bytes proof0, bytes proof1)`
//! - tagged: `abi.encodePacked(uint8 tag, bytes encoded)`
//!
//! Encoding is pure and deterministic.

use alloy::primitives::{Bytes, U256};
use alloy::sol_types::SolValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while encoding or decoding proof bundles.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProofError {
	#[error("Invalid proof count: expected 1 or 2, got {0}")]
	InvalidProofCount(usize),
	#[error("Malformed proof bundle: {0}")]
	Malformed(String),
}

/// An opaque attestation produced by the external prover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofArtifact(pub Bytes);

impl ProofArtifact {
	pub fn new(bytes: impl Into<Bytes>) -> Self {
		Self(bytes.into())
	}

	pub fn from_hex(value: &str) -> Result<Self, ProofError> {
		let bytes = hex::decode(value.trim().trim_start_matches("0x"))
			.map_err(|e| ProofError::Malformed(format!("invalid proof hex: {}", e)))?;
		Ok(Self(bytes.into()))
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

/// One or two proofs plus an optional payment-method tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofBundle {
	artifacts: Vec<ProofArtifact>,
	tag: Option<u8>,
}

impl ProofBundle {
	pub fn new(artifacts: Vec<ProofArtifact>, tag: Option<u8>) -> Result<Self, ProofError> {
		match artifacts.len() {
			1 | 2 => Ok(Self { artifacts, tag }),
			n => Err(ProofError::InvalidProofCount(n)),
		}
	}

	pub fn artifacts(&self) -> &[ProofArtifact] {
		&self.artifacts
	}

	pub fn tag(&self) -> Option<u8> {
		self.tag
	}

	/// Serializes the bundle into the bytes passed to the fulfillment call.
	pub fn encode(&self) -> Bytes {
		let encoded = match self.artifacts.as_slice() {
			[single] => (single.0.clone(),).abi_encode_params(),
			[first, second] => (first.0.clone(), second.0.clone()).abi_encode_params(),
			_ => unreachable!("proof count validated at construction"),
		};

		match self.tag {
			Some(tag) => {
				let mut tagged = Vec::with_capacity(encoded.len() + 1);
				tagged.push(tag);
				tagged.extend_from_slice(&encoded);
				tagged.into()
			}
			None => encoded.into(),
		}
	}
}

/// Encodes `artifacts` with an optional tag in one step.
pub fn encode_proofs(artifacts: &[ProofArtifact], tag: Option<u8>) -> Result<Bytes, ProofError> {
	Ok(ProofBundle::new(artifacts.to_vec(), tag)?.encode())
}

/// Decodes bytes produced by [`ProofBundle::encode`].
///
/// `tagged` tells whether a leading tag byte is present; the packed layout
/// carries no marker of its own.
pub fn decode_proof_bundle(data: &[u8], tagged: bool) -> Result<ProofBundle, ProofError> {
	let (tag, body) = if tagged {
		let (first, rest) = data
			.split_first()
			.ok_or_else(|| ProofError::Malformed("empty bundle".to_string()))?;
		(Some(*first), rest)
	} else {
		(None, data)
	};

	if body.len() < 32 {
		return Err(ProofError::Malformed("bundle shorter than one word".to_string()));
	}

	// The first head word is the offset of the first dynamic argument, which
	// equals the head size: one word per proof.
	let first_offset = U256::from_be_slice(&body[..32]);
	let artifacts = if first_offset == U256::from(32u64) {
		let (proof,) = <(Bytes,)>::abi_decode_params(body)
			.map_err(|e| ProofError::Malformed(e.to_string()))?;
		vec![ProofArtifact(proof)]
	} else if first_offset == U256::from(64u64) {
		let (first, second) = <(Bytes, Bytes)>::abi_decode_params(body)
			.map_err(|e| ProofError::Malformed(e.to_string()))?;
		vec![ProofArtifact(first), ProofArtifact(second)]
	} else {
		return Err(ProofError::Malformed(format!(
			"unexpected head offset {}",
			first_offset
		)));
	};

	ProofBundle::new(artifacts, tag)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn artifact(fill: u8, len: usize) -> ProofArtifact {
		ProofArtifact::new(vec![fill; len])
	}

	#[test]
	fn test_invalid_counts_rejected() {
		assert_eq!(
			ProofBundle::new(vec![], None).unwrap_err(),
			ProofError::InvalidProofCount(0)
		);
		assert_eq!(
			encode_proofs(&[artifact(1, 4), artifact(2, 4), artifact(3, 4)], None).unwrap_err(),
			ProofError::InvalidProofCount(3)
		);
	}

	#[test]
	fn test_single_proof_layout() {
		let encoded = encode_proofs(&[artifact(0xaa, 3)], None).unwrap();

		// offset, length, one padded data word
		assert_eq!(encoded.len(), 96);
		assert_eq!(U256::from_be_slice(&encoded[..32]), U256::from(32u64));
		assert_eq!(U256::from_be_slice(&encoded[32..64]), U256::from(3u64));
		assert_eq!(&encoded[64..67], &[0xaa, 0xaa, 0xaa]);
		assert!(encoded[67..].iter().all(|b| *b == 0));
	}

	#[test]
	fn test_one_and_two_proof_layouts_differ() {
		let one = encode_proofs(&[artifact(0xaa, 8)], None).unwrap();
		let two = encode_proofs(&[artifact(0xaa, 8), artifact(0xaa, 8)], None).unwrap();
		assert_ne!(one, two);
		assert_eq!(U256::from_be_slice(&two[..32]), U256::from(64u64));
	}

	#[test]
	fn test_encoding_is_deterministic() {
		let proofs = [artifact(1, 40), artifact(2, 70)];
		assert_eq!(
			encode_proofs(&proofs, Some(3)).unwrap(),
			encode_proofs(&proofs, Some(3)).unwrap()
		);
	}

	#[test]
	fn test_tag_is_prepended() {
		let untagged = encode_proofs(&[artifact(7, 10)], None).unwrap();
		let tagged = encode_proofs(&[artifact(7, 10)], Some(5)).unwrap();
		assert_eq!(tagged[0], 5);
		assert_eq!(&tagged[1..], &untagged[..]);
	}

	#[test]
	fn test_decode_recovers_structure() {
		let bundle = ProofBundle::new(vec![artifact(1, 33), artifact(2, 1)], Some(9)).unwrap();
		let decoded = decode_proof_bundle(&bundle.encode(), true).unwrap();
		assert_eq!(decoded, bundle);

		let single = ProofBundle::new(vec![artifact(4, 64)], None).unwrap();
		assert_eq!(decode_proof_bundle(&single.encode(), false).unwrap(), single);
	}

	#[test]
	fn test_decode_rejects_garbage() {
		assert!(decode_proof_bundle(&[], true).is_err());
		assert!(decode_proof_bundle(&[0u8; 16], false).is_err());
		assert!(decode_proof_bundle(&[0u8; 64], false).is_err());
	}

	#[test]
	fn test_artifact_from_hex() {
		let artifact = ProofArtifact::from_hex("0xdeadbeef").unwrap();
		assert_eq!(artifact.as_bytes(), &[0xde, 0xad, 0xbe, 0xef]);
		assert!(ProofArtifact::from_hex("0xzz").is_err());
	}
}
