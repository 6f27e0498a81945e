//! Node profile and independent content evaluation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use veracity_consensus::Verdict;
use veracity_entangle::{EntanglementEngine, EntanglementGraph};
use veracity_identity::decode_record;
use veracity_proof::{decode_proof, CryptoProvider, Proof};
use veracity_types::{
    ContentHash, KeyPair, NodeId, PublicKey, Signature, SourceId, Timestamp, VerificationLevel,
};

/// Public descriptor of a verification node.
#[derive(Clone, Debug)]
pub struct NodeProfile {
    pub node_id: NodeId,
    pub public_key: PublicKey,
    /// Trustworthiness in [0, 1].
    pub reputation: f64,
    /// Voting weight used in trust scoring.
    pub weight: f64,
    /// Topics this node claims specialty in.
    pub specialties: Vec<String>,
    /// Concurrent verification capacity.
    pub capacity: u32,
}

impl NodeProfile {
    /// Halve reputation after an observed divergence (floor 0).
    pub fn penalize_divergence(&mut self) {
        self.reputation = (self.reputation * 0.5).max(0.0);
    }

    /// Small recovery for each honest finalization (ceiling 1).
    pub fn reward_participation(&mut self) {
        self.reputation = (self.reputation + 0.01).min(1.0);
    }
}

/// Everything a node needs to evaluate one content submission.
#[derive(Clone, Debug)]
pub struct ContentSubmission {
    pub content_hash: ContentHash,
    pub topic: String,
    pub fragments: Vec<Vec<u8>>,
    /// The graph published when the content was submitted.
    pub entanglement: EntanglementGraph,
    /// Wire-encoded location proof.
    pub proof_bytes: Vec<u8>,
    /// Public input the proof was bound to.
    pub proof_context: Vec<u8>,
    /// Wire-encoded source-verification record.
    pub record_bytes: Vec<u8>,
    /// The identity service key that signed the record.
    pub issuer_key: PublicKey,
    pub cross_references: Vec<ContentHash>,
}

/// A verification node's evaluation state.
///
/// Holds the node's signing keypair and registered source keys; the
/// crypto provider is injected at construction so proof and signature
/// backends can be swapped.
pub struct VerifierNode {
    pub profile: NodeProfile,
    keypair: KeyPair,
    provider: Arc<dyn CryptoProvider>,
    entangle: EntanglementEngine,
    sources: RwLock<HashMap<SourceId, PublicKey>>,
}

impl VerifierNode {
    pub fn new(
        node_id: NodeId,
        keypair: KeyPair,
        reputation: f64,
        specialties: Vec<String>,
        capacity: u32,
        provider: Arc<dyn CryptoProvider>,
    ) -> Self {
        let profile = NodeProfile {
            node_id,
            public_key: keypair.public.clone(),
            reputation,
            weight: reputation,
            specialties,
            capacity,
        };
        Self {
            profile,
            keypair,
            provider,
            entangle: EntanglementEngine,
            sources: RwLock::new(HashMap::new()),
        }
    }

    /// Register a source's public key with this node.
    pub fn register_source(&self, id: SourceId, public_key: PublicKey) {
        self.sources.write().expect("sources lock").insert(id, public_key);
    }

    /// Verify a signature attributed to a registered source.
    ///
    /// Unknown sources verify as `false`.
    pub fn verify_source_signature(
        &self,
        id: &SourceId,
        message: &[u8],
        signature: &Signature,
    ) -> bool {
        let sources = self.sources.read().expect("sources lock");
        match sources.get(id) {
            Some(key) => self.provider.verify_sig(message, signature, key),
            None => false,
        }
    }

    /// Probabilistically verify a location proof against a claimed region.
    ///
    /// Returns the accepted region on success.
    pub fn verify_location_proof(
        &self,
        proof: &Proof,
        claimed_region: &str,
        epsilon: f64,
        sample_count: u32,
    ) -> (bool, Option<String>) {
        match self
            .provider
            .verify(proof, claimed_region.as_bytes(), epsilon, sample_count)
        {
            Ok(true) => (true, Some(claimed_region.to_string())),
            _ => (false, None),
        }
    }

    /// Sign a message with this node's key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.provider.sign(message, &self.keypair.private)
    }

    /// Independently evaluate a content submission into a verdict.
    ///
    /// Checks entanglement integrity, the source record signature, and the
    /// location proof. Any failing check raises a dispute with a concrete
    /// reason; an undisputed submission is graded `High`, or `Full` when
    /// this node holds a specialty for the topic.
    pub fn evaluate_content(
        &self,
        submission: &ContentSubmission,
        epsilon: f64,
        sample_count: u32,
        now: Timestamp,
    ) -> Verdict {
        let mut reasons: Vec<String> = Vec::new();

        match self
            .entangle
            .verify(&submission.entanglement, &submission.fragments)
        {
            Ok(report) if report.intact => {}
            Ok(report) => reasons.push(format!(
                "entanglement mismatch at sections {:?}",
                report.tampered_sections
            )),
            Err(e) => reasons.push(format!("entanglement check failed: {e}")),
        }

        match decode_record(&submission.record_bytes) {
            Ok(record) => {
                if !self.provider.verify_sig(
                    record.commitment.as_bytes(),
                    &record.signature,
                    &submission.issuer_key,
                ) {
                    reasons.push("source record signature rejected".to_string());
                }
            }
            Err(e) => reasons.push(format!("malformed source record: {e}")),
        }

        match decode_proof(&submission.proof_bytes) {
            Ok(proof) => match self.provider.verify(
                &proof,
                &submission.proof_context,
                epsilon,
                sample_count,
            ) {
                Ok(true) => {}
                Ok(false) => reasons.push("location proof rejected".to_string()),
                Err(e) => reasons.push(format!("location proof check failed: {e}")),
            },
            Err(e) => reasons.push(format!("malformed location proof: {e}")),
        }

        let disputed = !reasons.is_empty();
        let level = if disputed {
            VerificationLevel::Minimal
        } else if self.profile.specialties.contains(&submission.topic) {
            VerificationLevel::Full
        } else {
            VerificationLevel::High
        };

        Verdict {
            node_id: self.profile.node_id.clone(),
            level,
            cross_references: submission.cross_references.clone(),
            disputed,
            dispute_reasons: reasons,
            submitted_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veracity_crypto::{generate_keypair, keypair_from_seed, sign_message};
    use veracity_entangle::DependencyPolicy;
    use veracity_identity::{encode_record, SourceVerificationRecord};
    use veracity_proof::{encode_proof, generate_proof, StandardProvider};
    use veracity_types::Commitment;

    const EPSILON: f64 = 0.05;
    const SAMPLES: u32 = 40;

    fn verifier(specialties: &[&str]) -> VerifierNode {
        VerifierNode::new(
            NodeId::new("node-0"),
            keypair_from_seed(&[1u8; 32]),
            0.9,
            specialties.iter().map(|s| s.to_string()).collect(),
            16,
            Arc::new(StandardProvider),
        )
    }

    fn submission(tamper: bool) -> (ContentSubmission, KeyPair) {
        let issuer = generate_keypair();
        let fragments: Vec<Vec<u8>> =
            vec![b"headline".to_vec(), b"body".to_vec(), b"byline".to_vec()];
        let entanglement =
            EntanglementGraph::build(&fragments, DependencyPolicy::FullOrder).unwrap();

        let commitment = Commitment::new([0xAA; 32]);
        let record = SourceVerificationRecord {
            commitment,
            signature: sign_message(commitment.as_bytes(), &issuer.private),
        };

        let proof = generate_proof(b"location-secret", b"region:eu-central").unwrap();

        let mut fragments = fragments;
        if tamper {
            fragments[1][0] ^= 0x01;
        }

        (
            ContentSubmission {
                content_hash: ContentHash::new([7u8; 32]),
                topic: "politics".to_string(),
                fragments,
                entanglement,
                proof_bytes: encode_proof(&proof),
                proof_context: b"region:eu-central".to_vec(),
                record_bytes: encode_record(&record),
                issuer_key: issuer.public.clone(),
                cross_references: vec![ContentHash::new([8u8; 32])],
            },
            issuer,
        )
    }

    #[test]
    fn clean_submission_grades_high() {
        let node = verifier(&[]);
        let (submission, _) = submission(false);
        let verdict =
            node.evaluate_content(&submission, EPSILON, SAMPLES, Timestamp::new(1_000));
        assert!(!verdict.disputed);
        assert_eq!(verdict.level, VerificationLevel::High);
    }

    #[test]
    fn specialty_upgrades_to_full() {
        let node = verifier(&["politics"]);
        let (submission, _) = submission(false);
        let verdict =
            node.evaluate_content(&submission, EPSILON, SAMPLES, Timestamp::new(1_000));
        assert_eq!(verdict.level, VerificationLevel::Full);
    }

    #[test]
    fn tampered_fragment_raises_dispute() {
        let node = verifier(&[]);
        let (submission, _) = submission(true);
        let verdict =
            node.evaluate_content(&submission, EPSILON, SAMPLES, Timestamp::new(1_000));
        assert!(verdict.disputed);
        assert_eq!(verdict.level, VerificationLevel::Minimal);
        assert!(verdict.dispute_reasons[0].contains("entanglement"));
    }

    #[test]
    fn wrong_issuer_key_raises_dispute() {
        let node = verifier(&[]);
        let (mut submission, _) = submission(false);
        submission.issuer_key = generate_keypair().public;
        let verdict =
            node.evaluate_content(&submission, EPSILON, SAMPLES, Timestamp::new(1_000));
        assert!(verdict.disputed);
        assert!(verdict
            .dispute_reasons
            .iter()
            .any(|r| r.contains("source record signature")));
    }

    #[test]
    fn wrong_proof_context_raises_dispute() {
        let node = verifier(&[]);
        let (mut submission, _) = submission(false);
        submission.proof_context = b"region:somewhere-else".to_vec();
        let verdict =
            node.evaluate_content(&submission, EPSILON, SAMPLES, Timestamp::new(1_000));
        assert!(verdict.disputed);
        assert!(verdict
            .dispute_reasons
            .iter()
            .any(|r| r.contains("location proof rejected")));
    }

    #[test]
    fn source_signature_checks() {
        let node = verifier(&[]);
        let source = generate_keypair();
        let id = SourceId::new("src_1");
        node.register_source(id.clone(), source.public.clone());

        let sig = sign_message(b"article", &source.private);
        assert!(node.verify_source_signature(&id, b"article", &sig));
        assert!(!node.verify_source_signature(&id, b"altered", &sig));
        assert!(!node.verify_source_signature(&SourceId::new("src_ghost"), b"article", &sig));
    }

    #[test]
    fn location_proof_reports_region() {
        let node = verifier(&[]);
        let proof = generate_proof(b"secret", b"eu-west").unwrap();
        let (ok, region) = node.verify_location_proof(&proof, "eu-west", EPSILON, SAMPLES);
        assert!(ok);
        assert_eq!(region.as_deref(), Some("eu-west"));

        let (ok, region) = node.verify_location_proof(&proof, "us-east", EPSILON, SAMPLES);
        assert!(!ok);
        assert!(region.is_none());
    }

    #[test]
    fn provider_is_swappable_at_construction() {
        // Same evaluation path, deterministic backend.
        let node = VerifierNode::new(
            NodeId::new("node-test"),
            keypair_from_seed(&[2u8; 32]),
            0.9,
            Vec::new(),
            16,
            Arc::new(veracity_nullables::NullProvider::new([7u8; 32])),
        );
        let source = generate_keypair();
        let id = SourceId::new("src_1");
        node.register_source(id.clone(), source.public.clone());
        let sig = sign_message(b"article", &source.private);
        assert!(node.verify_source_signature(&id, b"article", &sig));
    }

    #[test]
    fn reputation_adjustments_clamp() {
        let mut profile = verifier(&[]).profile;
        profile.reputation = 0.8;
        profile.penalize_divergence();
        assert!((profile.reputation - 0.4).abs() < 1e-9);

        profile.reputation = 1.0;
        profile.reward_participation();
        assert!((profile.reputation - 1.0).abs() < 1e-9);
    }
}
