//! Append-only, hash-chained log of attempted transitions
//!
//! Every attempt, accepted or rejected, becomes one [`TransitionHistoryEntry`].
//! Entries are wrapped in a [`HistoryLink`] whose sha256 digest covers the CBOR
//! encoding of the entry and the previous link's digest, so any edit to a past
//! entry breaks [`TransitionHistory::verify`].
use super::audit::{AuditState, Role, TimeStamp};
use super::error::{HistoryError, ReasonCode};
use super::transition::{TransitionRequest, TransitionResult};
use tracing::info;

/// Digest the first link points back to.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub enum Outcome {
    #[n(0)]
    Accepted,
    #[n(1)]
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct TransitionHistoryEntry {
    #[n(0)]
    pub audit_id: String,
    #[n(1)]
    pub from_state: AuditState,
    #[n(2)]
    pub to_state: AuditState,
    #[n(3)]
    pub actor_role: Role,
    #[n(4)]
    pub outcome: Outcome,
    #[n(5)]
    pub timestamp: TimeStamp,
    #[n(6)]
    pub reason_code: Option<ReasonCode>,
}

impl TransitionHistoryEntry {
    /// Entry for one attempt. Accepted results carry their own timestamp;
    /// rejections are stamped with `recorded_at`.
    pub fn record(
        request: &TransitionRequest,
        result: &TransitionResult,
        recorded_at: TimeStamp,
    ) -> Self {
        let (outcome, timestamp, reason_code) = match result {
            TransitionResult::Accepted { timestamp, .. } => (Outcome::Accepted, *timestamp, None),
            TransitionResult::Rejected { reason_code, .. } => {
                (Outcome::Rejected, recorded_at, Some(*reason_code))
            }
        };

        Self {
            audit_id: request.audit_id.clone(),
            from_state: request.from_state,
            to_state: request.to_state,
            actor_role: request.actor_role,
            outcome,
            timestamp,
            reason_code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct HistoryLink {
    #[n(0)]
    pub sequence: u64,
    #[n(1)]
    pub prev_hash: String,
    #[n(2)]
    pub entry: TransitionHistoryEntry,
}

impl HistoryLink {
    /// Returns the sha256 of the link's CBOR encoding together with the encoding
    pub fn build(&self) -> Result<(String, Vec<u8>), HistoryError> {
        let cbor = minicbor::to_vec(self).map_err(|e| HistoryError::Encode(e.to_string()))?;
        let hash = sha256::digest(&cbor);

        Ok((hash, cbor))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct TransitionHistory {
    #[n(0)]
    pub audit_id: String,
    #[n(1)]
    links: Vec<HistoryLink>,
    #[n(2)]
    head: String,
}

impl TransitionHistory {
    pub fn new(audit_id: String) -> Self {
        Self {
            audit_id,
            links: vec![],
            head: GENESIS_HASH.to_string(),
        }
    }

    /// Append an entry, returning the new head digest.
    pub fn append(&mut self, entry: TransitionHistoryEntry) -> Result<String, HistoryError> {
        if entry.audit_id != self.audit_id {
            return Err(HistoryError::ForeignAudit {
                expected: self.audit_id.clone(),
                found: entry.audit_id,
            });
        }
        if let Some(last) = self.links.last()
            && entry.timestamp < last.entry.timestamp
        {
            return Err(HistoryError::OutOfOrder);
        }

        let link = HistoryLink {
            sequence: self.links.len() as u64,
            prev_hash: self.head.clone(),
            entry,
        };
        let (hash, _) = link.build()?;

        self.links.push(link);
        self.head = hash.clone();

        Ok(hash)
    }

    pub fn entries(&self) -> impl Iterator<Item = &TransitionHistoryEntry> {
        self.links.iter().map(|link| &link.entry)
    }

    pub fn links(&self) -> &[HistoryLink] {
        &self.links
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Recompute every digest from genesis and compare with the stored chain
    pub fn verify(&self) -> Result<(), HistoryError> {
        let mut expected_prev = GENESIS_HASH.to_string();

        for (index, link) in self.links.iter().enumerate() {
            if link.sequence != index as u64
                || link.prev_hash != expected_prev
                || link.entry.audit_id != self.audit_id
            {
                return Err(HistoryError::BrokenChain(index as u64));
            }
            let (hash, _) = link.build()?;
            expected_prev = hash;
        }

        if expected_prev != self.head {
            return Err(HistoryError::BrokenChain(self.links.len() as u64));
        }
        Ok(())
    }

    pub fn view_history(&self) {
        for link in &self.links {
            let entry = &link.entry;
            info!(
                audit_id = %self.audit_id,
                sequence = link.sequence,
                from = %entry.from_state,
                to = %entry.to_state,
                role = %entry.actor_role,
                outcome = ?entry.outcome,
                reason = ?entry.reason_code,
                at = %entry.timestamp,
                "transition history"
            );
        }
    }
}
