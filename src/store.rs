//! Collaborator contracts and their reference adapters
//!
//! The engine never touches storage. [`RecordStore`] and [`RoleProvider`] are the
//! seams the surrounding application implements; [`SledRecordStore`] and
//! [`StaticRoleProvider`] are embedded implementations used by the service
//! layer and the tests.
use super::audit::{AuditFacts, AuditState, Role};
use super::error::StoreError;
use super::history::{TransitionHistory, TransitionHistoryEntry};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Transactional, Tree};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::warn;

pub trait RecordStore {
    fn get_audit_facts(&self, audit_id: &str) -> Result<AuditFacts, StoreError>;

    /// Register a new audit. Fails if the id is already taken.
    fn insert_audit_facts(&self, facts: &AuditFacts) -> Result<(), StoreError>;

    /// Move the audit to `new_state` only if it is still in `expected`.
    /// Returns [`StoreError::StaleState`] when another transition won the race.
    fn persist_state(
        &self,
        audit_id: &str,
        expected: AuditState,
        new_state: AuditState,
    ) -> Result<(), StoreError>;

    /// Append to the audit's history, returning the new chain head.
    fn append_history(&self, entry: TransitionHistoryEntry) -> Result<String, StoreError>;

    /// Append `entry` and, when `new_state` is set, move the audit from
    /// `entry.from_state` to it. Both writes land or neither does; a state
    /// that moved underneath fails with [`StoreError::StaleState`].
    fn commit_transition(
        &self,
        entry: TransitionHistoryEntry,
        new_state: Option<AuditState>,
    ) -> Result<String, StoreError>;

    fn history(&self, audit_id: &str) -> Result<TransitionHistory, StoreError>;
}

pub trait RoleProvider {
    fn roles_of(&self, actor: &str) -> BTreeSet<Role>;
}

/// Audit facts and histories as CBOR values in two sled trees keyed by audit id.
pub struct SledRecordStore {
    instance: Arc<sled::Db>,
    facts: Tree,
    history: Tree,
}

impl SledRecordStore {
    pub fn new(instance: Arc<sled::Db>) -> Result<Self, StoreError> {
        let facts = instance.open_tree("audit_facts")?;
        let history = instance.open_tree("transition_history")?;

        Ok(Self {
            instance,
            facts,
            history,
        })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.instance.flush()?;
        Ok(())
    }
}

impl RecordStore for SledRecordStore {
    fn get_audit_facts(&self, audit_id: &str) -> Result<AuditFacts, StoreError> {
        let bytes = self
            .facts
            .get(audit_id.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(audit_id.to_string()))?;

        Ok(minicbor::decode(&bytes)?)
    }

    fn insert_audit_facts(&self, facts: &AuditFacts) -> Result<(), StoreError> {
        let cbor = minicbor::to_vec(facts)?;

        self.facts
            .compare_and_swap(facts.audit_id.as_bytes(), None::<&[u8]>, Some(cbor))?
            .map_err(|_| StoreError::AlreadyExists(facts.audit_id.clone()))
    }

    fn persist_state(
        &self,
        audit_id: &str,
        expected: AuditState,
        new_state: AuditState,
    ) -> Result<(), StoreError> {
        loop {
            let current = self
                .facts
                .get(audit_id.as_bytes())?
                .ok_or_else(|| StoreError::NotFound(audit_id.to_string()))?;

            let mut facts: AuditFacts = minicbor::decode(&current)?;
            if facts.current_state != expected {
                warn!(
                    audit_id,
                    expected = %expected,
                    found = %facts.current_state,
                    "refusing to persist over a concurrent transition"
                );
                return Err(StoreError::StaleState {
                    audit_id: audit_id.to_string(),
                    expected,
                    found: facts.current_state,
                });
            }

            facts.current_state = new_state;
            let updated = minicbor::to_vec(&facts)?;

            // a concurrent write to the same record restarts the check
            if self
                .facts
                .compare_and_swap(audit_id.as_bytes(), Some(&current), Some(updated))?
                .is_ok()
            {
                return Ok(());
            }
        }
    }

    fn append_history(&self, entry: TransitionHistoryEntry) -> Result<String, StoreError> {
        let key = entry.audit_id.clone();

        loop {
            let current = self.history.get(key.as_bytes())?;
            let mut log = match &current {
                Some(bytes) => minicbor::decode::<TransitionHistory>(bytes)?,
                None => TransitionHistory::new(key.clone()),
            };

            let head = log.append(entry.clone())?;
            let updated = minicbor::to_vec(&log)?;

            if self
                .history
                .compare_and_swap(key.as_bytes(), current.as_ref(), Some(updated))?
                .is_ok()
            {
                return Ok(head);
            }
        }
    }

    fn commit_transition(
        &self,
        entry: TransitionHistoryEntry,
        new_state: Option<AuditState>,
    ) -> Result<String, StoreError> {
        let key = entry.audit_id.clone();

        let committed: Result<String, TransactionError<StoreError>> =
            (&self.facts, &self.history).transaction(|(facts, history)| {
                if let Some(new_state) = new_state {
                    let bytes = facts
                        .get(key.as_bytes())?
                        .ok_or_else(|| abort(StoreError::NotFound(key.clone())))?;
                    let mut stored: AuditFacts = minicbor::decode(&bytes).map_err(abort)?;

                    if stored.current_state != entry.from_state {
                        return Err(abort(StoreError::StaleState {
                            audit_id: key.clone(),
                            expected: entry.from_state,
                            found: stored.current_state,
                        }));
                    }
                    stored.current_state = new_state;
                    facts.insert(key.as_bytes(), minicbor::to_vec(&stored).map_err(abort)?)?;
                }

                let mut log = match history.get(key.as_bytes())? {
                    Some(bytes) => minicbor::decode::<TransitionHistory>(&bytes).map_err(abort)?,
                    None => TransitionHistory::new(key.clone()),
                };
                let head = log.append(entry.clone()).map_err(abort)?;
                history.insert(key.as_bytes(), minicbor::to_vec(&log).map_err(abort)?)?;

                Ok(head)
            });

        match committed {
            Ok(head) => Ok(head),
            Err(TransactionError::Abort(err)) => {
                if let StoreError::StaleState { expected, found, .. } = &err {
                    warn!(
                        audit_id = %key,
                        expected = %expected,
                        found = %found,
                        "refusing to commit over a concurrent transition"
                    );
                }
                Err(err)
            }
            Err(TransactionError::Storage(err)) => Err(err.into()),
        }
    }

    fn history(&self, audit_id: &str) -> Result<TransitionHistory, StoreError> {
        match self.history.get(audit_id.as_bytes())? {
            Some(bytes) => Ok(minicbor::decode(&bytes)?),
            None => Ok(TransitionHistory::new(audit_id.to_string())),
        }
    }
}

fn abort(err: impl Into<StoreError>) -> ConflictableTransactionError<StoreError> {
    ConflictableTransactionError::Abort(err.into())
}

/// Fixed actor → roles assignments.
#[derive(Debug, Clone, Default)]
pub struct StaticRoleProvider {
    assignments: HashMap<String, BTreeSet<Role>>,
}

impl StaticRoleProvider {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn grant(mut self, actor: &str, role: Role) -> Self {
        self.assignments
            .entry(actor.to_string())
            .or_default()
            .insert(role);
        self
    }
}

impl RoleProvider for StaticRoleProvider {
    fn roles_of(&self, actor: &str) -> BTreeSet<Role> {
        self.assignments.get(actor).cloned().unwrap_or_default()
    }
}
