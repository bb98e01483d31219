//! Shared, lock-guarded handle to the registry.
//!
//! Every operation runs under a single `RwLock`: mutations hold the write lock for the whole
//! operation (including the snapshot write), reads hold the read lock. Callers never observe a
//! half-applied enrollment or append.
//!
//! When a data directory is configured a mutation is applied to a copy of the state, the copy
//! is persisted, and only then swapped in. A failed write therefore leaves both memory and disk
//! at the previous state. Operations that leave the state as it was (re-registering a doctor,
//! re-enrolling a patient under the same name) skip the write.
//!
//! Persisting costs time proportional to the whole registry and blocks the calling thread while
//! the write lock is held. Async callers should run mutations on a blocking thread.

use crate::config::CoreConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::registry::{NewRecord, Patient, Record, RecordsRegistry};
use crate::store::SnapshotStore;
use hrm_types::Identity;
use std::sync::{Arc, RwLock, RwLockReadGuard};

/// Pure registry operations - no API concerns
#[derive(Clone, Debug)]
pub struct RegistryService {
    state: Arc<RwLock<RecordsRegistry>>,
    store: Option<Arc<SnapshotStore>>,
}

impl Default for RegistryService {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl RegistryService {
    /// Creates the service, loading the snapshot when persistence is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing snapshot cannot be read or is corrupt.
    pub fn new(cfg: Arc<CoreConfig>) -> RegistryResult<Self> {
        let (registry, store) = match cfg.data_dir() {
            Some(dir) => {
                let store = SnapshotStore::new(dir);
                let registry = store.load()?;
                tracing::info!(
                    snapshot = %store.snapshot_path().display(),
                    "loaded registry snapshot"
                );
                (registry, Some(Arc::new(store)))
            }
            None => (RecordsRegistry::new(), None),
        };

        Ok(Self {
            state: Arc::new(RwLock::new(registry)),
            store,
        })
    }

    /// A service with no persistence.
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(RwLock::new(RecordsRegistry::new())),
            store: None,
        }
    }

    fn read(&self) -> RegistryResult<RwLockReadGuard<'_, RecordsRegistry>> {
        self.state.read().map_err(|_| RegistryError::LockPoisoned)
    }

    /// Applies `op` under the write lock. `op` reports whether it changed the state; unchanged
    /// state is neither copied back nor written to the snapshot.
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut RecordsRegistry) -> RegistryResult<(T, bool)>,
    ) -> RegistryResult<T> {
        let mut guard = self.state.write().map_err(|_| RegistryError::LockPoisoned)?;

        let Some(store) = &self.store else {
            return op(&mut *guard).map(|(out, _)| out);
        };

        let mut next = guard.clone();
        let (out, changed) = op(&mut next)?;
        if !changed {
            return Ok(out);
        }
        if let Err(e) = store.save(&next) {
            tracing::error!("failed to persist registry snapshot: {}", e);
            return Err(e);
        }
        *guard = next;
        Ok(out)
    }

    pub fn register_doctor(&self, caller: &Identity) -> RegistryResult<()> {
        if self.is_doctor(caller)? {
            return Ok(());
        }
        let newly = self.mutate(|reg| {
            let newly = reg.register_doctor(caller);
            Ok((newly, newly))
        })?;
        if newly {
            tracing::info!(doctor = %caller, "doctor registered");
        }
        Ok(())
    }

    pub fn is_doctor(&self, identity: &Identity) -> RegistryResult<bool> {
        Ok(self.read()?.is_doctor(identity))
    }

    pub fn enroll_patient(
        &self,
        caller: &Identity,
        patient_id: Identity,
        name: String,
    ) -> RegistryResult<Patient> {
        let patient = self
            .mutate(|reg| {
                let unchanged = reg.patient(&patient_id).is_ok_and(|p| p.name == name);
                let patient = reg.enroll_patient(caller, patient_id, name)?;
                Ok((patient, !unchanged))
            })
            .inspect_err(|e| log_denied(e, "enroll_patient"))?;
        tracing::info!(doctor = %caller, patient = %patient.id, "patient enrolled");
        Ok(patient)
    }

    pub fn patient(&self, patient_id: &Identity) -> RegistryResult<Patient> {
        self.read()?.patient(patient_id).cloned()
    }

    pub fn all_patients(&self, caller: &Identity) -> RegistryResult<Vec<Patient>> {
        self.read()?
            .all_patients(caller)
            .inspect_err(|e| log_denied(e, "all_patients"))
    }

    pub fn append_record(&self, caller: &Identity, new: NewRecord) -> RegistryResult<Record> {
        let record = self
            .mutate(|reg| Ok((reg.append_record(caller, new)?, true)))
            .inspect_err(|e| log_denied(e, "append_record"))?;
        tracing::info!(
            doctor = %caller,
            patient = %record.patient_id,
            cid = %record.cid,
            "record appended"
        );
        Ok(record)
    }

    pub fn patient_records(
        &self,
        caller: &Identity,
        patient_id: &Identity,
    ) -> RegistryResult<Vec<Record>> {
        self.read()?
            .patient_records(caller, patient_id)
            .map(<[Record]>::to_vec)
            .inspect_err(|e| log_denied(e, "patient_records"))
    }

    pub fn record_count(&self, caller: &Identity, patient_id: &Identity) -> RegistryResult<usize> {
        self.read()?
            .record_count(caller, patient_id)
            .inspect_err(|e| log_denied(e, "record_count"))
    }
}

fn log_denied(err: &RegistryError, operation: &str) {
    if let RegistryError::Unauthorized { caller } = err {
        tracing::warn!(%caller, operation, "non-doctor caller rejected");
    }
}
