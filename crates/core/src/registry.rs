//! Doctor roles, the patient directory and per-patient record histories.
//!
//! `RecordsRegistry` is the plain state machine. It knows nothing about locking or storage;
//! [`crate::service::RegistryService`] wraps it for concurrent use and persistence.
//!
//! ## Authorization
//!
//! Anyone may register as a doctor. Enrolling patients, appending records and listing patients
//! or records require the caller to be a doctor. Looking up a single doctor flag or a single
//! patient entry is open to everyone.
//!
//! ## Ordering
//!
//! Patients are listed in first-enrollment order. Re-enrolling an id replaces the name in
//! place and does not add a second list entry. Records are listed in append order.

use crate::error::{RegistryError, RegistryResult};
use hrm_types::Identity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// A patient directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Identity,
    pub name: String,
}

/// A diagnostic record. Immutable once appended.
///
/// `patient_name` is whatever the authoring doctor supplied; it is not looked up from the
/// directory and may differ from the enrolled name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Content identifier of the externally stored file. Opaque.
    pub cid: String,
    pub file_name: String,
    pub patient_name: String,
    pub patient_id: Identity,
    pub diagnosis: String,
    pub treatment: String,
    /// The doctor who appended the record.
    pub doctor_id: Identity,
}

/// Caller-supplied fields of a record; the author is filled in from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub cid: String,
    pub file_name: String,
    pub patient_name: String,
    pub patient_id: Identity,
    pub diagnosis: String,
    pub treatment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordsRegistry {
    doctors: BTreeSet<Identity>,
    directory: BTreeMap<Identity, Patient>,
    enrollment_order: Vec<Identity>,
    histories: BTreeMap<Identity, Vec<Record>>,
}

impl RecordsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants the doctor role to `caller`.
    ///
    /// Returns `true` if the caller was not a doctor before.
    pub fn register_doctor(&mut self, caller: &Identity) -> bool {
        self.doctors.insert(caller.clone())
    }

    pub fn is_doctor(&self, identity: &Identity) -> bool {
        self.doctors.contains(identity)
    }

    fn require_doctor(&self, caller: &Identity) -> RegistryResult<()> {
        if self.is_doctor(caller) {
            Ok(())
        } else {
            Err(RegistryError::Unauthorized {
                caller: caller.clone(),
            })
        }
    }

    /// Adds or renames a patient.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Unauthorized` if `caller` is not a doctor.
    pub fn enroll_patient(
        &mut self,
        caller: &Identity,
        patient_id: Identity,
        name: String,
    ) -> RegistryResult<Patient> {
        self.require_doctor(caller)?;

        let patient = Patient {
            id: patient_id.clone(),
            name,
        };
        if self
            .directory
            .insert(patient_id.clone(), patient.clone())
            .is_none()
        {
            self.enrollment_order.push(patient_id);
        }
        Ok(patient)
    }

    /// Looks up a single directory entry. Open to any caller.
    pub fn patient(&self, patient_id: &Identity) -> RegistryResult<&Patient> {
        self.directory
            .get(patient_id)
            .ok_or_else(|| RegistryError::PatientNotFound(patient_id.clone()))
    }

    /// All enrolled patients in first-enrollment order.
    pub fn all_patients(&self, caller: &Identity) -> RegistryResult<Vec<Patient>> {
        self.require_doctor(caller)?;

        Ok(self
            .enrollment_order
            .iter()
            .filter_map(|id| self.directory.get(id))
            .cloned()
            .collect())
    }

    /// Appends a record authored by `caller` to the end of the patient's history.
    ///
    /// The patient does not need to be enrolled.
    pub fn append_record(&mut self, caller: &Identity, new: NewRecord) -> RegistryResult<Record> {
        self.require_doctor(caller)?;

        let record = Record {
            cid: new.cid,
            file_name: new.file_name,
            patient_name: new.patient_name,
            patient_id: new.patient_id,
            diagnosis: new.diagnosis,
            treatment: new.treatment,
            doctor_id: caller.clone(),
        };
        self.histories
            .entry(record.patient_id.clone())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    /// A patient's history in append order; empty when nothing has been appended.
    pub fn patient_records(
        &self,
        caller: &Identity,
        patient_id: &Identity,
    ) -> RegistryResult<&[Record]> {
        self.require_doctor(caller)?;

        Ok(self
            .histories
            .get(patient_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    pub fn record_count(&self, caller: &Identity, patient_id: &Identity) -> RegistryResult<usize> {
        Ok(self.patient_records(caller, patient_id)?.len())
    }

    /// Verifies the invariants that deserialized state cannot guarantee on its own.
    pub(crate) fn check_consistency(&self) -> RegistryResult<()> {
        let mut seen = HashSet::with_capacity(self.enrollment_order.len());
        for id in &self.enrollment_order {
            if !seen.insert(id) {
                return Err(RegistryError::CorruptSnapshot(format!(
                    "patient {id} listed more than once"
                )));
            }
            if !self.directory.contains_key(id) {
                return Err(RegistryError::CorruptSnapshot(format!(
                    "patient {id} listed but missing from directory"
                )));
            }
        }
        if seen.len() != self.directory.len() {
            return Err(RegistryError::CorruptSnapshot(
                "directory has patients missing from the enrollment list".into(),
            ));
        }

        for (id, patient) in &self.directory {
            if &patient.id != id {
                return Err(RegistryError::CorruptSnapshot(format!(
                    "directory key {id} holds patient {}",
                    patient.id
                )));
            }
        }
        for (id, records) in &self.histories {
            if let Some(r) = records.iter().find(|r| &r.patient_id != id) {
                return Err(RegistryError::CorruptSnapshot(format!(
                    "history of {id} contains a record for {}",
                    r.patient_id
                )));
            }
        }

        Ok(())
    }
}
