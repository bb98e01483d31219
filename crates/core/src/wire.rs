//! Conversions between registry types and the generated protobuf types.
//!
//! Both transports speak `pb` types; identities arrive as plain strings and are validated here
//! so gRPC and REST reject the same inputs.

use crate::error::{RegistryError, RegistryResult};
use crate::pb;
use crate::registry::{NewRecord, Patient, Record};
use hrm_types::Identity;

/// Parses an identity field from a request, naming the field in the error.
pub fn parse_identity(field: &str, value: &str) -> RegistryResult<Identity> {
    Identity::new(value).map_err(|e| RegistryError::InvalidInput(format!("{field}: {e}")))
}

impl From<Patient> for pb::Patient {
    fn from(p: Patient) -> Self {
        pb::Patient {
            id: p.id.to_string(),
            name: p.name,
        }
    }
}

impl From<Record> for pb::Record {
    fn from(r: Record) -> Self {
        pb::Record {
            cid: r.cid,
            file_name: r.file_name,
            patient_name: r.patient_name,
            patient_id: r.patient_id.to_string(),
            diagnosis: r.diagnosis,
            treatment: r.treatment,
            doctor_id: r.doctor_id.to_string(),
        }
    }
}

impl TryFrom<pb::AppendRecordReq> for NewRecord {
    type Error = RegistryError;

    fn try_from(req: pb::AppendRecordReq) -> RegistryResult<Self> {
        Ok(NewRecord {
            patient_id: parse_identity("patient_id", &req.patient_id)?,
            cid: req.cid,
            file_name: req.file_name,
            patient_name: req.patient_name,
            diagnosis: req.diagnosis,
            treatment: req.treatment,
        })
    }
}
