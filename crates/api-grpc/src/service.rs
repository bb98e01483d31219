// Re-export the proto module from the shared `api-shared` crate so callers
// can continue to reference `api_grpc::service::pb`.
pub use api_shared::pb;

use api_shared::auth::{self, API_KEY_HEADER, CALLER_ID_HEADER};
use api_shared::pb::hrm_server::Hrm;
use api_shared::HealthService;
use hrm_core::wire::parse_identity;
use hrm_core::{Identity, NewRecord, RegistryError, RegistryResult, RegistryService};
use std::sync::Arc;
use tonic::{Request, Response, Status};

/// Builds the interceptor that checks `x-api-key` against the key configured at startup.
///
/// With `None` every request passes; the caller identity is still required per call.
pub fn api_key_interceptor(
    expected: Option<Arc<str>>,
) -> impl FnMut(Request<()>) -> Result<Request<()>, Status> + Clone {
    move |req: Request<()>| {
        if let Some(expected) = &expected {
            let provided = req
                .metadata()
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok());
            auth::validate_api_key(provided, expected)?;
        }
        Ok(req)
    }
}

#[allow(clippy::result_large_err)]
fn caller<T>(req: &Request<T>) -> Result<Identity, Status> {
    let raw = req.metadata().get(CALLER_ID_HEADER).map(|v| v.to_str());
    Ok(auth::caller_identity(raw)?)
}

fn to_status(err: RegistryError) -> Status {
    match err {
        RegistryError::Unauthorized { .. } => Status::permission_denied(err.to_string()),
        RegistryError::PatientNotFound(_) => Status::not_found(err.to_string()),
        RegistryError::InvalidInput(_) => Status::invalid_argument(err.to_string()),
        other => {
            tracing::error!("registry error: {:?}", other);
            Status::internal("Internal error")
        }
    }
}

/// Runs a registry mutation on the blocking pool; snapshot writes must not stall the executor.
async fn blocking<T, F>(op: F) -> Result<T, Status>
where
    F: FnOnce() -> RegistryResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| {
            tracing::error!("registry task failed: {}", e);
            Status::internal("Internal error")
        })?
        .map_err(to_status)
}

#[derive(Default, Clone)]
pub struct HrmService {
    registry: RegistryService,
}

impl HrmService {
    pub fn new(registry: RegistryService) -> Self {
        Self { registry }
    }
}

#[tonic::async_trait]
impl Hrm for HrmService {
    async fn health(&self, _req: Request<()>) -> Result<Response<pb::HealthRes>, Status> {
        Ok(Response::new(HealthService::check_health()))
    }

    async fn register_doctor(
        &self,
        req: Request<()>,
    ) -> Result<Response<pb::RegisterDoctorRes>, Status> {
        let caller = caller(&req)?;
        let registry = self.registry.clone();
        let doctor = caller.clone();
        blocking(move || registry.register_doctor(&doctor)).await?;
        Ok(Response::new(pb::RegisterDoctorRes {
            doctor_id: caller.to_string(),
        }))
    }

    async fn is_doctor(
        &self,
        req: Request<pb::IsDoctorReq>,
    ) -> Result<Response<pb::IsDoctorRes>, Status> {
        let identity = parse_identity("identity", &req.get_ref().identity).map_err(to_status)?;
        let is_doctor = self.registry.is_doctor(&identity).map_err(to_status)?;
        Ok(Response::new(pb::IsDoctorRes {
            identity: identity.to_string(),
            is_doctor,
        }))
    }

    async fn enroll_patient(
        &self,
        req: Request<pb::EnrollPatientReq>,
    ) -> Result<Response<pb::EnrollPatientRes>, Status> {
        let caller = caller(&req)?;
        let req = req.into_inner();
        let patient_id = parse_identity("patient_id", &req.patient_id).map_err(to_status)?;

        let registry = self.registry.clone();
        let patient =
            blocking(move || registry.enroll_patient(&caller, patient_id, req.name)).await?;
        Ok(Response::new(pb::EnrollPatientRes {
            patient: Some(patient.into()),
        }))
    }

    async fn get_patient(
        &self,
        req: Request<pb::GetPatientReq>,
    ) -> Result<Response<pb::GetPatientRes>, Status> {
        let patient_id =
            parse_identity("patient_id", &req.get_ref().patient_id).map_err(to_status)?;
        let patient = self.registry.patient(&patient_id).map_err(to_status)?;
        Ok(Response::new(pb::GetPatientRes {
            patient: Some(patient.into()),
        }))
    }

    async fn list_patients(
        &self,
        req: Request<()>,
    ) -> Result<Response<pb::ListPatientsRes>, Status> {
        let caller = caller(&req)?;
        let patients = self.registry.all_patients(&caller).map_err(to_status)?;
        Ok(Response::new(pb::ListPatientsRes {
            patients: patients.into_iter().map(Into::into).collect(),
        }))
    }

    async fn append_record(
        &self,
        req: Request<pb::AppendRecordReq>,
    ) -> Result<Response<pb::AppendRecordRes>, Status> {
        let caller = caller(&req)?;
        let new = NewRecord::try_from(req.into_inner()).map_err(to_status)?;

        let registry = self.registry.clone();
        let record = blocking(move || registry.append_record(&caller, new)).await?;
        Ok(Response::new(pb::AppendRecordRes {
            record: Some(record.into()),
        }))
    }

    async fn list_records(
        &self,
        req: Request<pb::ListRecordsReq>,
    ) -> Result<Response<pb::ListRecordsRes>, Status> {
        let caller = caller(&req)?;
        let patient_id =
            parse_identity("patient_id", &req.get_ref().patient_id).map_err(to_status)?;

        let records = self
            .registry
            .patient_records(&caller, &patient_id)
            .map_err(to_status)?;
        Ok(Response::new(pb::ListRecordsRes {
            patient_id: patient_id.to_string(),
            records: records.into_iter().map(Into::into).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    fn with_caller<T>(caller: &str, msg: T) -> Request<T> {
        let mut req = Request::new(msg);
        req.metadata_mut()
            .insert(CALLER_ID_HEADER, caller.parse().unwrap());
        req
    }

    async fn doctor_service(doctor: &str) -> HrmService {
        let svc = HrmService::default();
        svc.register_doctor(with_caller(doctor, ())).await.unwrap();
        svc
    }

    fn alice_record(patient_id: &str) -> pb::AppendRecordReq {
        pb::AppendRecordReq {
            cid: "QmTestCID123".into(),
            file_name: "report.pdf".into(),
            patient_name: "Alice Wonderland".into(),
            patient_id: patient_id.into(),
            diagnosis: "Flu".into(),
            treatment: "Rest and fluids".into(),
        }
    }

    #[tokio::test]
    async fn test_health() {
        let svc = HrmService::default();
        let res = svc.health(Request::new(())).await.unwrap().into_inner();
        assert!(res.ok);
    }

    #[tokio::test]
    async fn test_register_and_query_doctor() {
        let svc = doctor_service("0xD0c1").await;

        let res = svc
            .is_doctor(Request::new(pb::IsDoctorReq {
                identity: "0xD0c1".into(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(res.is_doctor);

        let res = svc
            .is_doctor(Request::new(pb::IsDoctorReq {
                identity: "0xStranger".into(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(!res.is_doctor);
    }

    #[tokio::test]
    async fn test_missing_caller_is_unauthenticated() {
        let svc = HrmService::default();
        let err = svc.register_doctor(Request::new(())).await.unwrap_err();
        assert_eq!(err.code(), Code::Unauthenticated);

        let err = svc
            .list_patients(with_caller("   ", ()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::Unauthenticated);
    }

    #[tokio::test]
    async fn test_non_doctor_is_permission_denied() {
        let svc = HrmService::default();

        let err = svc
            .enroll_patient(with_caller(
                "0xC",
                pb::EnrollPatientReq {
                    patient_id: "0xP1".into(),
                    name: "Alice".into(),
                },
            ))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::PermissionDenied);

        let err = svc
            .append_record(with_caller("0xC", alice_record("0xP1")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::PermissionDenied);

        let err = svc
            .list_records(with_caller(
                "0xC",
                pb::ListRecordsReq {
                    patient_id: "0xP1".into(),
                },
            ))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::PermissionDenied);

        let err = svc
            .list_patients(with_caller("0xC", ()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::PermissionDenied);
    }

    #[tokio::test]
    async fn test_enroll_append_and_list() {
        let svc = doctor_service("0xD1").await;

        svc.enroll_patient(with_caller(
            "0xD1",
            pb::EnrollPatientReq {
                patient_id: "0xP1".into(),
                name: "Alice Wonderland".into(),
            },
        ))
        .await
        .unwrap();

        let patient = svc
            .get_patient(Request::new(pb::GetPatientReq {
                patient_id: "0xP1".into(),
            }))
            .await
            .unwrap()
            .into_inner()
            .patient
            .unwrap();
        assert_eq!(patient.name, "Alice Wonderland");

        let list = svc
            .list_patients(with_caller("0xD1", ()))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(list.patients, vec![patient]);

        svc.append_record(with_caller("0xD1", alice_record("0xP1")))
            .await
            .unwrap();
        let records = svc
            .list_records(with_caller(
                "0xD1",
                pb::ListRecordsReq {
                    patient_id: "0xP1".into(),
                },
            ))
            .await
            .unwrap()
            .into_inner()
            .records;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cid, "QmTestCID123");
        assert_eq!(records[0].doctor_id, "0xD1");
    }

    #[tokio::test]
    async fn test_unknown_patient_is_not_found() {
        let svc = HrmService::default();
        let err = svc
            .get_patient(Request::new(pb::GetPatientReq {
                patient_id: "0xNobody".into(),
            }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_blank_patient_id_is_invalid_argument() {
        let svc = doctor_service("0xD1").await;
        let err = svc
            .append_record(with_caller("0xD1", alice_record("")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
    }

    #[test]
    fn test_api_key_interceptor() {
        let mut open = api_key_interceptor(None);
        assert!(open(Request::new(())).is_ok());

        let mut guarded = api_key_interceptor(Some(Arc::from("s3cret")));
        let err = guarded(Request::new(())).unwrap_err();
        assert_eq!(err.code(), Code::Unauthenticated);

        let mut req = Request::new(());
        req.metadata_mut()
            .insert(API_KEY_HEADER, "s3cret".parse().unwrap());
        assert!(guarded(req).is_ok());
    }
}
