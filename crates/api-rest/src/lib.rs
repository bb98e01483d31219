//! # API REST
//!
//! REST API implementation for HRM.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! The caller identity is read from the `x-caller-id` header on every request that needs one.
//! Uses `api-shared` for common types and utilities.

#![warn(rust_2018_idioms)]

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::auth::{self, AuthError, CALLER_ID_HEADER};
use api_shared::{pb, HealthService};
use hrm_core::wire::parse_identity;
use hrm_core::{Identity, NewRecord, RegistryError, RegistryResult, RegistryService};

/// Application state shared across REST API handlers
#[derive(Clone)]
pub struct AppState {
    registry: RegistryService,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        register_doctor,
        is_doctor,
        enroll_patient,
        list_patients,
        get_patient,
        append_record,
        list_records,
    ),
    components(schemas(
        pb::HealthRes,
        pb::Patient,
        pb::Record,
        pb::RegisterDoctorRes,
        pb::IsDoctorRes,
        pb::EnrollPatientReq,
        pb::EnrollPatientRes,
        pb::GetPatientRes,
        pb::ListPatientsRes,
        pb::AppendRecordReq,
        pb::AppendRecordRes,
        pb::ListRecordsRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router over a shared registry.
pub fn router(registry: RegistryService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/doctors", post(register_doctor))
        .route("/doctors/:id", get(is_doctor))
        .route("/patients", get(list_patients).post(enroll_patient))
        .route("/patients/:id", get(get_patient))
        .route(
            "/patients/:id/records",
            get(list_records).post(append_record),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState { registry })
}

/// The authenticated caller taken from the `x-caller-id` header.
pub struct Caller(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts.headers.get(CALLER_ID_HEADER).map(|v| v.to_str());
        Ok(Caller(auth::caller_identity(raw)?))
    }
}

/// Errors surfaced by handlers, rendered as a status code plus a short message.
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Registry(RegistryError),
    Task(tokio::task::JoinError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::Registry(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Auth(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
            ApiError::Registry(e @ RegistryError::Unauthorized { .. }) => {
                (StatusCode::FORBIDDEN, e.to_string())
            }
            ApiError::Registry(e @ RegistryError::PatientNotFound(_)) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            ApiError::Registry(e @ RegistryError::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Registry(e) => {
                tracing::error!("registry error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
            ApiError::Task(e) => {
                tracing::error!("registry task failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };
        (status, message).into_response()
    }
}

/// Runs a registry mutation on the blocking pool so snapshot writes do not stall the executor.
async fn blocking<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> RegistryResult<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(op)
        .await
        .map_err(ApiError::Task)??)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = pb::HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<pb::HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/doctors",
    params(("x-caller-id" = String, Header, description = "Authenticated caller identity")),
    responses(
        (status = 200, description = "Caller holds the doctor role", body = pb::RegisterDoctorRes),
        (status = 401, description = "Missing caller identity")
    )
)]
/// Grants the doctor role to the caller.
///
/// Open to any caller and idempotent.
#[axum::debug_handler]
async fn register_doctor(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<pb::RegisterDoctorRes>, ApiError> {
    let doctor = caller.clone();
    blocking(move || state.registry.register_doctor(&doctor)).await?;
    Ok(Json(pb::RegisterDoctorRes {
        doctor_id: caller.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/doctors/{id}",
    params(("id" = String, Path, description = "Identity to check")),
    responses(
        (status = 200, description = "Doctor flag", body = pb::IsDoctorRes),
        (status = 400, description = "Blank identity")
    )
)]
#[axum::debug_handler]
async fn is_doctor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<pb::IsDoctorRes>, ApiError> {
    let identity = parse_identity("id", &id)?;
    let is_doctor = state.registry.is_doctor(&identity)?;
    Ok(Json(pb::IsDoctorRes {
        identity: identity.to_string(),
        is_doctor,
    }))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = pb::EnrollPatientReq,
    params(("x-caller-id" = String, Header, description = "Authenticated caller identity")),
    responses(
        (status = 201, description = "Patient enrolled or renamed", body = pb::EnrollPatientRes),
        (status = 400, description = "Blank patient id"),
        (status = 401, description = "Missing caller identity"),
        (status = 403, description = "Caller is not a doctor")
    )
)]
/// Enrolls a patient, or replaces the name of an already enrolled one.
#[axum::debug_handler]
async fn enroll_patient(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<pb::EnrollPatientReq>,
) -> Result<(StatusCode, Json<pb::EnrollPatientRes>), ApiError> {
    let patient_id = parse_identity("patient_id", &req.patient_id)?;
    let patient =
        blocking(move || state.registry.enroll_patient(&caller, patient_id, req.name)).await?;
    Ok((
        StatusCode::CREATED,
        Json(pb::EnrollPatientRes {
            patient: Some(patient.into()),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/patients",
    params(("x-caller-id" = String, Header, description = "Authenticated caller identity")),
    responses(
        (status = 200, description = "All patients in enrollment order", body = pb::ListPatientsRes),
        (status = 401, description = "Missing caller identity"),
        (status = 403, description = "Caller is not a doctor")
    )
)]
#[axum::debug_handler]
async fn list_patients(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<pb::ListPatientsRes>, ApiError> {
    let patients = state.registry.all_patients(&caller)?;
    Ok(Json(pb::ListPatientsRes {
        patients: patients.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient identity")),
    responses(
        (status = 200, description = "Patient directory entry", body = pb::GetPatientRes),
        (status = 404, description = "Patient not enrolled")
    )
)]
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<pb::GetPatientRes>, ApiError> {
    let patient_id = parse_identity("id", &id)?;
    let patient = state.registry.patient(&patient_id)?;
    Ok(Json(pb::GetPatientRes {
        patient: Some(patient.into()),
    }))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/records",
    request_body = pb::AppendRecordReq,
    params(
        ("id" = String, Path, description = "Patient identity; overrides patient_id in the body"),
        ("x-caller-id" = String, Header, description = "Authenticated caller identity")
    ),
    responses(
        (status = 201, description = "Record appended", body = pb::AppendRecordRes),
        (status = 401, description = "Missing caller identity"),
        (status = 403, description = "Caller is not a doctor")
    )
)]
/// Appends a record to a patient's history.
///
/// The patient does not have to be enrolled first.
#[axum::debug_handler]
async fn append_record(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    Json(mut req): Json<pb::AppendRecordReq>,
) -> Result<(StatusCode, Json<pb::AppendRecordRes>), ApiError> {
    req.patient_id = id;
    let new = NewRecord::try_from(req)?;
    let record = blocking(move || state.registry.append_record(&caller, new)).await?;
    Ok((
        StatusCode::CREATED,
        Json(pb::AppendRecordRes {
            record: Some(record.into()),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/records",
    params(
        ("id" = String, Path, description = "Patient identity"),
        ("x-caller-id" = String, Header, description = "Authenticated caller identity")
    ),
    responses(
        (status = 200, description = "Records in append order", body = pb::ListRecordsRes),
        (status = 401, description = "Missing caller identity"),
        (status = 403, description = "Caller is not a doctor")
    )
)]
#[axum::debug_handler]
async fn list_records(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> Result<Json<pb::ListRecordsRes>, ApiError> {
    let patient_id = parse_identity("id", &id)?;
    let records = state.registry.patient_records(&caller, &patient_id)?;
    Ok(Json(pb::ListRecordsRes {
        patient_id: patient_id.to_string(),
        records: records.into_iter().map(Into::into).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        caller: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(caller) = caller {
            builder = builder.header(CALLER_ID_HEADER, caller);
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn alice_record() -> Value {
        json!({
            "cid": "QmTestCID123",
            "file_name": "report.pdf",
            "patient_name": "Alice Wonderland",
            "diagnosis": "Flu",
            "treatment": "Rest and fluids"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(RegistryService::in_memory());
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let app = router(RegistryService::in_memory());

        let (status, body) = send(&app, Method::POST, "/doctors", Some("D1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["doctor_id"], json!("D1"));

        let (_, body) = send(&app, Method::GET, "/doctors/D1", None, None).await;
        assert_eq!(body["is_doctor"], json!(true));

        let (status, _) = send(
            &app,
            Method::POST,
            "/patients",
            Some("D1"),
            Some(json!({"patient_id": "P1", "name": "Alice Wonderland"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, Method::GET, "/patients", Some("D1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["patients"],
            json!([{"id": "P1", "name": "Alice Wonderland"}])
        );

        let (status, _) = send(
            &app,
            Method::POST,
            "/patients/P1/records",
            Some("D1"),
            Some(alice_record()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) =
            send(&app, Method::GET, "/patients/P1/records", Some("D1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["records"],
            json!([{
                "cid": "QmTestCID123",
                "file_name": "report.pdf",
                "patient_name": "Alice Wonderland",
                "patient_id": "P1",
                "diagnosis": "Flu",
                "treatment": "Rest and fluids",
                "doctor_id": "D1"
            }])
        );
    }

    #[tokio::test]
    async fn test_missing_caller_is_401() {
        let app = router(RegistryService::in_memory());
        let (status, _) = send(&app, Method::POST, "/doctors", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, Method::GET, "/patients", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_non_doctor_is_403() {
        let app = router(RegistryService::in_memory());

        let (status, _) = send(
            &app,
            Method::POST,
            "/patients",
            Some("C"),
            Some(json!({"patient_id": "P1", "name": "Alice"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            Method::POST,
            "/patients/P1/records",
            Some("C"),
            Some(alice_record()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::GET, "/patients/P1/records", Some("C"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::GET, "/patients", Some("C"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_patient_lookup() {
        let app = router(RegistryService::in_memory());
        let (status, _) = send(&app, Method::GET, "/patients/P1", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send(&app, Method::POST, "/doctors", Some("D1"), None).await;
        send(
            &app,
            Method::POST,
            "/patients",
            Some("D1"),
            Some(json!({"patient_id": "P1", "name": "Alice"})),
        )
        .await;

        let (status, body) = send(&app, Method::GET, "/patients/P1", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["patient"]["name"], json!("Alice"));
    }

    #[tokio::test]
    async fn test_path_id_overrides_body() {
        let app = router(RegistryService::in_memory());
        send(&app, Method::POST, "/doctors", Some("D1"), None).await;

        let mut record = alice_record();
        record["patient_id"] = json!("someone-else");
        let (status, body) = send(
            &app,
            Method::POST,
            "/patients/P1/records",
            Some("D1"),
            Some(record),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["record"]["patient_id"], json!("P1"));
    }

    #[tokio::test]
    async fn test_empty_history_is_200() {
        let app = router(RegistryService::in_memory());
        send(&app, Method::POST, "/doctors", Some("D1"), None).await;

        let (status, body) =
            send(&app, Method::GET, "/patients/P9/records", Some("D1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records"], json!([]));
    }

    #[tokio::test]
    async fn test_blank_patient_id_is_400() {
        let app = router(RegistryService::in_memory());
        send(&app, Method::POST, "/doctors", Some("D1"), None).await;

        let (status, _) = send(
            &app,
            Method::POST,
            "/patients",
            Some("D1"),
            Some(json!({"patient_id": "  ", "name": "Nobody"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
