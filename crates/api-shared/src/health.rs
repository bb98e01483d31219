use crate::pb::HealthRes;

/// Simple health service that can be used by both gRPC and REST APIs
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Reports the service as alive.
    ///
    /// The registry is in-process, so there is nothing further to probe; if the process can
    /// answer, it is healthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "HRM is alive".into(),
        }
    }
}
