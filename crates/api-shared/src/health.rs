use crate::pb::HealthRes;

/// Liveness answer for the gRPC `Health` RPC.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Reports the backend as alive.
    ///
    /// The CRUD backend holds no connections that can degrade independently of the process, so
    /// being able to answer is the health signal.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "EHR CRUD service is alive".into(),
        }
    }
}
