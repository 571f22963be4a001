use crate::dto::HealthRes;

/// Liveness reporting shared by the REST server and the CLI.
#[derive(Clone, Debug, Default)]
pub struct HealthService;

impl HealthService {
    /// Creates a new instance of HealthService.
    pub fn new() -> Self {
        Self
    }

    /// Reports the service as alive.
    ///
    /// There is no dependency probing here: the predictor and the AI service are resolved per
    /// request, so a missing collaborator shows up on the affected route rather than here.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Guardian is alive".into(),
        }
    }
}
