//! Resolution of opaque project ids into canonical slug/title.

use tracing::{debug, warn};

use crate::core::types::{ProjectInfo, ProjectRef, ResolutionFailure, ResolutionReason};
use crate::io::modrinth::{LookupError, ProjectLookup};

impl From<LookupError> for ResolutionReason {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound => ResolutionReason::NotFound,
            LookupError::Transport(msg) => ResolutionReason::Transport(msg),
            LookupError::Malformed(msg) => ResolutionReason::Malformed(msg),
        }
    }
}

/// Look up one project. Exactly one lookup call, no retries.
pub fn resolve<L: ProjectLookup + ?Sized>(
    lookup: &L,
    project: &ProjectRef,
) -> Result<ProjectInfo, ResolutionFailure> {
    match lookup.fetch_project(&project.id) {
        Ok(info) => {
            debug!(id = %project.id, slug = %info.slug, "resolved");
            Ok(info)
        }
        Err(err) => {
            warn!(id = %project.id, err = %err, "resolution failed");
            Err(ResolutionFailure {
                id: project.id.clone(),
                reason: err.into(),
            })
        }
    }
}
