//! Workspace context: the shared mutable store passed to every operation.

use crate::ident::{IdentitySource, SystemIdentity};
use crate::repository::ElementRepository;
use crate::scene::SceneState;

/// The process-wide store: element repository, scene state and the identity
/// capability, bundled for dependency injection.
///
/// The workspace itself carries no locking; callers that share it across
/// threads wrap it in an exclusive/shared lock and hold the exclusive side
/// for the duration of every mutating operation.
pub struct Workspace {
    pub repository: ElementRepository,
    pub scene: SceneState,
    pub ids: Box<dyn IdentitySource>,
}

impl Workspace {
    /// Workspace with the production identity source.
    pub fn new() -> Self {
        Self::with_identity(Box::new(SystemIdentity::new()))
    }

    /// Workspace with an injected identity source (deterministic in tests).
    pub fn with_identity(ids: Box<dyn IdentitySource>) -> Self {
        Self {
            repository: ElementRepository::new(),
            scene: SceneState::new(),
            ids,
        }
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}
