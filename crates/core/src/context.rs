//! Caller-supplied operation context.

use serde::{Deserialize, Serialize};
use treasury_shared::types::{ActorId, CompanyId};

/// Who is acting, and on behalf of which company.
///
/// Every operation is scoped to `company_id`; `actor_id` is stored as an
/// opaque audit stamp. Permission checks happen before the engine is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationContext {
    /// Tenant owning every record touched by the operation.
    pub company_id: CompanyId,
    /// User performing the operation.
    pub actor_id: ActorId,
}

impl OperationContext {
    /// Creates a new operation context.
    #[must_use]
    pub const fn new(company_id: CompanyId, actor_id: ActorId) -> Self {
        Self {
            company_id,
            actor_id,
        }
    }
}
