use crate::{auth::AuthUser, error::AppError, models::ResourceKind};

/// Coarse access role derived from the identity's role id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRole {
    Admin,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn is_mutation(self) -> bool {
        matches!(self, Action::Create | Action::Update | Action::Delete)
    }
}

/// An operation requested against one resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub resource: ResourceKind,
    pub action: Action,
}

impl Operation {
    pub fn new(resource: ResourceKind, action: Action) -> Self {
        Self { resource, action }
    }
}

/// Internal reason for a denial. Logged, never returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    AdminOnly,
    NotOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

/// AccessPolicy
///
/// Decides whether a verified identity may perform an operation.
///
/// - List/Read: any authenticated identity.
/// - Role and Division mutations: Admin only.
/// - Employee mutations: Admin always; User only on its own record.
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy {
    admin_role_id: i64,
}

impl AccessPolicy {
    pub fn new(admin_role_id: i64) -> Self {
        Self { admin_role_id }
    }

    pub fn role_of(&self, user: &AuthUser) -> AccessRole {
        if user.role_id == self.admin_role_id {
            AccessRole::Admin
        } else {
            AccessRole::User
        }
    }

    pub fn authorize(
        &self,
        user: &AuthUser,
        operation: Operation,
        resource_owner_id: Option<i64>,
    ) -> Decision {
        if !operation.action.is_mutation() {
            return Decision::Allow;
        }
        if self.role_of(user) == AccessRole::Admin {
            return Decision::Allow;
        }

        match operation.resource {
            ResourceKind::Role | ResourceKind::Division => Decision::Deny(DenyReason::AdminOnly),
            ResourceKind::Employee => match resource_owner_id {
                Some(owner) if owner == user.id && operation.action != Action::Create => {
                    Decision::Allow
                }
                _ => Decision::Deny(DenyReason::NotOwner),
            },
        }
    }

    /// Like `authorize`, but as a `Result` carrying the uniform `Unauthorized` failure.
    pub fn enforce(
        &self,
        user: &AuthUser,
        operation: Operation,
        resource_owner_id: Option<i64>,
    ) -> Result<(), AppError> {
        match self.authorize(user, operation, resource_owner_id) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                tracing::debug!(
                    user_id = user.id,
                    resource = operation.resource.as_str(),
                    action = ?operation.action,
                    ?reason,
                    "operation denied"
                );
                Err(AppError::Unauthorized)
            }
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(1)
    }
}
