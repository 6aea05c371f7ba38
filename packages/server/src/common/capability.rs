/// Staff capabilities for the membership platform.
///
/// Capability verification happens at the edge (token middleware / admin
/// console), before an operation reaches the registration orchestrator. The
/// orchestrator only carries the verified capability as evidence of who
/// authorized the call — it never re-checks privileges itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffCapability {
    /// Decide pending registrations (approve / reject)
    ApproveRegistrations,

    /// Trigger materialization of approved registrations
    ExecuteRegistrations,

    /// Full admin access to all operations
    FullAdmin,
}

impl StaffCapability {
    /// Check whether this capability covers the `required` one.
    pub fn allows(&self, required: StaffCapability) -> bool {
        *self == StaffCapability::FullAdmin || *self == required
    }

    /// Stable name used in tracing fields and audit events.
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffCapability::ApproveRegistrations => "approve_registrations",
            StaffCapability::ExecuteRegistrations => "execute_registrations",
            StaffCapability::FullAdmin => "full_admin",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_admin_allows_everything() {
        assert!(StaffCapability::FullAdmin.allows(StaffCapability::ApproveRegistrations));
        assert!(StaffCapability::FullAdmin.allows(StaffCapability::ExecuteRegistrations));
    }

    #[test]
    fn narrow_capability_only_allows_itself() {
        let cap = StaffCapability::ApproveRegistrations;
        assert!(cap.allows(StaffCapability::ApproveRegistrations));
        assert!(!cap.allows(StaffCapability::ExecuteRegistrations));
    }
}
