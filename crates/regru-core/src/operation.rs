//! Operation routing table
//!
//! Every facade method maps to exactly one [`Operation`], and every operation
//! has a fixed protocol generation and endpoint route.

use crate::codec::ProtocolGeneration;

/// Endpoint route of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Legacy endpoint, selected by the `action` field
    Legacy {
        /// Value of the `action` field
        action: &'static str,
    },
    /// V2 endpoint `/api/regru2/<group>/<command>`
    V2 {
        /// Function group
        group: &'static str,
        /// Function name within the group
        command: &'static str,
    },
}

/// Registrar API operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Domain availability check
    DomainCheck,
    /// Domain registration
    DomainCreate,
    /// Service renewal
    ServiceRenew,
    /// Domain no-op, used to resolve a service id
    DomainNop,
    /// Service information lookup
    ServiceGetInfo,
    /// Account no-op, used as a connectivity probe
    UserNop,
    /// Add a DNS resource record
    ZoneAddRr,
    /// Remove a DNS resource record
    ZoneRmRr,
}

impl Operation {
    /// Protocol generation the operation is served by
    pub fn protocol(self) -> ProtocolGeneration {
        match self.route() {
            Route::Legacy { .. } => ProtocolGeneration::Legacy,
            Route::V2 { .. } => ProtocolGeneration::V2,
        }
    }

    /// Endpoint route of the operation
    pub fn route(self) -> Route {
        match self {
            Operation::DomainCheck => Route::V2 {
                group: "domain",
                command: "check",
            },
            Operation::DomainCreate => Route::V2 {
                group: "domain",
                command: "create",
            },
            Operation::ServiceRenew => Route::V2 {
                group: "service",
                command: "renew",
            },
            Operation::DomainNop => Route::V2 {
                group: "domain",
                command: "nop",
            },
            Operation::ServiceGetInfo => Route::V2 {
                group: "service",
                command: "get_info",
            },
            Operation::UserNop => Route::V2 {
                group: "user",
                command: "nop",
            },
            Operation::ZoneAddRr => Route::Legacy {
                action: "zone_add_rr",
            },
            Operation::ZoneRmRr => Route::Legacy {
                action: "zone_rm_rr",
            },
        }
    }

    /// Short name for logs
    pub fn name(self) -> String {
        match self.route() {
            Route::Legacy { action } => action.to_string(),
            Route::V2 { group, command } => format!("{}/{}", group, command),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}
