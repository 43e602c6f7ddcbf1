//! Identity used to locate the remote Orb service.

use std::fmt;

/// Namespace the Orb bridge service lives in.
pub const ORB_PACKAGE: &str = "org.orbtv.orbservice";
/// Fully qualified name of the bridge service entry point.
pub const ORB_BRIDGE_SERVICE: &str = "org.orbtv.orbservice.BridgeService";

/// Identifies the remote service: a service namespace plus an entry-point
/// name within it. Constructed once at startup; not reconfigurable at
/// runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceEndpoint {
    namespace: String,
    entry_point: String,
}

impl ServiceEndpoint {
    pub fn new(namespace: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entry_point: entry_point.into(),
        }
    }

    /// The well-known Orb bridge service endpoint.
    pub fn orb_bridge() -> Self {
        Self::new(ORB_PACKAGE, ORB_BRIDGE_SERVICE)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.entry_point)
    }
}

/// One candidate produced by endpoint resolution.
///
/// Resolution is diagnostic: an empty candidate list is logged but never
/// gates a bind attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedService {
    pub namespace: String,
    pub entry_point: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orb_bridge_endpoint_uses_well_known_names() {
        let endpoint = ServiceEndpoint::orb_bridge();
        assert_eq!(endpoint.namespace(), ORB_PACKAGE);
        assert_eq!(endpoint.entry_point(), ORB_BRIDGE_SERVICE);
        assert_eq!(
            endpoint.to_string(),
            "org.orbtv.orbservice/org.orbtv.orbservice.BridgeService"
        );
    }
}
