use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical cycle counter of one catalyst stream.
pub type Cycle = u64;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(format!("{}-{}", $prefix, uuid::Uuid::new_v4().simple()))
            }

            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(
    /// Identifier of a [`crate::Catalyst`].
    CatalystId,
    "cat"
);
define_id!(
    /// Identifier of a [`crate::Plan`].
    PlanId,
    "plan"
);
define_id!(
    /// Identifier of a [`crate::Decision`].
    DecisionId,
    "dec"
);
define_id!(
    /// Identifier of a published [`crate::Artifact`].
    ArtifactId,
    "art"
);
define_id!(
    /// Identifier of a [`crate::Heuristic`].
    HeuristicId,
    "heu"
);
define_id!(
    /// Identifier of a [`crate::Vow`].
    VowId,
    "vow"
);
define_id!(
    /// Identifier of a [`crate::Scaffold`].
    ScaffoldId,
    "scf"
);
define_id!(
    /// Identifier of a catalyst stream (one orchestrator instance).
    StreamId,
    "stream"
);

impl StreamId {
    /// The default stream used by the CLI.
    pub fn primary() -> Self {
        Self("primary".to_string())
    }
}
