use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Platform,
    Terminal,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Platform => "platform",
            RecordKind::Terminal => "terminal",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Startup recovery failures that must stop the process.
///
/// Every other recovery failure is logged and absorbed by its phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecoveryError {
    /// A persisted record could not be turned into a live handler.
    CorruptPersistedState {
        kind: RecordKind,
        key: String,
        reason: String,
    },
    /// Two persisted records resolved to the same registry key.
    RegistryConflict { kind: RecordKind, key: String },
}

impl RecoveryError {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::CorruptPersistedState { kind, .. } | Self::RegistryConflict { kind, .. } => *kind,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::CorruptPersistedState { key, .. } | Self::RegistryConflict { key, .. } => key,
        }
    }
}

impl fmt::Display for RecoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CorruptPersistedState { kind, key, reason } => {
                write!(f, "RECOVERY_CORRUPT_STATE {kind} '{key}': {reason}")
            }
            Self::RegistryConflict { kind, key } => {
                write!(f, "RECOVERY_REGISTRY_CONFLICT {kind} '{key}' registered twice")
            }
        }
    }
}

impl std::error::Error for RecoveryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_kind_and_key() {
        let err = RecoveryError::CorruptPersistedState {
            kind: RecordKind::Platform,
            key: "10.1.1.1:5060".to_string(),
            reason: "empty server id".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "RECOVERY_CORRUPT_STATE platform '10.1.1.1:5060': empty server id"
        );
        assert_eq!(err.kind(), RecordKind::Platform);

        let err = RecoveryError::RegistryConflict {
            kind: RecordKind::Terminal,
            key: "13800000000".to_string(),
        };
        assert_eq!(err.key(), "13800000000");
        assert!(err.to_string().contains("registered twice"));
    }
}
