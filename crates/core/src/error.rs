use hrm_types::Identity;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("caller {caller} is not a registered doctor")]
    Unauthorized { caller: Identity },
    #[error("patient {0} not found")]
    PatientNotFound(Identity),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("registry lock poisoned")]
    LockPoisoned,

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write registry snapshot: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read registry snapshot: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize registry: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize registry: {0}")]
    Deserialization(serde_json::Error),
    #[error("corrupt registry snapshot: {0}")]
    CorruptSnapshot(String),
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
