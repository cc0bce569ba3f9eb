use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process {pid}: {message}")]
    ProcessOpenFailed { pid: u32, message: String },

    #[error("Module not found in process memory map: {0}")]
    ModuleNotFound(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Key bytes not found in module memory")]
    KeyNotFound,

    #[error("Key address pointer not found in module memory")]
    KeyPointerNotFound,

    #[error("Invalid key hex string: {0}")]
    InvalidKeyHex(String),

    #[error("Failed to read version info from {path}: {message}")]
    VersionInfoFailed { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error means a searched-for value was simply absent,
    /// as opposed to a structural failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::ProcessNotFound(_)
                | Error::ModuleNotFound(_)
                | Error::KeyNotFound
                | Error::KeyPointerNotFound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_not_found() {
        assert!(Error::KeyNotFound.is_not_found());
        assert!(Error::ModuleNotFound("WeChatWin.dll".to_string()).is_not_found());

        let read_err = Error::MemoryReadFailed {
            address: 0x1000,
            message: "denied".to_string(),
        };
        assert!(!read_err.is_not_found());
    }
}
