use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.port must be positive")]
    InvalidPort,

    #[error("server.timeout_secs must be positive")]
    InvalidTimeout,

    #[error("files.max_file_size must be positive")]
    InvalidMaxFileSize,

    #[error("files.allowed_extensions must not be empty")]
    NoAllowedExtensions,

    #[error("files.allowed_extensions contains an empty entry")]
    EmptyExtension,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_files(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.port == 0 {
        return Err(ValidationError::InvalidPort);
    }
    if config.server.timeout_secs == 0 {
        return Err(ValidationError::InvalidTimeout);
    }
    Ok(())
}

fn validate_files(config: &Config) -> Result<(), ValidationError> {
    if config.files.max_file_size.as_u64() == 0 {
        return Err(ValidationError::InvalidMaxFileSize);
    }
    if config.files.allowed_extensions.is_empty() {
        return Err(ValidationError::NoAllowedExtensions);
    }
    if config
        .files
        .allowed_extensions
        .iter()
        .any(|ext| ext.trim().is_empty())
    {
        return Err(ValidationError::EmptyExtension);
    }
    Ok(())
}
