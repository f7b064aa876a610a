use thiserror::Error;

/// Query-side error: the caller asked about an asset the tracker cannot answer for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidAssetError {
    #[error("Missing required query parameter: coin")]
    Missing,

    #[error("Invalid coin: {0}")]
    Unknown(String),

    #[error("No data available yet for coin: {0}")]
    NoSnapshot(String),

    #[error("No price history available yet for coin: {0}")]
    NoHistory(String),
}

/// Startup configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_asset_messages() {
        assert_eq!(
            InvalidAssetError::Unknown("dogecoin".into()).to_string(),
            "Invalid coin: dogecoin"
        );
        assert_eq!(
            InvalidAssetError::Missing.to_string(),
            "Missing required query parameter: coin"
        );
    }
}
