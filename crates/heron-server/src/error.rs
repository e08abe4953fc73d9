use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a settings field path like `server.port` to its environment variable
pub fn to_env_var(field: &str) -> String {
    format!("HERON_{}", field.replace('.', "__").to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("server.port"), "HERON_SERVER__PORT");
        assert_eq!(to_env_var("completions.host"), "HERON_COMPLETIONS__HOST");
    }
}
