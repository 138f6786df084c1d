use crate::{AnyscaleClient, Error, LanguageModel, TgiClient, DEFAULT_TGI_URL};
use std::env;

/// Supported network backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendType {
    Tgi,
    Anyscale,
}

/// Configuration for creating clients.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub backend_type: BackendType,
    pub model: String,
    pub url: Option<String>,
    pub ports: Vec<u16>,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
}

impl BackendConfig {
    /// Create configuration for a TGI server.
    pub fn tgi(model: impl Into<String>, url: impl Into<String>, ports: Vec<u16>) -> Self {
        Self {
            backend_type: BackendType::Tgi,
            model: model.into(),
            url: Some(url.into()),
            ports,
            api_base: None,
            api_key: None,
        }
    }

    /// Create configuration for a hosted chat-completions API.
    pub fn anyscale(
        model: impl Into<String>,
        api_base: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            backend_type: BackendType::Anyscale,
            model: model.into(),
            url: None,
            ports: Vec::new(),
            api_base: Some(api_base.into()),
            api_key: Some(api_key.into()),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// `LM_BACKEND` selects the backend explicitly; otherwise the presence of
    /// `OPENAI_API_KEY` or `TGI_PORTS` decides.
    pub fn from_env() -> Result<Self, Error> {
        if let Ok(backend) = env::var("LM_BACKEND") {
            return match backend.to_lowercase().as_str() {
                "tgi" => Self::tgi_from_env(),
                "anyscale" => Self::anyscale_from_env(),
                _ => Err(Error::config(format!(
                    "Invalid LM_BACKEND '{backend}'. Valid values are: tgi, anyscale"
                ))),
            };
        }

        if env::var("OPENAI_API_KEY").is_ok() {
            return Self::anyscale_from_env();
        }

        if env::var("TGI_PORTS").is_ok() {
            return Self::tgi_from_env();
        }

        Err(Error::config(
            "No backend configuration found in environment. Set LM_BACKEND (tgi/anyscale) with matching variables",
        ))
    }

    fn tgi_from_env() -> Result<Self, Error> {
        let model = env::var("TGI_MODEL").map_err(|_| {
            Error::config("TGI_MODEL environment variable is required for TGI backend")
        })?;
        let url = env::var("TGI_URL").unwrap_or_else(|_| DEFAULT_TGI_URL.to_string());
        let ports = env::var("TGI_PORTS").map_err(|_| {
            Error::config("TGI_PORTS environment variable is required for TGI backend")
        })?;

        Ok(Self::tgi(model, url, parse_ports(&ports)?))
    }

    fn anyscale_from_env() -> Result<Self, Error> {
        let model = env::var("ANYSCALE_MODEL").map_err(|_| {
            Error::config("ANYSCALE_MODEL environment variable is required for Anyscale backend")
        })?;
        let api_base = env::var("OPENAI_API_BASE").map_err(|_| {
            Error::config("OPENAI_API_BASE environment variable is required for Anyscale backend")
        })?;
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            Error::config("OPENAI_API_KEY environment variable is required for Anyscale backend")
        })?;

        Ok(Self::anyscale(model, api_base, api_key))
    }
}

/// Parse a comma separated port list such as `"8080, 8081"`.
pub fn parse_ports(raw: &str) -> Result<Vec<u16>, Error> {
    let ports = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<u16>()
                .map_err(|_| Error::config(format!("Invalid port '{p}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ports.is_empty() {
        return Err(Error::config("At least one port is required"));
    }
    Ok(ports)
}

/// Factory for creating clients.
pub struct ClientFactory;

impl ClientFactory {
    /// Create a client from configuration.
    pub fn create(config: &BackendConfig) -> Result<Box<dyn LanguageModel>, Error> {
        match config.backend_type {
            BackendType::Tgi => {
                let url = config
                    .url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TGI_URL.to_string());
                let client = TgiClient::new(config.model.clone(), config.ports.clone())?.with_url(url);
                Ok(Box::new(client))
            }
            BackendType::Anyscale => {
                let api_base = config
                    .api_base
                    .as_ref()
                    .ok_or_else(|| Error::config("API base required for Anyscale backend"))?;
                let api_key = config
                    .api_key
                    .as_ref()
                    .ok_or_else(|| Error::config("API key required for Anyscale backend"))?;
                let client =
                    AnyscaleClient::new(config.model.clone(), api_base.clone(), api_key.clone())?;
                Ok(Box::new(client))
            }
        }
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Box<dyn LanguageModel>, Error> {
        let config = BackendConfig::from_env()?;
        Self::create(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ports() {
        assert_eq!(parse_ports("8080").unwrap(), vec![8080]);
        assert_eq!(parse_ports("8080, 8081,").unwrap(), vec![8080, 8081]);
        assert!(parse_ports("").is_err());
        assert!(parse_ports("80a").is_err());
        assert!(parse_ports("70000").is_err());
    }

    #[test]
    fn test_tgi_config() {
        let config = BackendConfig::tgi("llama", "http://gpu", vec![8080]);
        assert_eq!(config.backend_type, BackendType::Tgi);
        assert_eq!(config.url.as_deref(), Some("http://gpu"));
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_create_tgi_client() {
        let config = BackendConfig::tgi("llama", "http://gpu", vec![8080, 8081]);
        let client = ClientFactory::create(&config).unwrap();
        assert_eq!(client.model(), "llama");
        assert_eq!(client.defaults().max_tokens, 75);
    }

    #[test]
    fn test_create_tgi_without_ports_fails() {
        let config = BackendConfig::tgi("llama", "http://gpu", vec![]);
        assert!(matches!(
            ClientFactory::create(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_create_anyscale_client() {
        let config = BackendConfig::anyscale("mistral", "http://api", "key");
        let client = ClientFactory::create(&config).unwrap();
        assert_eq!(client.model(), "mistral");
        assert_eq!(client.defaults().temperature, 0.0);
    }

    #[test]
    fn test_anyscale_requires_key() {
        let mut config = BackendConfig::anyscale("mistral", "http://api", "key");
        config.api_key = None;
        assert!(ClientFactory::create(&config).is_err());
    }
}
