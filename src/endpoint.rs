//! Service endpoints and the registry that resolves them.
//!
//! An [`Endpoint`] names a service and the address it listens on; the
//! codec derives every request URL from it. A [`ServiceRegistry`] maps a
//! logical service name to its endpoint. [`StaticRegistry`] is the
//! configuration-driven implementation.
//!
//! # Example Configuration File
//!
//! ```toml
//! [services.host]
//! addr = "127.0.0.1:8080"
//!
//! [services.zone]
//! addr = "dns.internal:8443"
//! scheme = "https"
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

fn default_scheme() -> String {
    "http".to_string()
}

/// Network location of one service.
///
/// # Examples
///
/// ```
/// use restcmd::endpoint::Endpoint;
///
/// let endpoint = Endpoint::new("host", "127.0.0.1:8080");
/// assert_eq!(endpoint.service_url(), "http://127.0.0.1:8080/host");
/// assert_eq!(endpoint.path(), "/host");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Logical service name, also the URL path segment.
    pub name: String,
    /// `host:port` the service listens on.
    pub addr: String,
    /// URL scheme.
    #[serde(default = "default_scheme")]
    pub scheme: String,
}

impl Endpoint {
    /// Creates a plain-HTTP endpoint.
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            scheme: default_scheme(),
        }
    }

    /// Sets the URL scheme.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Request path served by this endpoint.
    pub fn path(&self) -> String {
        format!("/{}", self.name)
    }

    /// Base URL every request for this service is sent to.
    pub fn service_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.addr, self.path())
    }
}

/// One service entry in a [`RegistryConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// `host:port` the service listens on.
    pub addr: String,
    /// URL scheme.
    #[serde(default = "default_scheme")]
    pub scheme: String,
}

/// Static service table, usually loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Service name to location.
    #[serde(default)]
    pub services: HashMap<String, ServiceEntry>,
}

impl RegistryConfig {
    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Configuration`] on malformed TOML.
    pub fn from_toml(content: &str) -> Result<Self, RegistryError> {
        toml::from_str(content).map_err(Into::into)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Configuration`] if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Endpoints described by this configuration.
    pub fn endpoints(&self) -> impl Iterator<Item = Endpoint> + '_ {
        self.services.iter().map(|(name, entry)| Endpoint {
            name: name.clone(),
            addr: entry.addr.clone(),
            scheme: entry.scheme.clone(),
        })
    }
}

/// Resolves logical service names to endpoints.
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// Looks up the endpoint of `name`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::ServiceNotFound`] if `name` is unknown.
    async fn resolve(&self, name: &str) -> Result<Endpoint, RegistryError>;

    /// Announces `endpoint`, replacing any previous entry of the same name.
    async fn register(&self, endpoint: &Endpoint) -> Result<(), RegistryError>;
}

/// In-process registry backed by a concurrent map.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    endpoints: DashMap<String, Endpoint>,
}

impl StaticRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded from `config`.
    pub fn from_config(config: &RegistryConfig) -> Self {
        let registry = Self::new();
        for endpoint in config.endpoints() {
            registry.endpoints.insert(endpoint.name.clone(), endpoint);
        }
        registry
    }

    /// Number of known services.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns `true` if no service is known.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[async_trait]
impl ServiceRegistry for StaticRegistry {
    async fn resolve(&self, name: &str) -> Result<Endpoint, RegistryError> {
        self.endpoints
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::ServiceNotFound(name.to_string()))
    }

    async fn register(&self, endpoint: &Endpoint) -> Result<(), RegistryError> {
        tracing::info!(service = %endpoint.name, url = %endpoint.service_url(), "service registered");
        self.endpoints
            .insert(endpoint.name.clone(), endpoint.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_toml() {
        let config = RegistryConfig::from_toml(
            r#"
            [services.host]
            addr = "127.0.0.1:8080"

            [services.zone]
            addr = "dns.internal:8443"
            scheme = "https"
        "#,
        )
        .unwrap();
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services["host"].scheme, "http");
        assert_eq!(config.services["zone"].scheme, "https");
    }

    #[test]
    fn malformed_toml_is_a_configuration_error() {
        let err = RegistryConfig::from_toml("[services.host\naddr = 1").unwrap_err();
        assert!(matches!(err, RegistryError::Configuration(_)));
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("services.toml");
        std::fs::write(&path, "[services.host]\naddr = \"10.0.0.1:80\"\n").unwrap();
        let config = RegistryConfig::from_file(&path).unwrap();
        assert_eq!(config.services["host"].addr, "10.0.0.1:80");
    }

    #[tokio::test]
    async fn resolve_configured_and_registered_services() {
        let config =
            RegistryConfig::from_toml("[services.zone]\naddr = \"dns:53\"\nscheme = \"https\"")
                .unwrap();
        let registry = StaticRegistry::from_config(&config);
        let zone = registry.resolve("zone").await.unwrap();
        assert_eq!(zone.service_url(), "https://dns:53/zone");

        assert!(matches!(
            registry.resolve("host").await,
            Err(RegistryError::ServiceNotFound(name)) if name == "host"
        ));

        registry
            .register(&Endpoint::new("host", "127.0.0.1:9000"))
            .await
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.resolve("host").await.unwrap().service_url(),
            "http://127.0.0.1:9000/host"
        );
    }
}
