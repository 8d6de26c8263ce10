//! User-defined resources and the type registry that decodes them.
//!
//! A [`Resource`] is an opaque record with a type tag, an identity and a
//! validation rule. The crate only reads those three things; payload
//! serialisation comes for free through [`ResourceObject`], which is
//! implemented for every `Serialize + 'static` type.
//!
//! [`ResourceRegistry`] maps a type tag to a decoder so the codec can turn
//! a raw `attrs` entry into the right concrete resource.
//!
//! # Examples
//!
//! ```
//! use restcmd::resource::{Resource, ResourceRegistry, ValidationError};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct Host {
//!     id: String,
//!     name: String,
//! }
//!
//! impl Resource for Host {
//!     fn resource_type(&self) -> &str {
//!         "host"
//!     }
//!
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//!
//!     fn validate(&self) -> Result<(), ValidationError> {
//!         if self.name.is_empty() {
//!             return Err(ValidationError::new("name", "must not be empty"));
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = ResourceRegistry::new();
//! registry.register::<Host>().unwrap();
//! assert!(registry.contains("host"));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value;

use crate::error::RegistryError;

/// Describes the first invalid field of a resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    /// Name of the invalid field.
    pub field: String,
    /// Why the value was rejected.
    pub reason: String,
}

impl ValidationError {
    /// Creates a validation error for `field`.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Object-safe serialisation and downcasting for resources.
///
/// Blanket-implemented for every `Serialize + 'static` type; never
/// implement it by hand.
pub trait ResourceObject {
    /// Serialises the resource to its wire form.
    fn to_json(&self) -> serde_json::Result<Value>;

    /// Exposes the concrete type for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Serialize + 'static> ResourceObject for T {
    fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A named, user-defined record carried by Post and Put commands.
pub trait Resource: ResourceObject + fmt::Debug + Send + Sync + 'static {
    /// Type tag shared by every instance of this resource.
    fn resource_type(&self) -> &str;

    /// Identity of this instance.
    fn id(&self) -> &str;

    /// Checks field validity, reporting the first invalid field.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl dyn Resource {
    /// Returns the concrete resource if it is an `R`.
    pub fn downcast_ref<R: Resource>(&self) -> Option<&R> {
        self.as_any().downcast_ref::<R>()
    }
}

type DecodeFn = fn(&RawValue) -> serde_json::Result<Arc<dyn Resource>>;

fn decode_as<R: Resource + DeserializeOwned>(raw: &RawValue) -> serde_json::Result<Arc<dyn Resource>> {
    let resource: R = serde_json::from_str(raw.get())?;
    Ok(Arc::new(resource))
}

/// Decoders for every registered resource type, keyed by type tag.
#[derive(Default, Clone)]
pub struct ResourceRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resource_types", &self.resource_types())
            .finish()
    }
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `R` under the type tag of its default value.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateResource`] if the tag is already taken.
    pub fn register<R>(&mut self) -> Result<(), RegistryError>
    where
        R: Resource + DeserializeOwned + Default,
    {
        let tag = R::default().resource_type().to_string();
        if self.decoders.contains_key(&tag) {
            return Err(RegistryError::DuplicateResource(tag));
        }
        tracing::debug!(resource_type = %tag, "registered resource type");
        self.decoders.insert(tag, decode_as::<R> as DecodeFn);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateResource`] if the tag is already taken.
    pub fn with<R>(mut self) -> Result<Self, RegistryError>
    where
        R: Resource + DeserializeOwned + Default,
    {
        self.register::<R>()?;
        Ok(self)
    }

    /// Returns `true` if a decoder exists for `resource_type`.
    pub fn contains(&self, resource_type: &str) -> bool {
        self.decoders.contains_key(resource_type)
    }

    /// Registered type tags, sorted.
    pub fn resource_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Decodes `raw` as the resource registered under `resource_type`.
    ///
    /// Returns `None` when no decoder is registered for the tag.
    pub fn decode_type(
        &self,
        resource_type: &str,
        raw: &RawValue,
    ) -> Option<serde_json::Result<Arc<dyn Resource>>> {
        self.decoders.get(resource_type).map(|decode| decode(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Zone {
        id: String,
        ttl: u32,
    }

    impl Resource for Zone {
        fn resource_type(&self) -> &str {
            "zone"
        }

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn raw(json: &str) -> Box<RawValue> {
        RawValue::from_string(json.to_string()).unwrap()
    }

    #[test]
    fn decode_registered_type() {
        let registry = ResourceRegistry::new().with::<Zone>().unwrap();
        let resource = registry
            .decode_type("zone", &raw(r#"{"id":"z1","ttl":300}"#))
            .unwrap()
            .unwrap();
        assert_eq!(resource.id(), "z1");
        assert_eq!(
            resource.downcast_ref::<Zone>(),
            Some(&Zone {
                id: "z1".to_string(),
                ttl: 300
            })
        );
    }

    #[test]
    fn unknown_type_has_no_decoder() {
        let registry = ResourceRegistry::new();
        assert!(registry.decode_type("zone", &raw("{}")).is_none());
    }

    #[test]
    fn wrong_shape_fails_to_decode() {
        let registry = ResourceRegistry::new().with::<Zone>().unwrap();
        let result = registry.decode_type("zone", &raw(r#"{"id":"z1","ttl":"soon"}"#));
        assert!(matches!(result, Some(Err(_))));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ResourceRegistry::new();
        registry.register::<Zone>().unwrap();
        let err = registry.register::<Zone>().unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateResource(tag) if tag == "zone"));
    }

    #[test]
    fn resource_serialises_through_trait_object() {
        let zone: Arc<dyn Resource> = Arc::new(Zone {
            id: "z2".to_string(),
            ttl: 60,
        });
        assert_eq!(
            zone.to_json().unwrap(),
            serde_json::json!({"id": "z2", "ttl": 60})
        );
    }
}
