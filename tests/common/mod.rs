//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use restcmd::codec::RestCodec;
use restcmd::endpoint::Endpoint;
use restcmd::error::RegistryError;
use restcmd::resource::{Resource, ResourceRegistry, ValidationError};
use restcmd::service::RestService;
use restcmd::store::{Filter, InMemoryResourceStore, ResourceStore};
use restcmd::types::{Commands, Task, TaskResult, LIMIT_KEY, OFFSET_KEY};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ttl: u32,
}

impl Resource for Host {
    fn resource_type(&self) -> &str {
        "host"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }
        Ok(())
    }
}

pub fn host(id: &str, name: &str) -> Host {
    Host {
        id: id.to_string(),
        name: name.to_string(),
        ttl: 300,
    }
}

pub fn registry() -> ResourceRegistry {
    ResourceRegistry::new().with::<Host>().unwrap()
}

pub fn endpoint() -> Endpoint {
    Endpoint::new("host", "127.0.0.1:8080")
}

pub fn codec() -> RestCodec {
    RestCodec::new(registry(), endpoint())
}

/// Host service writing straight into a shared in-memory store.
#[derive(Debug, Clone, Default)]
pub struct HostService {
    pub hosts: InMemoryResourceStore,
}

#[async_trait]
impl RestService for HostService {
    fn supported_resources(&self, registry: &mut ResourceRegistry) -> Result<(), RegistryError> {
        registry.register::<Host>()
    }

    async fn handle_get(&self, _store: &dyn ResourceStore, task: Task) -> TaskResult {
        let Some(Commands::Get(cmds)) = task.cmds() else {
            return TaskResult::failed("not a get task");
        };
        let cmd = &cmds[0];
        let filter: Filter = cmd
            .conds
            .iter()
            .filter(|(key, _)| key.as_str() != OFFSET_KEY && key.as_str() != LIMIT_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let mut found = self.hosts.find(&cmd.resource_type, &filter);
        found.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
        let offset = cmd.offset().unwrap_or(0) as usize;
        let limit = cmd.limit().map_or(usize::MAX, |l| l as usize);
        let page: Vec<Value> = found.into_iter().skip(offset).take(limit).collect();
        TaskResult::succeed(page)
    }

    async fn handle_post(&self, _store: &dyn ResourceStore, task: Task) -> TaskResult {
        let Some(Commands::Post(cmds)) = task.cmds() else {
            return TaskResult::failed("not a post task");
        };
        for cmd in cmds {
            if let Err(err) = self.hosts.insert(cmd.new_resource.as_ref()) {
                return task.failed(err);
            }
        }
        TaskResult::succeed(json!({ "created": cmds.len() }))
    }

    async fn handle_put(&self, _store: &dyn ResourceStore, task: Task) -> TaskResult {
        let Some(Commands::Put(cmds)) = task.cmds() else {
            return TaskResult::failed("not a put task");
        };
        for cmd in cmds {
            if let Err(err) = self.hosts.insert(cmd.new_resource.as_ref()) {
                return task.failed(err);
            }
        }
        TaskResult::succeed(json!({ "updated": cmds.len() }))
    }

    async fn handle_delete(&self, _store: &dyn ResourceStore, task: Task) -> TaskResult {
        let Some(Commands::Delete(cmds)) = task.cmds() else {
            return TaskResult::failed("not a delete task");
        };
        for cmd in cmds {
            self.hosts.remove(&cmd.resource_type, &cmd.id);
        }
        TaskResult::succeed(json!({ "deleted": cmds.len() }))
    }

    async fn handle_patch(&self, _store: &dyn ResourceStore, task: Task) -> TaskResult {
        let Some(Commands::Patch(cmds)) = task.cmds() else {
            return TaskResult::failed("not a patch task");
        };
        for cmd in cmds {
            self.hosts.merge(&cmd.resource_type, &cmd.id, &cmd.new_attrs);
        }
        TaskResult::succeed(json!({ "patched": cmds.len() }))
    }
}
