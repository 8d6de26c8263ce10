//! Host service demo: serves a host inventory and drives it through a proxy.
//!
//! Run with:
//!
//! ```text
//! RUST_LOG=debug cargo run --example host_service --features full
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use restcmd::codec::{Discard, Json};
use restcmd::endpoint::{Endpoint, ServiceRegistry, StaticRegistry};
use restcmd::error::RegistryError;
use restcmd::proxy::get_proxy;
use restcmd::resource::{Resource, ResourceRegistry, ValidationError};
use restcmd::service::RestService;
use restcmd::store::{Filter, InMemoryResourceStore, ResourceStore};
use restcmd::types::{
    Commands, DeleteCmd, FailureBody, GetCmd, Outcome, PatchCmd, PostCmd, Task, TaskResult,
};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Host {
    id: String,
    name: String,
    #[serde(default)]
    addr: String,
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
        if !self.addr.is_empty() && self.addr.parse::<std::net::IpAddr>().is_err() {
            return Err(ValidationError::new("addr", "not an ip address"));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
struct HostInventory {
    hosts: InMemoryResourceStore,
}

#[async_trait]
impl RestService for HostInventory {
    fn supported_resources(&self, registry: &mut ResourceRegistry) -> Result<(), RegistryError> {
        registry.register::<Host>()
    }

    async fn handle_get(&self, _store: &dyn ResourceStore, task: Task) -> TaskResult {
        match task.cmds() {
            Some(Commands::Get(cmds)) => {
                let filter: Filter = cmds[0].conds.clone();
                TaskResult::succeed(self.hosts.find(&cmds[0].resource_type, &filter))
            }
            _ => TaskResult::failed("not a get task"),
        }
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
        TaskResult::empty()
    }

    async fn handle_delete(&self, _store: &dyn ResourceStore, task: Task) -> TaskResult {
        if let Some(Commands::Delete(cmds)) = task.cmds() {
            for cmd in cmds {
                self.hosts.remove(&cmd.resource_type, &cmd.id);
            }
        }
        TaskResult::empty()
    }

    async fn handle_patch(&self, _store: &dyn ResourceStore, task: Task) -> TaskResult {
        if let Some(Commands::Patch(cmds)) = task.cmds() {
            for cmd in cmds {
                self.hosts.merge(&cmd.resource_type, &cmd.id, &cmd.new_attrs);
            }
        }
        TaskResult::empty()
    }
}

fn host(id: &str, name: &str, addr: &str) -> Host {
    Host {
        id: id.to_string(),
        name: name.to_string(),
        addr: addr.to_string(),
    }
}

async fn show(proxy: &restcmd::RestProxy<restcmd::transport::ReqwestTransport>, label: &str, task: &Task) {
    match proxy
        .handle_task::<Json<Value>, Json<FailureBody>>(task)
        .await
    {
        Ok(result) => match result.result {
            Some(Outcome::Success(value)) => println!("{label}: {} {value}", result.code),
            Some(Outcome::Failure(body)) => println!("{label}: {} {}", result.code, body.error),
            None => println!("{label}: {}", result.code),
        },
        Err(err) => println!("{label}: error: {err}"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    restcmd::init_logging()?;

    let registry = Arc::new(StaticRegistry::new());
    let endpoint = Endpoint::new("host", "127.0.0.1:18080");

    let inventory = HostInventory::default();
    let store: Arc<dyn ResourceStore> = Arc::new(inventory.hosts.clone());
    let server_registry = Arc::clone(&registry);
    let server_endpoint = endpoint.clone();
    tokio::spawn(async move {
        if let Err(err) =
            restcmd::server::run(inventory, store, server_registry.as_ref(), server_endpoint).await
        {
            eprintln!("server stopped: {err}");
        }
    });

    while registry.resolve(&endpoint.name).await.is_err() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut resources = ResourceRegistry::new();
    resources.register::<Host>()?;
    let proxy = get_proxy(registry.as_ref(), "host", resources).await?;

    let create = Task::new("admin")
        .with_cmd(PostCmd::new(host("1", "web1", "10.0.0.1")))?
        .with_cmd(PostCmd::new(host("2", "web2", "10.0.0.2")))?;
    show(&proxy, "create", &create).await;

    let bad = Task::new("admin").with_cmd(PostCmd::new(host("3", "web3", "nope")))?;
    show(&proxy, "create invalid", &bad).await;

    let rename = Task::new("admin").with_cmd(PatchCmd::new("host", "1").with_attr("name", "www"))?;
    show(&proxy, "patch", &rename).await;

    let list = Task::new("admin").with_cmd(GetCmd::new("host"))?;
    show(&proxy, "list", &list).await;

    let remove = Task::new("admin").with_cmd(DeleteCmd::new("host", "9"))?;
    show(&proxy, "delete missing", &remove).await;

    let purge = Task::new("admin").with_cmd(DeleteCmd::new("host", "2"))?;
    proxy.handle_task::<Discard, Discard>(&purge).await?;
    show(&proxy, "list after delete", &list).await;

    proxy.close().await;
    Ok(())
}
