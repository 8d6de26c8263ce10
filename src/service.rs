//! Service dispatcher.
//!
//! [`ServiceDispatcher`] sits between a decoded [`Task`] and the business
//! handlers of a [`RestService`]. It enforces the per-kind preconditions
//! and then calls exactly one handler:
//!
//! | Kind   | Precondition                                            |
//! |--------|---------------------------------------------------------|
//! | Get    | none                                                    |
//! | Post   | every resource validates, no store access               |
//! | Put    | every resource validates and already exists             |
//! | Delete | every target exists                                     |
//! | Patch  | every target exists                                     |
//!
//! Commands are checked in order and the first failure short-circuits the
//! rest. A failed check yields a [`FAILED`](crate::types::FAILED)
//! [`TaskResult`]; the handler is never called.
//!
//! # Transactions
//!
//! Existence checks run inside one store transaction that is always
//! committed once the checks end, pass or fail, and before the handler
//! runs. The handler's own mutation is not covered by that transaction.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{DispatchError, RegistryError};
use crate::resource::ResourceRegistry;
use crate::store::{id_filter, ResourceStore, Transaction};
use crate::types::{CommandKind, Commands, Task, TaskResult};

/// Business handlers of a resource-oriented service.
///
/// Handlers only see tasks whose preconditions already passed.
#[async_trait]
pub trait RestService: Send + Sync {
    /// Registers the resource types this service accepts.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateResource`] if a type is registered twice.
    fn supported_resources(&self, _registry: &mut ResourceRegistry) -> Result<(), RegistryError> {
        Ok(())
    }

    /// Handles a Get task.
    async fn handle_get(&self, store: &dyn ResourceStore, task: Task) -> TaskResult;

    /// Handles a Post task whose resources all validated.
    async fn handle_post(&self, store: &dyn ResourceStore, task: Task) -> TaskResult;

    /// Handles a Put task whose resources all validated and exist.
    async fn handle_put(&self, store: &dyn ResourceStore, task: Task) -> TaskResult;

    /// Handles a Delete task whose targets all exist.
    async fn handle_delete(&self, store: &dyn ResourceStore, task: Task) -> TaskResult;

    /// Handles a Patch task whose targets all exist.
    async fn handle_patch(&self, store: &dyn ResourceStore, task: Task) -> TaskResult;
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Delete,
    Update,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Update => "update",
        }
    }
}

/// Looks a resource up by id; returns the failure message if it is missing
/// or the lookup failed.
async fn check_exists(
    tx: &mut dyn Transaction,
    action: Action,
    resource_type: &str,
    id: &str,
) -> Option<String> {
    match tx.count(resource_type, &id_filter(id)).await {
        Ok(0) => Some(format!(
            "{} unknown resource: {resource_type} with id {id}",
            action.verb()
        )),
        Ok(_) => None,
        Err(err) => Some(format!("db get {} resource failed: {err}", action.verb())),
    }
}

/// Routes decoded tasks to a [`RestService`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use restcmd::service::{RestService, ServiceDispatcher};
/// use restcmd::store::{InMemoryResourceStore, ResourceStore};
/// use restcmd::types::{DeleteCmd, Task, TaskResult};
///
/// struct Noop;
///
/// #[async_trait]
/// impl RestService for Noop {
///     async fn handle_get(&self, _: &dyn ResourceStore, _: Task) -> TaskResult { TaskResult::empty() }
///     async fn handle_post(&self, _: &dyn ResourceStore, _: Task) -> TaskResult { TaskResult::empty() }
///     async fn handle_put(&self, _: &dyn ResourceStore, _: Task) -> TaskResult { TaskResult::empty() }
///     async fn handle_delete(&self, _: &dyn ResourceStore, _: Task) -> TaskResult { TaskResult::empty() }
///     async fn handle_patch(&self, _: &dyn ResourceStore, _: Task) -> TaskResult { TaskResult::empty() }
/// }
///
/// # let rt = tokio::runtime::Runtime::new().unwrap();
/// # rt.block_on(async {
/// let dispatcher = ServiceDispatcher::new(Noop, Arc::new(InMemoryResourceStore::new()));
/// let task = Task::new("alice").with_cmd(DeleteCmd::new("host", "42")).unwrap();
/// let result = dispatcher.handle_task(task).await.unwrap();
/// assert_eq!(result.error_message(), Some("delete unknown resource: host with id 42"));
/// # });
/// ```
pub struct ServiceDispatcher<S> {
    service: S,
    store: Arc<dyn ResourceStore>,
}

impl<S: RestService> ServiceDispatcher<S> {
    /// Creates a dispatcher over `service` and `store`.
    pub fn new(service: S, store: Arc<dyn ResourceStore>) -> Self {
        Self { service, store }
    }

    /// The wrapped service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// The store handed to every handler.
    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// Checks preconditions and calls the handler matching the task kind.
    ///
    /// Validation and existence failures come back as failed results.
    ///
    /// # Errors
    ///
    /// [`DispatchError::EmptyTask`] for a task without commands, and
    /// [`DispatchError::Store`] if the check transaction cannot be opened
    /// or committed.
    pub async fn handle_task(&self, task: Task) -> Result<TaskResult, DispatchError> {
        let kind = task
            .kind()
            .filter(|_| !task.is_empty())
            .ok_or(DispatchError::EmptyTask)?;

        tracing::debug!(kind = %kind, commands = task.len(), user = %task.user, "dispatching task");

        if let Some(message) = self.check_preconditions(&task).await? {
            tracing::warn!(kind = %kind, error = %message, "task rejected");
            return Ok(task.failed(message));
        }

        let store = self.store.as_ref();
        let result = match kind {
            CommandKind::Get => self.service.handle_get(store, task).await,
            CommandKind::Post => self.service.handle_post(store, task).await,
            CommandKind::Put => self.service.handle_put(store, task).await,
            CommandKind::Delete => self.service.handle_delete(store, task).await,
            CommandKind::Patch => self.service.handle_patch(store, task).await,
        };
        Ok(result)
    }

    async fn check_preconditions(&self, task: &Task) -> Result<Option<String>, DispatchError> {
        let Some(cmds) = task.cmds() else {
            return Err(DispatchError::EmptyTask);
        };

        let failure = match cmds {
            Commands::Get(_) => None,
            Commands::Post(cmds) => cmds
                .iter()
                .find_map(|cmd| cmd.new_resource.validate().err())
                .map(|err| err.to_string()),
            Commands::Put(cmds) => {
                let mut tx = self.store.begin().await?;
                let mut failure = None;
                for cmd in cmds {
                    let resource = cmd.new_resource.as_ref();
                    if let Err(err) = resource.validate() {
                        failure = Some(err.to_string());
                        break;
                    }
                    failure = check_exists(
                        tx.as_mut(),
                        Action::Update,
                        resource.resource_type(),
                        resource.id(),
                    )
                    .await;
                    if failure.is_some() {
                        break;
                    }
                }
                tx.commit().await?;
                failure
            }
            Commands::Delete(cmds) => {
                let mut tx = self.store.begin().await?;
                let mut failure = None;
                for cmd in cmds {
                    failure =
                        check_exists(tx.as_mut(), Action::Delete, &cmd.resource_type, &cmd.id)
                            .await;
                    if failure.is_some() {
                        break;
                    }
                }
                tx.commit().await?;
                failure
            }
            Commands::Patch(cmds) => {
                let mut tx = self.store.begin().await?;
                let mut failure = None;
                for cmd in cmds {
                    failure =
                        check_exists(tx.as_mut(), Action::Update, &cmd.resource_type, &cmd.id)
                            .await;
                    if failure.is_some() {
                        break;
                    }
                }
                tx.commit().await?;
                failure
            }
        };
        Ok(failure)
    }
}

impl<S> std::fmt::Debug for ServiceDispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDispatcher").finish_non_exhaustive()
    }
}
