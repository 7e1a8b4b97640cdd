//! Zinc client: the async side of the task registry.
//!
//! A [`TaskStore`] owns the registry; a [`CommandGateway`] turns worker
//! acknowledgements into writes; an [`EventReconciler`] applies the worker's
//! push stream. [`LocalWorker`] is an in-process [`Worker`].
mod gateway;
mod local_worker;
mod persist;
mod reconciler;
mod settings;
mod store;
mod worker;

pub use gateway::{CommandGateway, GatewayError};
pub use local_worker::{LocalWorker, SimulationSettings};
pub use persist::{AtomicFileWriter, PersistError};
pub use reconciler::{EventReconciler, ReconcilerStats};
pub use settings::SettingsStore;
pub use store::{StoreClosed, TaskStore};
pub use worker::{PushReceiver, Worker, WorkerError, PUSH_CHANNEL};
