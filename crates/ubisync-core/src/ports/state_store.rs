//! Durable sync-state port (driven/secondary port)
//!
//! A single durable boolean gates the engine's initial-synchronization
//! mode across process restarts: it is read once at orchestrator start and
//! written when the first-ever reconciliation completes.

/// Port trait for durable synchronization state
#[async_trait::async_trait]
pub trait ISyncStateStore: Send + Sync {
    /// True once a full initial synchronization has ever completed
    async fn did_finish_initial_synchronization(&self) -> bool;

    /// Records whether the initial synchronization has completed
    async fn set_did_finish_initial_synchronization(&self, done: bool) -> anyhow::Result<()>;
}
