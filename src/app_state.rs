use std::sync::Arc;

use crate::services::link_check::LinkValidator;
use crate::services::queue::WorkQueue;
use crate::services::storage::BlobStore;
use crate::services::task_store::TaskStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub tasks: TaskStore,
    pub blobs: Arc<dyn BlobStore>,
    pub queue: Arc<dyn WorkQueue>,
    /// `None` disables pre-submission link validation.
    pub link_validator: Option<Arc<LinkValidator>>,
}

impl AppState {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        queue: Arc<dyn WorkQueue>,
        link_validator: Option<LinkValidator>,
    ) -> Self {
        Self {
            tasks: TaskStore::new(blobs.clone()),
            blobs,
            queue,
            link_validator: link_validator.map(Arc::new),
        }
    }
}
