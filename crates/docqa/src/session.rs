//! In-memory document session.
//!
//! Exactly one document is active at a time; uploading a new one replaces
//! it wholesale. Questions clone the `Arc` at the start of their turn, so
//! an upload during an in-flight question never disturbs that question —
//! only subsequent questions see the new document. Nothing survives a
//! restart.

use std::sync::{Arc, PoisonError, RwLock};

use docqa_core::models::Document;

#[derive(Default)]
pub struct DocumentSession {
    current: RwLock<Option<Arc<Document>>>,
}

impl DocumentSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active document and return a handle to it.
    pub fn replace(&self, document: Document) -> Arc<Document> {
        let document = Arc::new(document);
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&document));
        document
    }

    /// The currently active document, if one has been uploaded.
    pub fn current(&self) -> Option<Arc<Document>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
