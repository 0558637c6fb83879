//! Document storage port and in-memory adapter

use std::collections::HashMap;
use std::sync::RwLock;

use core_kernel::{DocumentId, PartnerId};

use crate::document::{Document, DocumentKind};
use crate::error::DocumentError;

/// Storage port for business documents
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document
    ///
    /// # Errors
    ///
    /// Returns an error if the ID already exists.
    fn insert(&self, document: Document) -> Result<(), DocumentError>;

    /// Retrieves a document by ID
    fn get(&self, id: DocumentId) -> Option<Document>;

    /// Persists an updated document
    fn save(&self, document: Document) -> Result<(), DocumentError>;

    /// Removes a document
    fn remove(&self, id: DocumentId) -> Result<Document, DocumentError>;

    /// Open documents of a kind for a partner, oldest first
    ///
    /// "Open" means posted and not yet fully paid. Ordering is by document
    /// date, then creation time, which is what first-in-first-out
    /// settlement walks.
    fn open_for_partner(&self, partner_id: PartnerId, kind: DocumentKind) -> Vec<Document>;
}

/// In-memory document store
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<DocumentId, Document>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn insert(&self, document: Document) -> Result<(), DocumentError> {
        let mut documents = self.documents.write().expect("document lock poisoned");
        if documents.contains_key(&document.id) {
            return Err(DocumentError::DuplicateDocument(document.id.to_string()));
        }
        documents.insert(document.id, document);
        Ok(())
    }

    fn get(&self, id: DocumentId) -> Option<Document> {
        self.documents
            .read()
            .expect("document lock poisoned")
            .get(&id)
            .cloned()
    }

    fn save(&self, document: Document) -> Result<(), DocumentError> {
        let mut documents = self.documents.write().expect("document lock poisoned");
        if !documents.contains_key(&document.id) {
            return Err(DocumentError::DocumentNotFound(document.id.to_string()));
        }
        documents.insert(document.id, document);
        Ok(())
    }

    fn remove(&self, id: DocumentId) -> Result<Document, DocumentError> {
        self.documents
            .write()
            .expect("document lock poisoned")
            .remove(&id)
            .ok_or_else(|| DocumentError::DocumentNotFound(id.to_string()))
    }

    fn open_for_partner(&self, partner_id: PartnerId, kind: DocumentKind) -> Vec<Document> {
        let documents = self.documents.read().expect("document lock poisoned");
        let mut open: Vec<Document> = documents
            .values()
            .filter(|d| d.partner_id == partner_id && d.kind == kind && d.is_open())
            .cloned()
            .collect();
        open.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        open
    }
}
