use async_trait::async_trait;
use uuid::Uuid;

use crate::crypto::CryptoError;
use crate::domain::{Address, Customer, CustomerDocument, SearchFilters, StatusChange};

mod postgres;

pub use postgres::{PgCustomerStore, PgStoreTx};

// ============================================================================
// Record Store
// ============================================================================
//
// Durable storage for the customer aggregate. Implementations encrypt and
// decrypt the sensitive scalar fields transparently and enforce optimistic
// concurrency on customer updates. Mutating calls take `&mut` models and
// fill in generated identifiers, timestamps and versions, so the caller
// always holds the persisted state afterwards.
//
// The transactional variant binds the same operation set to one
// unit-of-work. It deliberately has no `begin` of its own: a nested
// transaction does not type-check.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Shared across all entities so callers can branch uniformly.
    #[error("record not found")]
    NotFound,

    /// The versioned UPDATE matched zero rows: a concurrent writer won.
    #[error("stale version {version} for customer {id}")]
    Conflict { id: Uuid, version: i32 },

    #[error("unique constraint violated: {0}")]
    Duplicate(String),

    /// Corrupt ciphertext or wrong key. Distinct from NotFound.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    type Tx: CustomerStoreTx;

    /// Open a unit-of-work covering any subset of the operations below.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    async fn create_customer(&self, customer: &mut Customer) -> Result<(), StoreError>;
    async fn get_customer_by_id(&self, id: Uuid) -> Result<Customer, StoreError>;
    async fn get_customer_by_number(&self, customer_number: &str) -> Result<Customer, StoreError>;
    async fn update_customer(&self, customer: &mut Customer) -> Result<(), StoreError>;
    async fn delete_customer(&self, id: Uuid) -> Result<(), StoreError>;
    async fn search_customers(&self, filters: &SearchFilters) -> Result<Vec<Customer>, StoreError>;

    async fn add_address(&self, address: &mut Address) -> Result<(), StoreError>;
    async fn update_address(&self, address: &mut Address) -> Result<(), StoreError>;
    async fn get_customer_addresses(&self, customer_id: Uuid) -> Result<Vec<Address>, StoreError>;
    async fn delete_address(&self, id: Uuid) -> Result<(), StoreError>;

    async fn add_document(&self, document: &mut CustomerDocument) -> Result<(), StoreError>;
    async fn update_document(&self, document: &mut CustomerDocument) -> Result<(), StoreError>;
    async fn get_customer_documents(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<CustomerDocument>, StoreError>;
    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError>;

    async fn insert_status_change(&self, change: &mut StatusChange) -> Result<(), StoreError>;
    async fn get_status_history(&self, customer_id: Uuid) -> Result<Vec<StatusChange>, StoreError>;
}

#[async_trait]
pub trait CustomerStoreTx: Send {
    async fn commit(self) -> Result<(), StoreError>;
    async fn rollback(self) -> Result<(), StoreError>;

    async fn create_customer(&mut self, customer: &mut Customer) -> Result<(), StoreError>;
    async fn get_customer_by_id(&mut self, id: Uuid) -> Result<Customer, StoreError>;
    async fn get_customer_by_number(
        &mut self,
        customer_number: &str,
    ) -> Result<Customer, StoreError>;
    async fn update_customer(&mut self, customer: &mut Customer) -> Result<(), StoreError>;
    async fn delete_customer(&mut self, id: Uuid) -> Result<(), StoreError>;
    async fn search_customers(
        &mut self,
        filters: &SearchFilters,
    ) -> Result<Vec<Customer>, StoreError>;

    async fn add_address(&mut self, address: &mut Address) -> Result<(), StoreError>;
    async fn update_address(&mut self, address: &mut Address) -> Result<(), StoreError>;
    async fn get_customer_addresses(
        &mut self,
        customer_id: Uuid,
    ) -> Result<Vec<Address>, StoreError>;
    async fn delete_address(&mut self, id: Uuid) -> Result<(), StoreError>;

    async fn add_document(&mut self, document: &mut CustomerDocument) -> Result<(), StoreError>;
    async fn update_document(&mut self, document: &mut CustomerDocument) -> Result<(), StoreError>;
    async fn get_customer_documents(
        &mut self,
        customer_id: Uuid,
    ) -> Result<Vec<CustomerDocument>, StoreError>;
    async fn delete_document(&mut self, id: Uuid) -> Result<(), StoreError>;

    async fn insert_status_change(&mut self, change: &mut StatusChange) -> Result<(), StoreError>;
    async fn get_status_history(
        &mut self,
        customer_id: Uuid,
    ) -> Result<Vec<StatusChange>, StoreError>;
}
