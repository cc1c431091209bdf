use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Address, AddressType, Customer, CustomerDocument, CustomerStatus, SearchFilters, StatusChange,
    VerificationStatus,
};
use crate::errors::CoreError;
use crate::metrics::Metrics;
use crate::store::{CustomerStore, CustomerStoreTx, StoreError};
use crate::validation::{ValidationErrors, Validator};

pub mod requests;

use requests::{
    AddAddressRequest, AddDocumentRequest, ChangeStatusRequest, CreateCustomerRequest, FullProfile,
    UpdateCustomerRequest,
};

// ============================================================================
// Customer Service - Orchestration
// ============================================================================
//
// Composes the validator and the record store into the customer lifecycle
// operations. This is the only layer aware of cross-entity rules: the
// primary-address invariant, auto-activation on document verification, and
// the audit trail for status transitions. Multi-row sequences run inside one
// store transaction so a crash cannot leave the invariants half-applied.
//
// ============================================================================

/// Audit reason recorded when a pending customer is activated as a side
/// effect of document verification rather than by an explicit request.
pub const AUTO_ACTIVATION_REASON: &str = "auto-activation: verified identity document on file";

pub struct CustomerService<S> {
    store: S,
    validator: Validator,
    metrics: Arc<Metrics>,
}

impl<S: CustomerStore> CustomerService<S> {
    pub fn new(store: S, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            validator: Validator::new(),
            metrics,
        }
    }

    /// Validate, assign a customer number and persist a new record in
    /// `Pending` status with version 1.
    pub async fn create_customer(&self, req: CreateCustomerRequest) -> Result<Customer, CoreError> {
        self.observed("create_customer", async {
            self.validator.validate_customer_create(&req).into_result()?;
            let date_of_birth = req
                .date_of_birth
                .ok_or_else(|| ValidationErrors::of("date_of_birth", "is required"))?;

            let now = Utc::now();
            let mut customer = Customer {
                id: Uuid::new_v4(),
                customer_number: generate_customer_number(),
                first_name: req.first_name,
                middle_name: req.middle_name.filter(|v| !v.is_empty()),
                last_name: req.last_name,
                date_of_birth,
                tax_id: req.tax_id.filter(|v| !v.is_empty()),
                email: req.email,
                phone: req.phone.filter(|v| !v.is_empty()),
                status: CustomerStatus::Pending,
                created_at: now,
                updated_at: now,
                created_by: req.created_by,
                updated_by: None,
                version: 1,
            };

            self.store
                .create_customer(&mut customer)
                .await
                .map_err(map_store_err)?;

            tracing::info!(
                customer_id = %customer.id,
                customer_number = %customer.customer_number,
                "customer created"
            );
            Ok(customer)
        })
        .await
    }

    pub async fn get_customer(&self, id: Uuid) -> Result<Customer, CoreError> {
        self.observed("get_customer", async {
            self.store.get_customer_by_id(id).await.map_err(map_store_err)
        })
        .await
    }

    pub async fn get_customer_by_number(&self, customer_number: &str) -> Result<Customer, CoreError> {
        self.observed("get_customer_by_number", async {
            self.store
                .get_customer_by_number(customer_number)
                .await
                .map_err(map_store_err)
        })
        .await
    }

    /// Partial update: only the fields present (and non-empty) in the
    /// request replace stored values. The caller's `version` gates the
    /// write; a stale version surfaces as [`CoreError::Conflict`].
    pub async fn update_customer(&self, req: UpdateCustomerRequest) -> Result<Customer, CoreError> {
        self.observed("update_customer", async {
            self.validator.validate_customer_update(&req).into_result()?;

            let mut customer = self
                .store
                .get_customer_by_id(req.customer_id)
                .await
                .map_err(map_store_err)?;

            apply_field(&mut customer.first_name, req.first_name);
            apply_field(&mut customer.last_name, req.last_name);
            apply_field(&mut customer.email, req.email);
            apply_optional_field(&mut customer.middle_name, req.middle_name);
            apply_optional_field(&mut customer.tax_id, req.tax_id);
            apply_optional_field(&mut customer.phone, req.phone);
            if let Some(dob) = req.date_of_birth {
                customer.date_of_birth = dob;
            }
            if req.updated_by.is_some() {
                customer.updated_by = req.updated_by;
            }

            customer.version = req.version;
            self.store
                .update_customer(&mut customer)
                .await
                .map_err(map_store_err)?;

            Ok(customer)
        })
        .await
    }

    /// Administrative hard delete. Not part of the business lifecycle;
    /// records are normally retired by closing them.
    pub async fn delete_customer(&self, id: Uuid) -> Result<(), CoreError> {
        self.observed("delete_customer", async {
            self.store.delete_customer(id).await.map_err(map_store_err)
        })
        .await
    }

    pub async fn search_customers(
        &self,
        filters: SearchFilters,
    ) -> Result<Vec<Customer>, CoreError> {
        self.observed("search_customers", async {
            self.validator.validate_search_filters(&filters).into_result()?;
            self.store
                .search_customers(&filters)
                .await
                .map_err(map_store_err)
        })
        .await
    }

    /// Add an address while keeping at most one primary address per
    /// customer. The first address is always promoted to primary; a new
    /// primary demotes every existing one. All writes share one
    /// transaction.
    pub async fn add_address(&self, req: AddAddressRequest) -> Result<Address, CoreError> {
        self.observed("add_address", async {
            self.validator.validate_address(&req).into_result()?;

            self.store
                .get_customer_by_id(req.customer_id)
                .await
                .map_err(map_store_err)?;

            let existing = self
                .store
                .get_customer_addresses(req.customer_id)
                .await
                .map_err(map_store_err)?;

            let is_primary = req.is_primary || !existing.iter().any(|a| a.is_primary);

            let now = Utc::now();
            let mut address = Address {
                id: Uuid::new_v4(),
                customer_id: req.customer_id,
                address_type: req.address_type.unwrap_or(AddressType::Physical),
                street1: req.street1,
                street2: req.street2.filter(|v| !v.is_empty()),
                city: req.city,
                state: req.state,
                postal_code: req.postal_code,
                country: req.country,
                is_primary,
                valid_from: req.valid_from.unwrap_or(now),
                valid_to: req.valid_to,
                created_at: now,
                updated_at: now,
            };

            let mut tx = self.store.begin().await.map_err(map_store_err)?;

            if req.is_primary {
                for mut previous in existing.into_iter().filter(|a| a.is_primary) {
                    previous.is_primary = false;
                    tx.update_address(&mut previous).await.map_err(map_store_err)?;
                }
            }

            tx.add_address(&mut address).await.map_err(map_store_err)?;
            tx.commit().await.map_err(map_store_err)?;

            Ok(address)
        })
        .await
    }

    pub async fn get_customer_addresses(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<Address>, CoreError> {
        self.observed("get_customer_addresses", async {
            self.store
                .get_customer_addresses(customer_id)
                .await
                .map_err(map_store_err)
        })
        .await
    }

    /// Submit an identification document. The document starts with
    /// `Pending` verification; if the customer is still pending and the
    /// document set already holds a verified identity-bearing document,
    /// the customer is activated through the same versioned update path as
    /// an explicit status change, with an audit record.
    pub async fn add_document(
        &self,
        req: AddDocumentRequest,
    ) -> Result<CustomerDocument, CoreError> {
        self.observed("add_document", async {
            self.validator.validate_document(&req).into_result()?;

            let mut customer = self
                .store
                .get_customer_by_id(req.customer_id)
                .await
                .map_err(map_store_err)?;

            let issue_date = req
                .issue_date
                .ok_or_else(|| ValidationErrors::of("issue_date", "is required"))?;
            let expiry_date = req
                .expiry_date
                .ok_or_else(|| ValidationErrors::of("expiry_date", "is required"))?;

            let now = Utc::now();
            let mut document = CustomerDocument {
                id: Uuid::new_v4(),
                customer_id: req.customer_id,
                document_type: req.document_type,
                document_number: req.document_number,
                issuing_authority: req.issuing_authority,
                issuing_country: req.issuing_country,
                issue_date,
                expiry_date,
                verification_status: VerificationStatus::Pending,
                verified_at: None,
                verified_by: None,
                created_at: now,
                updated_at: now,
            };

            let mut tx = self.store.begin().await.map_err(map_store_err)?;
            tx.add_document(&mut document).await.map_err(map_store_err)?;

            if customer.status == CustomerStatus::Pending {
                let documents = tx
                    .get_customer_documents(req.customer_id)
                    .await
                    .map_err(map_store_err)?;

                let has_verified_identity = documents.iter().any(|d| {
                    d.document_type.is_identity()
                        && d.verification_status == VerificationStatus::Verified
                });

                if has_verified_identity {
                    let previous = customer.status;
                    customer.status = CustomerStatus::Active;
                    customer.updated_by = Some(req.submitted_by);
                    tx.update_customer(&mut customer).await.map_err(map_store_err)?;

                    let mut change = StatusChange {
                        id: Uuid::new_v4(),
                        customer_id: customer.id,
                        previous_status: previous,
                        new_status: CustomerStatus::Active,
                        reason: AUTO_ACTIVATION_REASON.to_string(),
                        changed_by: req.submitted_by,
                        changed_at: Utc::now(),
                    };
                    tx.insert_status_change(&mut change).await.map_err(map_store_err)?;

                    self.metrics
                        .record_status_transition(previous, CustomerStatus::Active);
                    tracing::info!(customer_id = %customer.id, "customer auto-activated");
                }
            }

            tx.commit().await.map_err(map_store_err)?;
            Ok(document)
        })
        .await
    }

    pub async fn get_customer_documents(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<CustomerDocument>, CoreError> {
        self.observed("get_customer_documents", async {
            self.store
                .get_customer_documents(customer_id)
                .await
                .map_err(map_store_err)
        })
        .await
    }

    /// Explicit status transition: validated against the state machine,
    /// persisted through the versioned update path, and recorded in the
    /// audit trail — both writes in one transaction.
    pub async fn update_customer_status(
        &self,
        req: ChangeStatusRequest,
    ) -> Result<(Customer, StatusChange), CoreError> {
        self.observed("update_customer_status", async {
            self.validator.validate_status_change(&req).into_result()?;

            let mut customer = self
                .store
                .get_customer_by_id(req.customer_id)
                .await
                .map_err(map_store_err)?;

            self.validator
                .validate_status_transition(customer.status, req.new_status)?;

            let previous = customer.status;
            customer.status = req.new_status;
            customer.updated_by = Some(req.changed_by);

            let mut tx = self.store.begin().await.map_err(map_store_err)?;
            tx.update_customer(&mut customer).await.map_err(map_store_err)?;

            let mut change = StatusChange {
                id: Uuid::new_v4(),
                customer_id: customer.id,
                previous_status: previous,
                new_status: req.new_status,
                reason: req.reason,
                changed_by: req.changed_by,
                changed_at: Utc::now(),
            };
            tx.insert_status_change(&mut change).await.map_err(map_store_err)?;
            tx.commit().await.map_err(map_store_err)?;

            self.metrics.record_status_transition(previous, req.new_status);
            tracing::info!(
                customer_id = %customer.id,
                from = %previous,
                to = %req.new_status,
                "customer status changed"
            );

            Ok((customer, change))
        })
        .await
    }

    /// Assemble the presentation aggregate: the customer plus addresses,
    /// documents and the persisted status history.
    pub async fn get_full_profile(&self, id: Uuid) -> Result<FullProfile, CoreError> {
        self.observed("get_full_profile", async {
            let customer = self
                .store
                .get_customer_by_id(id)
                .await
                .map_err(map_store_err)?;
            let addresses = self
                .store
                .get_customer_addresses(id)
                .await
                .map_err(map_store_err)?;
            let documents = self
                .store
                .get_customer_documents(id)
                .await
                .map_err(map_store_err)?;
            let status_history = self
                .store
                .get_status_history(id)
                .await
                .map_err(map_store_err)?;

            Ok(FullProfile {
                customer,
                addresses,
                documents,
                status_history,
            })
        })
        .await
    }

    async fn observed<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, CoreError>>,
    ) -> Result<T, CoreError> {
        let started = Instant::now();
        let result = fut.await;

        self.metrics
            .record_operation(operation, started.elapsed(), result.is_ok());

        match &result {
            Err(CoreError::Conflict) => {
                self.metrics.record_conflict(operation);
                tracing::warn!(operation, "optimistic lock conflict");
            }
            Err(CoreError::Internal(err)) => {
                tracing::error!(operation, error = ?err, "operation failed");
            }
            _ => {}
        }

        result
    }
}

fn map_store_err(err: StoreError) -> CoreError {
    match err {
        StoreError::NotFound => CoreError::NotFound,
        StoreError::Conflict { .. } => CoreError::Conflict,
        other => CoreError::Internal(other),
    }
}

fn apply_field(target: &mut String, value: Option<String>) {
    if let Some(v) = value {
        if !v.is_empty() {
            *target = v;
        }
    }
}

fn apply_optional_field(target: &mut Option<String>, value: Option<String>) {
    if let Some(v) = value {
        if !v.is_empty() {
            *target = Some(v);
        }
    }
}

fn generate_customer_number() -> String {
    // UUIDv7 keeps numbers roughly time-ordered while carrying enough
    // entropy that collisions are effectively impossible; the unique index
    // is the backstop.
    format!("CUST-{}", Uuid::now_v7().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate};

    use crate::domain::DocumentType;

    // ------------------------------------------------------------------
    // In-memory store double. Mirrors the persistence contract the
    // orchestrator relies on: generated ids and timestamps, version
    // compare-and-swap, primary-first address ordering, newest-first
    // document ordering, and snapshot transactions.
    // ------------------------------------------------------------------

    #[derive(Debug, Default, Clone)]
    struct MemState {
        customers: HashMap<Uuid, Customer>,
        addresses: HashMap<Uuid, Address>,
        documents: HashMap<Uuid, CustomerDocument>,
        status_changes: Vec<StatusChange>,
    }

    impl MemState {
        fn create_customer(&mut self, customer: &mut Customer) -> Result<(), StoreError> {
            if self
                .customers
                .values()
                .any(|c| c.customer_number == customer.customer_number)
            {
                return Err(StoreError::Duplicate("customers_customer_number_key".into()));
            }
            if customer.id.is_nil() {
                customer.id = Uuid::new_v4();
            }
            let now = Utc::now();
            customer.created_at = now;
            customer.updated_at = now;
            customer.version = 1;
            self.customers.insert(customer.id, customer.clone());
            Ok(())
        }

        fn get_customer(&self, id: Uuid) -> Result<Customer, StoreError> {
            self.customers.get(&id).cloned().ok_or(StoreError::NotFound)
        }

        fn get_customer_by_number(&self, number: &str) -> Result<Customer, StoreError> {
            self.customers
                .values()
                .find(|c| c.customer_number == number)
                .cloned()
                .ok_or(StoreError::NotFound)
        }

        fn update_customer(&mut self, customer: &mut Customer) -> Result<(), StoreError> {
            customer.updated_at = Utc::now();
            customer.version += 1;
            match self.customers.get_mut(&customer.id) {
                Some(existing) if existing.version == customer.version - 1 => {
                    *existing = customer.clone();
                    Ok(())
                }
                _ => Err(StoreError::Conflict {
                    id: customer.id,
                    version: customer.version - 1,
                }),
            }
        }

        fn delete_customer(&mut self, id: Uuid) -> Result<(), StoreError> {
            self.customers.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
        }

        fn search_customers(&self, filters: &SearchFilters) -> Vec<Customer> {
            let contains = |needle: &Option<String>, hay: &str| {
                needle
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .map_or(true, |n| hay.to_lowercase().contains(&n.to_lowercase()))
            };

            let mut matches: Vec<Customer> = self
                .customers
                .values()
                .filter(|c| {
                    contains(&filters.first_name, &c.first_name)
                        && contains(&filters.last_name, &c.last_name)
                        && contains(&filters.email, &c.email)
                        && contains(&filters.phone, c.phone.as_deref().unwrap_or(""))
                        && filters.status.map_or(true, |s| c.status == s)
                        && filters.from_date.map_or(true, |d| c.created_at >= d)
                        && filters.to_date.map_or(true, |d| c.created_at <= d)
                })
                .cloned()
                .collect();

            matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            let offset = filters.offset.filter(|o| *o > 0).unwrap_or(0) as usize;
            let limit = filters.limit.filter(|l| *l > 0).unwrap_or(50) as usize;
            matches.into_iter().skip(offset).take(limit).collect()
        }

        fn add_address(&mut self, address: &mut Address) -> Result<(), StoreError> {
            if address.id.is_nil() {
                address.id = Uuid::new_v4();
            }
            let now = Utc::now();
            address.created_at = now;
            address.updated_at = now;
            self.addresses.insert(address.id, address.clone());
            Ok(())
        }

        fn update_address(&mut self, address: &mut Address) -> Result<(), StoreError> {
            address.updated_at = Utc::now();
            match self.addresses.get_mut(&address.id) {
                Some(existing) => {
                    *existing = address.clone();
                    Ok(())
                }
                None => Err(StoreError::NotFound),
            }
        }

        fn get_customer_addresses(&self, customer_id: Uuid) -> Vec<Address> {
            let mut list: Vec<Address> = self
                .addresses
                .values()
                .filter(|a| a.customer_id == customer_id)
                .cloned()
                .collect();
            list.sort_by(|a, b| {
                b.is_primary
                    .cmp(&a.is_primary)
                    .then(b.created_at.cmp(&a.created_at))
            });
            list
        }

        fn delete_address(&mut self, id: Uuid) -> Result<(), StoreError> {
            self.addresses.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
        }

        fn add_document(&mut self, document: &mut CustomerDocument) -> Result<(), StoreError> {
            if document.id.is_nil() {
                document.id = Uuid::new_v4();
            }
            let now = Utc::now();
            document.created_at = now;
            document.updated_at = now;
            self.documents.insert(document.id, document.clone());
            Ok(())
        }

        fn update_document(&mut self, document: &mut CustomerDocument) -> Result<(), StoreError> {
            document.updated_at = Utc::now();
            match self.documents.get_mut(&document.id) {
                Some(existing) => {
                    *existing = document.clone();
                    Ok(())
                }
                None => Err(StoreError::NotFound),
            }
        }

        fn get_customer_documents(&self, customer_id: Uuid) -> Vec<CustomerDocument> {
            let mut list: Vec<CustomerDocument> = self
                .documents
                .values()
                .filter(|d| d.customer_id == customer_id)
                .cloned()
                .collect();
            list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            list
        }

        fn delete_document(&mut self, id: Uuid) -> Result<(), StoreError> {
            self.documents.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
        }

        fn insert_status_change(&mut self, change: &mut StatusChange) -> Result<(), StoreError> {
            if change.id.is_nil() {
                change.id = Uuid::new_v4();
            }
            self.status_changes.push(change.clone());
            Ok(())
        }

        fn get_status_history(&self, customer_id: Uuid) -> Vec<StatusChange> {
            let mut list: Vec<StatusChange> = self
                .status_changes
                .iter()
                .filter(|c| c.customer_id == customer_id)
                .cloned()
                .collect();
            list.sort_by(|a, b| b.changed_at.cmp(&a.changed_at));
            list
        }
    }

    #[derive(Debug, Default, Clone)]
    struct MemStore {
        state: Arc<Mutex<MemState>>,
    }

    struct MemTx {
        state: Arc<Mutex<MemState>>,
        working: MemState,
    }

    #[async_trait]
    impl CustomerStore for MemStore {
        type Tx = MemTx;

        async fn begin(&self) -> Result<MemTx, StoreError> {
            let working = self.state.lock().unwrap().clone();
            Ok(MemTx {
                state: self.state.clone(),
                working,
            })
        }

        async fn create_customer(&self, customer: &mut Customer) -> Result<(), StoreError> {
            self.state.lock().unwrap().create_customer(customer)
        }

        async fn get_customer_by_id(&self, id: Uuid) -> Result<Customer, StoreError> {
            self.state.lock().unwrap().get_customer(id)
        }

        async fn get_customer_by_number(&self, number: &str) -> Result<Customer, StoreError> {
            self.state.lock().unwrap().get_customer_by_number(number)
        }

        async fn update_customer(&self, customer: &mut Customer) -> Result<(), StoreError> {
            self.state.lock().unwrap().update_customer(customer)
        }

        async fn delete_customer(&self, id: Uuid) -> Result<(), StoreError> {
            self.state.lock().unwrap().delete_customer(id)
        }

        async fn search_customers(
            &self,
            filters: &SearchFilters,
        ) -> Result<Vec<Customer>, StoreError> {
            Ok(self.state.lock().unwrap().search_customers(filters))
        }

        async fn add_address(&self, address: &mut Address) -> Result<(), StoreError> {
            self.state.lock().unwrap().add_address(address)
        }

        async fn update_address(&self, address: &mut Address) -> Result<(), StoreError> {
            self.state.lock().unwrap().update_address(address)
        }

        async fn get_customer_addresses(
            &self,
            customer_id: Uuid,
        ) -> Result<Vec<Address>, StoreError> {
            Ok(self.state.lock().unwrap().get_customer_addresses(customer_id))
        }

        async fn delete_address(&self, id: Uuid) -> Result<(), StoreError> {
            self.state.lock().unwrap().delete_address(id)
        }

        async fn add_document(&self, document: &mut CustomerDocument) -> Result<(), StoreError> {
            self.state.lock().unwrap().add_document(document)
        }

        async fn update_document(&self, document: &mut CustomerDocument) -> Result<(), StoreError> {
            self.state.lock().unwrap().update_document(document)
        }

        async fn get_customer_documents(
            &self,
            customer_id: Uuid,
        ) -> Result<Vec<CustomerDocument>, StoreError> {
            Ok(self.state.lock().unwrap().get_customer_documents(customer_id))
        }

        async fn delete_document(&self, id: Uuid) -> Result<(), StoreError> {
            self.state.lock().unwrap().delete_document(id)
        }

        async fn insert_status_change(&self, change: &mut StatusChange) -> Result<(), StoreError> {
            self.state.lock().unwrap().insert_status_change(change)
        }

        async fn get_status_history(
            &self,
            customer_id: Uuid,
        ) -> Result<Vec<StatusChange>, StoreError> {
            Ok(self.state.lock().unwrap().get_status_history(customer_id))
        }
    }

    #[async_trait]
    impl CustomerStoreTx for MemTx {
        async fn commit(self) -> Result<(), StoreError> {
            let MemTx { state, working } = self;
            *state.lock().unwrap() = working;
            Ok(())
        }

        async fn rollback(self) -> Result<(), StoreError> {
            Ok(())
        }

        async fn create_customer(&mut self, customer: &mut Customer) -> Result<(), StoreError> {
            self.working.create_customer(customer)
        }

        async fn get_customer_by_id(&mut self, id: Uuid) -> Result<Customer, StoreError> {
            self.working.get_customer(id)
        }

        async fn get_customer_by_number(&mut self, number: &str) -> Result<Customer, StoreError> {
            self.working.get_customer_by_number(number)
        }

        async fn update_customer(&mut self, customer: &mut Customer) -> Result<(), StoreError> {
            self.working.update_customer(customer)
        }

        async fn delete_customer(&mut self, id: Uuid) -> Result<(), StoreError> {
            self.working.delete_customer(id)
        }

        async fn search_customers(
            &mut self,
            filters: &SearchFilters,
        ) -> Result<Vec<Customer>, StoreError> {
            Ok(self.working.search_customers(filters))
        }

        async fn add_address(&mut self, address: &mut Address) -> Result<(), StoreError> {
            self.working.add_address(address)
        }

        async fn update_address(&mut self, address: &mut Address) -> Result<(), StoreError> {
            self.working.update_address(address)
        }

        async fn get_customer_addresses(
            &mut self,
            customer_id: Uuid,
        ) -> Result<Vec<Address>, StoreError> {
            Ok(self.working.get_customer_addresses(customer_id))
        }

        async fn delete_address(&mut self, id: Uuid) -> Result<(), StoreError> {
            self.working.delete_address(id)
        }

        async fn add_document(&mut self, document: &mut CustomerDocument) -> Result<(), StoreError> {
            self.working.add_document(document)
        }

        async fn update_document(
            &mut self,
            document: &mut CustomerDocument,
        ) -> Result<(), StoreError> {
            self.working.update_document(document)
        }

        async fn get_customer_documents(
            &mut self,
            customer_id: Uuid,
        ) -> Result<Vec<CustomerDocument>, StoreError> {
            Ok(self.working.get_customer_documents(customer_id))
        }

        async fn delete_document(&mut self, id: Uuid) -> Result<(), StoreError> {
            self.working.delete_document(id)
        }

        async fn insert_status_change(&mut self, change: &mut StatusChange) -> Result<(), StoreError> {
            self.working.insert_status_change(change)
        }

        async fn get_status_history(
            &mut self,
            customer_id: Uuid,
        ) -> Result<Vec<StatusChange>, StoreError> {
            Ok(self.working.get_status_history(customer_id))
        }
    }

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    fn service_with_store() -> (CustomerService<MemStore>, MemStore) {
        let store = MemStore::default();
        let service = CustomerService::new(store.clone(), Arc::new(Metrics::new().unwrap()));
        (service, store)
    }

    fn create_request() -> CreateCustomerRequest {
        CreateCustomerRequest {
            first_name: "Ada".into(),
            middle_name: None,
            last_name: "Lovelace".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1),
            tax_id: Some("123-45-6789".into()),
            email: "ada@example.com".into(),
            phone: None,
            created_by: Uuid::new_v4(),
        }
    }

    fn address_request(customer_id: Uuid, is_primary: bool) -> AddAddressRequest {
        AddAddressRequest {
            customer_id,
            address_type: None,
            street1: "12 Crescent Road".into(),
            street2: None,
            city: "London".into(),
            state: "Greater London".into(),
            postal_code: "N8 8AX".into(),
            country: "GB".into(),
            is_primary,
            valid_from: None,
            valid_to: None,
        }
    }

    fn document_request(customer_id: Uuid, document_type: DocumentType) -> AddDocumentRequest {
        AddDocumentRequest {
            customer_id,
            document_type,
            document_number: "P1234567".into(),
            issuing_authority: "HM Passport Office".into(),
            issuing_country: "GB".into(),
            issue_date: Some(Utc::now() - Duration::days(365)),
            expiry_date: Some(Utc::now() + Duration::days(365 * 9)),
            submitted_by: Uuid::new_v4(),
        }
    }

    async fn verify_document(store: &MemStore, document: &CustomerDocument) {
        let mut verified = document.clone();
        verified.verification_status = VerificationStatus::Verified;
        verified.verified_at = Some(Utc::now());
        verified.verified_by = Some(Uuid::new_v4());
        store.update_document(&mut verified).await.unwrap();
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_customer_starts_pending() {
        let (service, _) = service_with_store();

        let customer = service.create_customer(create_request()).await.unwrap();

        assert_eq!(customer.status, CustomerStatus::Pending);
        assert_eq!(customer.version, 1);
        assert!(customer.customer_number.starts_with("CUST-"));
        assert_eq!(customer.tax_id.as_deref(), Some("123-45-6789"));
    }

    #[tokio::test]
    async fn test_create_customer_rejects_minor() {
        let (service, _) = service_with_store();

        let mut req = create_request();
        req.date_of_birth = Some(Utc::now().date_naive() - Duration::days(17 * 365));

        let err = service.create_customer(req).await.unwrap_err();
        match err {
            CoreError::Validation(errs) => {
                assert_eq!(errs.0[0].field, "date_of_birth");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_with_current_version_then_stale_version() {
        let (service, _) = service_with_store();
        let customer = service.create_customer(create_request()).await.unwrap();

        let update = UpdateCustomerRequest {
            customer_id: customer.id,
            version: customer.version,
            email: Some("ada.l@example.com".into()),
            ..Default::default()
        };

        let updated = service.update_customer(update.clone()).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.email, "ada.l@example.com");
        assert_eq!(updated.first_name, "Ada");
        assert_eq!(updated.last_name, "Lovelace");

        // Replaying the same update with the original version must abort.
        let err = service.update_customer(update).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict));

        // The persisted row is unchanged by the stale write.
        let current = service.get_customer(customer.id).await.unwrap();
        assert_eq!(current.version, 2);
        assert_eq!(current.email, "ada.l@example.com");
    }

    #[tokio::test]
    async fn test_update_leaves_absent_fields_unchanged() {
        let (service, _) = service_with_store();
        let customer = service.create_customer(create_request()).await.unwrap();

        let updated = service
            .update_customer(UpdateCustomerRequest {
                customer_id: customer.id,
                version: 1,
                phone: Some("+14155550123".into()),
                email: Some(String::new()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.phone.as_deref(), Some("+14155550123"));
        assert_eq!(updated.email, "ada@example.com");
        assert_eq!(updated.tax_id.as_deref(), Some("123-45-6789"));
    }

    #[tokio::test]
    async fn test_update_unknown_customer_is_not_found() {
        let (service, _) = service_with_store();

        let err = service
            .update_customer(UpdateCustomerRequest {
                customer_id: Uuid::new_v4(),
                version: 1,
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::NotFound));
    }

    // ------------------------------------------------------------------
    // Primary-address invariant
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_first_address_is_always_primary() {
        let (service, _) = service_with_store();
        let customer = service.create_customer(create_request()).await.unwrap();

        let address = service
            .add_address(address_request(customer.id, false))
            .await
            .unwrap();

        assert!(address.is_primary);
    }

    #[tokio::test]
    async fn test_new_primary_demotes_previous_primary() {
        let (service, _) = service_with_store();
        let customer = service.create_customer(create_request()).await.unwrap();

        let first = service
            .add_address(address_request(customer.id, false))
            .await
            .unwrap();
        let second = service
            .add_address(address_request(customer.id, true))
            .await
            .unwrap();

        let addresses = service.get_customer_addresses(customer.id).await.unwrap();
        assert_eq!(addresses.len(), 2);

        let primaries: Vec<_> = addresses.iter().filter(|a| a.is_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].id, second.id);
        assert!(!addresses.iter().find(|a| a.id == first.id).unwrap().is_primary);
    }

    #[tokio::test]
    async fn test_non_primary_addition_keeps_existing_primary() {
        let (service, _) = service_with_store();
        let customer = service.create_customer(create_request()).await.unwrap();

        let first = service
            .add_address(address_request(customer.id, false))
            .await
            .unwrap();
        let second = service
            .add_address(address_request(customer.id, false))
            .await
            .unwrap();

        assert!(!second.is_primary);
        let addresses = service.get_customer_addresses(customer.id).await.unwrap();
        let primaries: Vec<_> = addresses.iter().filter(|a| a.is_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].id, first.id);
    }

    #[tokio::test]
    async fn test_add_address_for_unknown_customer_is_not_found() {
        let (service, _) = service_with_store();

        let err = service
            .add_address(address_request(Uuid::new_v4(), true))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::NotFound));
    }

    // ------------------------------------------------------------------
    // Documents and auto-activation
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_submitted_document_starts_unverified() {
        let (service, _) = service_with_store();
        let customer = service.create_customer(create_request()).await.unwrap();

        let document = service
            .add_document(document_request(customer.id, DocumentType::Passport))
            .await
            .unwrap();

        assert_eq!(document.verification_status, VerificationStatus::Pending);

        // An unverified passport does not activate the customer.
        let current = service.get_customer(customer.id).await.unwrap();
        assert_eq!(current.status, CustomerStatus::Pending);
    }

    #[tokio::test]
    async fn test_auto_activation_on_verified_identity_document() {
        let (service, store) = service_with_store();
        let customer = service.create_customer(create_request()).await.unwrap();

        let passport = service
            .add_document(document_request(customer.id, DocumentType::Passport))
            .await
            .unwrap();
        verify_document(&store, &passport).await;

        // The next submission re-evaluates the document set and activates.
        service
            .add_document(document_request(customer.id, DocumentType::UtilityBill))
            .await
            .unwrap();

        let current = service.get_customer(customer.id).await.unwrap();
        assert_eq!(current.status, CustomerStatus::Active);
        assert_eq!(current.version, 2);

        let history = service.get_full_profile(customer.id).await.unwrap().status_history;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].previous_status, CustomerStatus::Pending);
        assert_eq!(history[0].new_status, CustomerStatus::Active);
        assert_eq!(history[0].reason, AUTO_ACTIVATION_REASON);
    }

    #[tokio::test]
    async fn test_verified_non_identity_document_does_not_activate() {
        let (service, store) = service_with_store();
        let customer = service.create_customer(create_request()).await.unwrap();

        let bill = service
            .add_document(document_request(customer.id, DocumentType::UtilityBill))
            .await
            .unwrap();
        verify_document(&store, &bill).await;

        service
            .add_document(document_request(customer.id, DocumentType::BankStatement))
            .await
            .unwrap();

        let current = service.get_customer(customer.id).await.unwrap();
        assert_eq!(current.status, CustomerStatus::Pending);
        assert_eq!(current.version, 1);
    }

    #[tokio::test]
    async fn test_active_customer_is_not_reactivated_by_documents() {
        let (service, store) = service_with_store();
        let customer = service.create_customer(create_request()).await.unwrap();

        service
            .update_customer_status(ChangeStatusRequest {
                customer_id: customer.id,
                new_status: CustomerStatus::Active,
                reason: "identity verified manually".into(),
                changed_by: Uuid::new_v4(),
            })
            .await
            .unwrap();

        let passport = service
            .add_document(document_request(customer.id, DocumentType::Passport))
            .await
            .unwrap();
        verify_document(&store, &passport).await;

        service
            .add_document(document_request(customer.id, DocumentType::Ssn))
            .await
            .unwrap();

        // One explicit transition only; no duplicate auto-activation audit.
        let history = service.get_full_profile(customer.id).await.unwrap().status_history;
        assert_eq!(history.len(), 1);
    }

    // ------------------------------------------------------------------
    // Status transitions
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_status_change_writes_audit_record() {
        let (service, _) = service_with_store();
        let customer = service.create_customer(create_request()).await.unwrap();
        let actor = Uuid::new_v4();

        let (updated, change) = service
            .update_customer_status(ChangeStatusRequest {
                customer_id: customer.id,
                new_status: CustomerStatus::Active,
                reason: "KYC review complete".into(),
                changed_by: actor,
            })
            .await
            .unwrap();

        assert_eq!(updated.status, CustomerStatus::Active);
        assert_eq!(updated.version, 2);
        assert_eq!(change.previous_status, CustomerStatus::Pending);
        assert_eq!(change.new_status, CustomerStatus::Active);
        assert_eq!(change.reason, "KYC review complete");
        assert_eq!(change.changed_by, actor);

        let history = service.get_full_profile(customer.id).await.unwrap().status_history;
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_illegal_transition_is_rejected_and_nothing_persists() {
        let (service, _) = service_with_store();
        let customer = service.create_customer(create_request()).await.unwrap();

        let err = service
            .update_customer_status(ChangeStatusRequest {
                customer_id: customer.id,
                new_status: CustomerStatus::Suspended,
                reason: "skip the queue".into(),
                changed_by: Uuid::new_v4(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::InvalidTransition(_)));

        let current = service.get_customer(customer.id).await.unwrap();
        assert_eq!(current.status, CustomerStatus::Pending);
        assert_eq!(current.version, 1);
        let history = service.get_full_profile(customer.id).await.unwrap().status_history;
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_status_change_requires_reason() {
        let (service, _) = service_with_store();
        let customer = service.create_customer(create_request()).await.unwrap();

        let err = service
            .update_customer_status(ChangeStatusRequest {
                customer_id: customer.id,
                new_status: CustomerStatus::Active,
                reason: String::new(),
                changed_by: Uuid::new_v4(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Validation(_)));
    }

    // ------------------------------------------------------------------
    // Profile assembly and search
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_full_profile_includes_owned_entities_and_history() {
        let (service, _) = service_with_store();
        let customer = service.create_customer(create_request()).await.unwrap();

        service.add_address(address_request(customer.id, true)).await.unwrap();
        service
            .add_document(document_request(customer.id, DocumentType::Passport))
            .await
            .unwrap();
        service
            .update_customer_status(ChangeStatusRequest {
                customer_id: customer.id,
                new_status: CustomerStatus::Active,
                reason: "KYC review complete".into(),
                changed_by: Uuid::new_v4(),
            })
            .await
            .unwrap();

        let profile = service.get_full_profile(customer.id).await.unwrap();
        assert_eq!(profile.customer.id, customer.id);
        assert_eq!(profile.addresses.len(), 1);
        assert_eq!(profile.documents.len(), 1);
        assert_eq!(profile.status_history.len(), 1);
    }

    #[tokio::test]
    async fn test_search_rejects_out_of_range_limit() {
        let (service, _) = service_with_store();

        let err = service
            .search_customers(SearchFilters {
                limit: Some(101),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_search_filters_by_status_and_name() {
        let (service, _) = service_with_store();
        let ada = service.create_customer(create_request()).await.unwrap();

        let mut other = create_request();
        other.first_name = "Grace".into();
        other.last_name = "Hopper".into();
        other.email = "grace@example.com".into();
        service.create_customer(other).await.unwrap();

        let results = service
            .search_customers(SearchFilters {
                last_name: Some("love".into()),
                status: Some(CustomerStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, ada.id);
    }

    #[tokio::test]
    async fn test_delete_customer_is_administrative() {
        let (service, _) = service_with_store();
        let customer = service.create_customer(create_request()).await.unwrap();

        service.delete_customer(customer.id).await.unwrap();

        let err = service.get_customer(customer.id).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound));
    }
}
