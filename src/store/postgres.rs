use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::crypto::FieldCipher;
use crate::domain::{Address, Customer, CustomerDocument, SearchFilters, StatusChange};

use super::{CustomerStore, CustomerStoreTx, StoreError};

// ============================================================================
// PostgreSQL Record Store
// ============================================================================
//
// Every query is written exactly once as a function generic over
// `sqlx::PgExecutor`, so the pool-bound store and the transaction-bound
// store share one implementation instead of carrying two copies of each
// CRUD method.
//
// Customer updates are a compare-and-swap: the UPDATE matches the row id
// AND the version the caller read; zero affected rows means a concurrent
// writer advanced the version first.
//
// ============================================================================

/// Pool-bound record store. Cheap to clone; safe for concurrent use.
#[derive(Clone)]
pub struct PgCustomerStore {
    pool: PgPool,
    cipher: Arc<FieldCipher>,
}

impl PgCustomerStore {
    pub fn new(pool: PgPool, cipher: Arc<FieldCipher>) -> Self {
        Self { pool, cipher }
    }
}

/// Record store bound to one open transaction. Dropping it without
/// committing rolls the unit-of-work back.
pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
    cipher: Arc<FieldCipher>,
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    type Tx = PgStoreTx;

    async fn begin(&self) -> Result<PgStoreTx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgStoreTx {
            tx,
            cipher: self.cipher.clone(),
        })
    }

    async fn create_customer(&self, customer: &mut Customer) -> Result<(), StoreError> {
        queries::insert_customer(&self.pool, &self.cipher, customer).await
    }

    async fn get_customer_by_id(&self, id: Uuid) -> Result<Customer, StoreError> {
        queries::get_customer_by_id(&self.pool, &self.cipher, id).await
    }

    async fn get_customer_by_number(&self, customer_number: &str) -> Result<Customer, StoreError> {
        queries::get_customer_by_number(&self.pool, &self.cipher, customer_number).await
    }

    async fn update_customer(&self, customer: &mut Customer) -> Result<(), StoreError> {
        queries::update_customer(&self.pool, &self.cipher, customer).await
    }

    async fn delete_customer(&self, id: Uuid) -> Result<(), StoreError> {
        queries::delete_customer(&self.pool, id).await
    }

    async fn search_customers(&self, filters: &SearchFilters) -> Result<Vec<Customer>, StoreError> {
        queries::search_customers(&self.pool, &self.cipher, filters).await
    }

    async fn add_address(&self, address: &mut Address) -> Result<(), StoreError> {
        queries::insert_address(&self.pool, address).await
    }

    async fn update_address(&self, address: &mut Address) -> Result<(), StoreError> {
        queries::update_address(&self.pool, address).await
    }

    async fn get_customer_addresses(&self, customer_id: Uuid) -> Result<Vec<Address>, StoreError> {
        queries::get_customer_addresses(&self.pool, customer_id).await
    }

    async fn delete_address(&self, id: Uuid) -> Result<(), StoreError> {
        queries::delete_address(&self.pool, id).await
    }

    async fn add_document(&self, document: &mut CustomerDocument) -> Result<(), StoreError> {
        queries::insert_document(&self.pool, &self.cipher, document).await
    }

    async fn update_document(&self, document: &mut CustomerDocument) -> Result<(), StoreError> {
        queries::update_document(&self.pool, &self.cipher, document).await
    }

    async fn get_customer_documents(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<CustomerDocument>, StoreError> {
        queries::get_customer_documents(&self.pool, &self.cipher, customer_id).await
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), StoreError> {
        queries::delete_document(&self.pool, id).await
    }

    async fn insert_status_change(&self, change: &mut StatusChange) -> Result<(), StoreError> {
        queries::insert_status_change(&self.pool, change).await
    }

    async fn get_status_history(&self, customer_id: Uuid) -> Result<Vec<StatusChange>, StoreError> {
        queries::get_status_history(&self.pool, customer_id).await
    }
}

#[async_trait]
impl CustomerStoreTx for PgStoreTx {
    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(StoreError::from)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(StoreError::from)
    }

    async fn create_customer(&mut self, customer: &mut Customer) -> Result<(), StoreError> {
        queries::insert_customer(&mut *self.tx, &self.cipher, customer).await
    }

    async fn get_customer_by_id(&mut self, id: Uuid) -> Result<Customer, StoreError> {
        queries::get_customer_by_id(&mut *self.tx, &self.cipher, id).await
    }

    async fn get_customer_by_number(
        &mut self,
        customer_number: &str,
    ) -> Result<Customer, StoreError> {
        queries::get_customer_by_number(&mut *self.tx, &self.cipher, customer_number).await
    }

    async fn update_customer(&mut self, customer: &mut Customer) -> Result<(), StoreError> {
        queries::update_customer(&mut *self.tx, &self.cipher, customer).await
    }

    async fn delete_customer(&mut self, id: Uuid) -> Result<(), StoreError> {
        queries::delete_customer(&mut *self.tx, id).await
    }

    async fn search_customers(
        &mut self,
        filters: &SearchFilters,
    ) -> Result<Vec<Customer>, StoreError> {
        queries::search_customers(&mut *self.tx, &self.cipher, filters).await
    }

    async fn add_address(&mut self, address: &mut Address) -> Result<(), StoreError> {
        queries::insert_address(&mut *self.tx, address).await
    }

    async fn update_address(&mut self, address: &mut Address) -> Result<(), StoreError> {
        queries::update_address(&mut *self.tx, address).await
    }

    async fn get_customer_addresses(
        &mut self,
        customer_id: Uuid,
    ) -> Result<Vec<Address>, StoreError> {
        queries::get_customer_addresses(&mut *self.tx, customer_id).await
    }

    async fn delete_address(&mut self, id: Uuid) -> Result<(), StoreError> {
        queries::delete_address(&mut *self.tx, id).await
    }

    async fn add_document(&mut self, document: &mut CustomerDocument) -> Result<(), StoreError> {
        queries::insert_document(&mut *self.tx, &self.cipher, document).await
    }

    async fn update_document(&mut self, document: &mut CustomerDocument) -> Result<(), StoreError> {
        queries::update_document(&mut *self.tx, &self.cipher, document).await
    }

    async fn get_customer_documents(
        &mut self,
        customer_id: Uuid,
    ) -> Result<Vec<CustomerDocument>, StoreError> {
        queries::get_customer_documents(&mut *self.tx, &self.cipher, customer_id).await
    }

    async fn delete_document(&mut self, id: Uuid) -> Result<(), StoreError> {
        queries::delete_document(&mut *self.tx, id).await
    }

    async fn insert_status_change(&mut self, change: &mut StatusChange) -> Result<(), StoreError> {
        queries::insert_status_change(&mut *self.tx, change).await
    }

    async fn get_status_history(
        &mut self,
        customer_id: Uuid,
    ) -> Result<Vec<StatusChange>, StoreError> {
        queries::get_status_history(&mut *self.tx, customer_id).await
    }
}

mod queries {
    use chrono::{DateTime, NaiveDate, Utc};
    use sqlx::{PgExecutor, QueryBuilder};
    use uuid::Uuid;

    use crate::crypto::FieldCipher;
    use crate::domain::{
        Address, Customer, CustomerDocument, CustomerStatus, DocumentType, SearchFilters,
        StatusChange, VerificationStatus,
    };
    use crate::store::StoreError;

    const CUSTOMER_SELECT: &str = "SELECT id, customer_number, first_name, middle_name, \
         last_name, date_of_birth, tax_id, email, phone, status, created_at, updated_at, \
         created_by, updated_by, version FROM customers";

    const DEFAULT_SEARCH_LIMIT: i64 = 50;

    #[derive(sqlx::FromRow)]
    struct CustomerRow {
        id: Uuid,
        customer_number: String,
        first_name: String,
        middle_name: Option<String>,
        last_name: String,
        date_of_birth: NaiveDate,
        tax_id: Option<String>,
        email: String,
        phone: Option<String>,
        status: CustomerStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        created_by: Uuid,
        updated_by: Option<Uuid>,
        version: i32,
    }

    impl CustomerRow {
        fn into_customer(self, cipher: &FieldCipher) -> Result<Customer, StoreError> {
            let tax_id = self
                .tax_id
                .map(|sealed| cipher.decrypt(&sealed))
                .transpose()?;

            Ok(Customer {
                id: self.id,
                customer_number: self.customer_number,
                first_name: self.first_name,
                middle_name: self.middle_name,
                last_name: self.last_name,
                date_of_birth: self.date_of_birth,
                tax_id,
                email: self.email,
                phone: self.phone,
                status: self.status,
                created_at: self.created_at,
                updated_at: self.updated_at,
                created_by: self.created_by,
                updated_by: self.updated_by,
                version: self.version,
            })
        }
    }

    #[derive(sqlx::FromRow)]
    struct DocumentRow {
        id: Uuid,
        customer_id: Uuid,
        document_type: DocumentType,
        document_number: String,
        issuing_authority: String,
        issuing_country: String,
        issue_date: DateTime<Utc>,
        expiry_date: DateTime<Utc>,
        verification_status: VerificationStatus,
        verified_at: Option<DateTime<Utc>>,
        verified_by: Option<Uuid>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    impl DocumentRow {
        fn into_document(self, cipher: &FieldCipher) -> Result<CustomerDocument, StoreError> {
            Ok(CustomerDocument {
                id: self.id,
                customer_id: self.customer_id,
                document_type: self.document_type,
                document_number: cipher.decrypt(&self.document_number)?,
                issuing_authority: self.issuing_authority,
                issuing_country: self.issuing_country,
                issue_date: self.issue_date,
                expiry_date: self.expiry_date,
                verification_status: self.verification_status,
                verified_at: self.verified_at,
                verified_by: self.verified_by,
                created_at: self.created_at,
                updated_at: self.updated_at,
            })
        }
    }

    fn seal_tax_id(
        cipher: &FieldCipher,
        tax_id: Option<&str>,
    ) -> Result<Option<String>, StoreError> {
        Ok(tax_id.map(|t| cipher.encrypt(t)).transpose()?)
    }

    fn map_insert_err(err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate(
                    db_err.constraint().unwrap_or("unknown constraint").to_string(),
                );
            }
        }
        StoreError::Database(err)
    }

    pub(super) async fn insert_customer<'e>(
        db: impl PgExecutor<'e>,
        cipher: &FieldCipher,
        customer: &mut Customer,
    ) -> Result<(), StoreError> {
        if customer.id.is_nil() {
            customer.id = Uuid::new_v4();
        }
        let now = Utc::now();
        customer.created_at = now;
        customer.updated_at = now;
        customer.version = 1;

        let sealed_tax_id = seal_tax_id(cipher, customer.tax_id.as_deref())?;

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, customer_number, first_name, middle_name, last_name,
                date_of_birth, tax_id, email, phone, status,
                created_at, updated_at, created_by, version
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14
            )
            "#,
        )
        .bind(customer.id)
        .bind(&customer.customer_number)
        .bind(&customer.first_name)
        .bind(&customer.middle_name)
        .bind(&customer.last_name)
        .bind(customer.date_of_birth)
        .bind(sealed_tax_id)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.status)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .bind(customer.created_by)
        .bind(customer.version)
        .execute(db)
        .await
        .map_err(map_insert_err)?;

        Ok(())
    }

    pub(super) async fn get_customer_by_id<'e>(
        db: impl PgExecutor<'e>,
        cipher: &FieldCipher,
        id: Uuid,
    ) -> Result<Customer, StoreError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!("{CUSTOMER_SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or(StoreError::NotFound)?;

        row.into_customer(cipher)
    }

    pub(super) async fn get_customer_by_number<'e>(
        db: impl PgExecutor<'e>,
        cipher: &FieldCipher,
        customer_number: &str,
    ) -> Result<Customer, StoreError> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!(
            "{CUSTOMER_SELECT} WHERE customer_number = $1"
        ))
        .bind(customer_number)
        .fetch_optional(db)
        .await?
        .ok_or(StoreError::NotFound)?;

        row.into_customer(cipher)
    }

    /// Compare-and-swap update. The caller-held `version` is advanced by
    /// exactly 1 and the WHERE clause requires the old value, so a stale
    /// writer affects zero rows and gets a Conflict instead of silently
    /// overwriting.
    pub(super) async fn update_customer<'e>(
        db: impl PgExecutor<'e>,
        cipher: &FieldCipher,
        customer: &mut Customer,
    ) -> Result<(), StoreError> {
        customer.updated_at = Utc::now();
        customer.version += 1;

        let sealed_tax_id = seal_tax_id(cipher, customer.tax_id.as_deref())?;

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                customer_number = $2,
                first_name = $3,
                middle_name = $4,
                last_name = $5,
                date_of_birth = $6,
                tax_id = $7,
                email = $8,
                phone = $9,
                status = $10,
                updated_at = $11,
                updated_by = $12,
                version = $13
            WHERE id = $1 AND version = $14
            "#,
        )
        .bind(customer.id)
        .bind(&customer.customer_number)
        .bind(&customer.first_name)
        .bind(&customer.middle_name)
        .bind(&customer.last_name)
        .bind(customer.date_of_birth)
        .bind(sealed_tax_id)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.status)
        .bind(customer.updated_at)
        .bind(customer.updated_by)
        .bind(customer.version)
        .bind(customer.version - 1)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict {
                id: customer.id,
                version: customer.version - 1,
            });
        }

        Ok(())
    }

    pub(super) async fn delete_customer<'e>(
        db: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub(super) async fn search_customers<'e>(
        db: impl PgExecutor<'e>,
        cipher: &FieldCipher,
        filters: &SearchFilters,
    ) -> Result<Vec<Customer>, StoreError> {
        let mut builder = QueryBuilder::new(format!("{CUSTOMER_SELECT} WHERE 1=1"));

        if let Some(first_name) = filters.first_name.as_deref().filter(|v| !v.is_empty()) {
            builder.push(" AND first_name ILIKE ");
            builder.push_bind(format!("%{first_name}%"));
        }
        if let Some(last_name) = filters.last_name.as_deref().filter(|v| !v.is_empty()) {
            builder.push(" AND last_name ILIKE ");
            builder.push_bind(format!("%{last_name}%"));
        }
        if let Some(email) = filters.email.as_deref().filter(|v| !v.is_empty()) {
            builder.push(" AND email ILIKE ");
            builder.push_bind(format!("%{email}%"));
        }
        if let Some(phone) = filters.phone.as_deref().filter(|v| !v.is_empty()) {
            builder.push(" AND phone ILIKE ");
            builder.push_bind(format!("%{phone}%"));
        }
        if let Some(status) = filters.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        if let Some(from_date) = filters.from_date {
            builder.push(" AND created_at >= ");
            builder.push_bind(from_date);
        }
        if let Some(to_date) = filters.to_date {
            builder.push(" AND created_at <= ");
            builder.push_bind(to_date);
        }

        let limit = filters.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_SEARCH_LIMIT);
        let offset = filters.offset.filter(|o| *o > 0).unwrap_or(0);

        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let rows = builder
            .build_query_as::<CustomerRow>()
            .fetch_all(db)
            .await?;

        rows.into_iter()
            .map(|row| row.into_customer(cipher))
            .collect()
    }

    pub(super) async fn insert_address<'e>(
        db: impl PgExecutor<'e>,
        address: &mut Address,
    ) -> Result<(), StoreError> {
        if address.id.is_nil() {
            address.id = Uuid::new_v4();
        }
        let now = Utc::now();
        address.created_at = now;
        address.updated_at = now;

        sqlx::query(
            r#"
            INSERT INTO addresses (
                id, customer_id, address_type, street1, street2,
                city, state, postal_code, country, is_primary,
                valid_from, valid_to, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14
            )
            "#,
        )
        .bind(address.id)
        .bind(address.customer_id)
        .bind(address.address_type)
        .bind(&address.street1)
        .bind(&address.street2)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(address.is_primary)
        .bind(address.valid_from)
        .bind(address.valid_to)
        .bind(address.created_at)
        .bind(address.updated_at)
        .execute(db)
        .await
        .map_err(map_insert_err)?;

        Ok(())
    }

    pub(super) async fn update_address<'e>(
        db: impl PgExecutor<'e>,
        address: &mut Address,
    ) -> Result<(), StoreError> {
        address.updated_at = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE addresses SET
                address_type = $2,
                street1 = $3,
                street2 = $4,
                city = $5,
                state = $6,
                postal_code = $7,
                country = $8,
                is_primary = $9,
                valid_from = $10,
                valid_to = $11,
                updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(address.id)
        .bind(address.address_type)
        .bind(&address.street1)
        .bind(&address.street2)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(address.is_primary)
        .bind(address.valid_from)
        .bind(address.valid_to)
        .bind(address.updated_at)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub(super) async fn get_customer_addresses<'e>(
        db: impl PgExecutor<'e>,
        customer_id: Uuid,
    ) -> Result<Vec<Address>, StoreError> {
        let addresses = sqlx::query_as::<_, Address>(
            r#"
            SELECT id, customer_id, address_type, street1, street2,
                   city, state, postal_code, country, is_primary,
                   valid_from, valid_to, created_at, updated_at
            FROM addresses
            WHERE customer_id = $1
            ORDER BY is_primary DESC, created_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(db)
        .await?;

        Ok(addresses)
    }

    pub(super) async fn delete_address<'e>(
        db: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub(super) async fn insert_document<'e>(
        db: impl PgExecutor<'e>,
        cipher: &FieldCipher,
        document: &mut CustomerDocument,
    ) -> Result<(), StoreError> {
        if document.id.is_nil() {
            document.id = Uuid::new_v4();
        }
        let now = Utc::now();
        document.created_at = now;
        document.updated_at = now;

        let sealed_number = cipher.encrypt(&document.document_number)?;

        sqlx::query(
            r#"
            INSERT INTO customer_documents (
                id, customer_id, document_type, document_number,
                issuing_authority, issuing_country, issue_date, expiry_date,
                verification_status, verified_at, verified_by, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13
            )
            "#,
        )
        .bind(document.id)
        .bind(document.customer_id)
        .bind(document.document_type)
        .bind(sealed_number)
        .bind(&document.issuing_authority)
        .bind(&document.issuing_country)
        .bind(document.issue_date)
        .bind(document.expiry_date)
        .bind(document.verification_status)
        .bind(document.verified_at)
        .bind(document.verified_by)
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(db)
        .await
        .map_err(map_insert_err)?;

        Ok(())
    }

    pub(super) async fn update_document<'e>(
        db: impl PgExecutor<'e>,
        cipher: &FieldCipher,
        document: &mut CustomerDocument,
    ) -> Result<(), StoreError> {
        document.updated_at = Utc::now();

        let sealed_number = cipher.encrypt(&document.document_number)?;

        let result = sqlx::query(
            r#"
            UPDATE customer_documents SET
                document_type = $2,
                document_number = $3,
                issuing_authority = $4,
                issuing_country = $5,
                issue_date = $6,
                expiry_date = $7,
                verification_status = $8,
                verified_at = $9,
                verified_by = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(document.id)
        .bind(document.document_type)
        .bind(sealed_number)
        .bind(&document.issuing_authority)
        .bind(&document.issuing_country)
        .bind(document.issue_date)
        .bind(document.expiry_date)
        .bind(document.verification_status)
        .bind(document.verified_at)
        .bind(document.verified_by)
        .bind(document.updated_at)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub(super) async fn get_customer_documents<'e>(
        db: impl PgExecutor<'e>,
        cipher: &FieldCipher,
        customer_id: Uuid,
    ) -> Result<Vec<CustomerDocument>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, customer_id, document_type, document_number,
                   issuing_authority, issuing_country, issue_date, expiry_date,
                   verification_status, verified_at, verified_by, created_at, updated_at
            FROM customer_documents
            WHERE customer_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(db)
        .await?;

        rows.into_iter()
            .map(|row| row.into_document(cipher))
            .collect()
    }

    pub(super) async fn delete_document<'e>(
        db: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM customer_documents WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub(super) async fn insert_status_change<'e>(
        db: impl PgExecutor<'e>,
        change: &mut StatusChange,
    ) -> Result<(), StoreError> {
        if change.id.is_nil() {
            change.id = Uuid::new_v4();
        }

        sqlx::query(
            r#"
            INSERT INTO status_changes (
                id, customer_id, previous_status, new_status, reason, changed_by, changed_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7
            )
            "#,
        )
        .bind(change.id)
        .bind(change.customer_id)
        .bind(change.previous_status)
        .bind(change.new_status)
        .bind(&change.reason)
        .bind(change.changed_by)
        .bind(change.changed_at)
        .execute(db)
        .await
        .map_err(map_insert_err)?;

        Ok(())
    }

    pub(super) async fn get_status_history<'e>(
        db: impl PgExecutor<'e>,
        customer_id: Uuid,
    ) -> Result<Vec<StatusChange>, StoreError> {
        let changes = sqlx::query_as::<_, StatusChange>(
            r#"
            SELECT id, customer_id, previous_status, new_status, reason, changed_by, changed_at
            FROM status_changes
            WHERE customer_id = $1
            ORDER BY changed_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(db)
        .await?;

        Ok(changes)
    }
}
