use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

// ============================================================================
// Domain Model
// ============================================================================
//
// The customer aggregate and its owned entities. Enumerated value domains are
// closed Rust enums: an illegal status or document type cannot be
// constructed, it can only fail to parse at the boundary. Sensitive fields
// (tax id, document number) are excluded from serialization entirely and are
// encrypted by the record store before they reach the database.
//
// ============================================================================

/// Lifecycle status of a customer record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, sqlx::Type,
)]
#[sqlx(type_name = "customer_status")]
pub enum CustomerStatus {
    Pending,
    Active,
    Inactive,
    Suspended,
    Closed,
}

/// Kind of postal address.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type,
)]
#[sqlx(type_name = "address_type")]
pub enum AddressType {
    Physical,
    Mailing,
    Business,
}

/// Kind of identification document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type,
)]
#[sqlx(type_name = "document_type")]
pub enum DocumentType {
    Passport,
    DriversLicense,
    #[strum(serialize = "NationalID")]
    #[sqlx(rename = "NationalID")]
    #[serde(rename = "NationalID")]
    NationalId,
    #[strum(serialize = "SSN")]
    #[sqlx(rename = "SSN")]
    #[serde(rename = "SSN")]
    Ssn,
    #[strum(serialize = "TaxID")]
    #[sqlx(rename = "TaxID")]
    #[serde(rename = "TaxID")]
    TaxId,
    UtilityBill,
    BankStatement,
}

impl DocumentType {
    /// Whether this document type is sufficient proof of identity on its
    /// own, as opposed to supporting evidence like a utility bill.
    pub fn is_identity(self) -> bool {
        matches!(
            self,
            Self::Passport | Self::DriversLicense | Self::NationalId | Self::Ssn
        )
    }
}

/// Verification state of a submitted document. Mutated by an external
/// verification workflow; observed here for auto-activation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type,
)]
#[sqlx(type_name = "verification_status")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Expired,
    Rejected,
}

/// The authoritative identity record for a regulated individual.
///
/// `version` implements optimistic concurrency: it starts at 1 and every
/// successful update advances it by exactly 1; a writer presenting a stale
/// version is rejected by the record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub customer_number: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// National tax/identification number. Encrypted at rest, never
    /// serialized outward.
    #[serde(skip)]
    pub tax_id: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub status: CustomerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub version: i32,
}

/// Postal address owned by exactly one customer.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub address_type: AddressType,
    pub street1: String,
    pub street2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_primary: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identification document owned by exactly one customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDocument {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub document_type: DocumentType,
    /// Encrypted at rest, never serialized outward.
    #[serde(skip)]
    pub document_number: String,
    pub issuing_authority: String,
    pub issuing_country: String,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub verification_status: VerificationStatus,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable audit record of one status transition.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StatusChange {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub previous_status: CustomerStatus,
    pub new_status: CustomerStatus,
    pub reason: String,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
}

/// Optional conjunctive filters for customer search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<CustomerStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
