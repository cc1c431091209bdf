use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Address, AddressType, Customer, CustomerDocument, CustomerStatus, DocumentType, StatusChange,
};

// ============================================================================
// Service Requests & Responses
// ============================================================================
//
// The payload records the front-ends hand to the orchestrator. Enumerated
// fields are already typed: the transport layer parses strings via
// `FromStr` and maps parse failures to invalid-argument before the payload
// ever reaches this crate. Optional fields carry partial-update semantics:
// an absent (or empty) field leaves the stored value unchanged.
//
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCustomerRequest {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub tax_id: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCustomerRequest {
    pub customer_id: Uuid,
    /// The version the caller read. The update is rejected if another
    /// writer has advanced it since.
    pub version: i32,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub updated_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddAddressRequest {
    pub customer_id: Uuid,
    pub address_type: Option<AddressType>,
    pub street1: String,
    pub street2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_primary: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddDocumentRequest {
    pub customer_id: Uuid,
    pub document_type: DocumentType,
    pub document_number: String,
    pub issuing_authority: String,
    pub issuing_country: String,
    pub issue_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub submitted_by: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeStatusRequest {
    pub customer_id: Uuid,
    pub new_status: CustomerStatus,
    pub reason: String,
    pub changed_by: Uuid,
}

/// The customer aggregate assembled for presentation: the record plus every
/// owned entity, including the persisted status history.
#[derive(Debug, Clone, Serialize)]
pub struct FullProfile {
    pub customer: Customer,
    pub addresses: Vec<Address>,
    pub documents: Vec<CustomerDocument>,
    pub status_history: Vec<StatusChange>,
}
