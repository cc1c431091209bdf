// ============================================================================
// Domain Layer
// ============================================================================
//
// Entities and value domains for the customer record. Business rules live in
// the validator and the service layer; this module only defines the shapes
// and the predicates that belong to the types themselves.
//
// ============================================================================

pub mod model;

pub use model::{
    Address, AddressType, Customer, CustomerDocument, CustomerStatus, DocumentType, SearchFilters,
    StatusChange, VerificationStatus,
};
