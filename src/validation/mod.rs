use std::fmt;
use std::sync::LazyLock;

use chrono::{Months, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;

use crate::domain::{CustomerStatus, SearchFilters};
use crate::service::requests::{
    AddAddressRequest, AddDocumentRequest, ChangeStatusRequest, CreateCustomerRequest,
    UpdateCustomerRequest,
};

// ============================================================================
// Domain Validator
// ============================================================================
//
// Stateless rule checker. Every method walks the whole payload and reports
// every violated field; nothing short-circuits after the first failure, so
// a caller can fix an entire request in one round trip.
//
// ============================================================================

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").unwrap());

static US_SSN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{3}-\d{2}-\d{4}$").unwrap());

static UK_NINO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{2}\d{6}[A-Z]$").unwrap());

static EU_TAX_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{2}\d{8,12}$").unwrap());

static GENERIC_TAX_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9-]{5,20}$").unwrap());

/// One violated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every violation found in one payload. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn of(field: &str, message: impl Into<String>) -> Self {
        let mut errs = Self::default();
        errs.push(field, message);
        errs
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(ValidationError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ok when no field was violated, the full error list otherwise.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: ")?;
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Rejected status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid status transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: CustomerStatus,
    pub to: CustomerStatus,
}

/// Stateless validator for customer payloads and the status state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_customer_create(&self, req: &CreateCustomerRequest) -> ValidationErrors {
        let mut errs = ValidationErrors::default();

        check_name(&mut errs, "first_name", &req.first_name);
        check_name(&mut errs, "last_name", &req.last_name);

        if req.email.is_empty() {
            errs.push("email", "is required");
        } else if !EMAIL_RE.is_match(&req.email) {
            errs.push("email", "is invalid format");
        }

        if let Some(phone) = non_empty(req.phone.as_deref()) {
            if !PHONE_RE.is_match(phone) {
                errs.push(
                    "phone",
                    "is invalid format; use international format, e.g. +14155550123",
                );
            }
        }

        match req.date_of_birth {
            None => errs.push("date_of_birth", "is required"),
            Some(dob) => check_date_of_birth(&mut errs, dob),
        }

        if let Some(tax_id) = non_empty(req.tax_id.as_deref()) {
            if let Some(err) = self.validate_tax_id(tax_id, "") {
                errs.0.push(err);
            }
        }

        errs
    }

    pub fn validate_customer_update(&self, req: &UpdateCustomerRequest) -> ValidationErrors {
        let mut errs = ValidationErrors::default();

        if req.customer_id.is_nil() {
            errs.push("customer_id", "is required");
        }

        if req.version < 1 {
            errs.push("version", "is required for optimistic locking");
        }

        if let Some(first_name) = non_empty(req.first_name.as_deref()) {
            check_name_length(&mut errs, "first_name", first_name);
        }
        if let Some(last_name) = non_empty(req.last_name.as_deref()) {
            check_name_length(&mut errs, "last_name", last_name);
        }

        if let Some(email) = non_empty(req.email.as_deref()) {
            if !EMAIL_RE.is_match(email) {
                errs.push("email", "is invalid format");
            }
        }

        if let Some(phone) = non_empty(req.phone.as_deref()) {
            if !PHONE_RE.is_match(phone) {
                errs.push(
                    "phone",
                    "is invalid format; use international format, e.g. +14155550123",
                );
            }
        }

        if let Some(dob) = req.date_of_birth {
            check_date_of_birth(&mut errs, dob);
        }

        if let Some(tax_id) = non_empty(req.tax_id.as_deref()) {
            if let Some(err) = self.validate_tax_id(tax_id, "") {
                errs.0.push(err);
            }
        }

        errs
    }

    /// Tax identifier format check. Country-specific when the jurisdiction
    /// is known, a generic alphanumeric-with-hyphens pattern otherwise.
    pub fn validate_tax_id(&self, tax_id: &str, country: &str) -> Option<ValidationError> {
        let length = tax_id.chars().count();
        if !(5..=50).contains(&length) {
            return Some(ValidationError {
                field: "tax_id".into(),
                message: "must be between 5 and 50 characters".into(),
            });
        }

        let (re, message): (&Regex, &str) = match country {
            "US" => (&US_SSN_RE, "invalid US SSN format (XXX-XX-XXXX)"),
            "UK" => (&UK_NINO_RE, "invalid UK NINO format"),
            "DE" | "FR" | "IT" | "ES" => (&EU_TAX_ID_RE, "invalid EU tax ID format"),
            _ => (&GENERIC_TAX_ID_RE, "invalid tax ID format"),
        };

        if !re.is_match(tax_id) {
            return Some(ValidationError {
                field: "tax_id".into(),
                message: message.into(),
            });
        }

        None
    }

    pub fn validate_address(&self, req: &AddAddressRequest) -> ValidationErrors {
        let mut errs = ValidationErrors::default();

        if req.customer_id.is_nil() {
            errs.push("customer_id", "is required");
        }

        check_required_bounded(&mut errs, "street1", &req.street1, 200);
        check_required_bounded(&mut errs, "city", &req.city, 100);
        check_required_bounded(&mut errs, "state", &req.state, 100);
        check_required_bounded(&mut errs, "postal_code", &req.postal_code, 20);
        check_country_code(&mut errs, "country", &req.country);

        errs
    }

    pub fn validate_document(&self, req: &AddDocumentRequest) -> ValidationErrors {
        let mut errs = ValidationErrors::default();

        if req.customer_id.is_nil() {
            errs.push("customer_id", "is required");
        }

        check_required_bounded(&mut errs, "document_number", &req.document_number, 50);
        check_country_code(&mut errs, "issuing_country", &req.issuing_country);

        if req.issuing_authority.is_empty() {
            errs.push("issuing_authority", "is required");
        }

        if req.issue_date.is_none() {
            errs.push("issue_date", "is required");
        }

        match req.expiry_date {
            None => errs.push("expiry_date", "is required"),
            Some(expiry) => {
                if expiry <= Utc::now() {
                    errs.push("expiry_date", "must be in the future");
                }
                if let Some(issue) = req.issue_date {
                    if expiry <= issue {
                        errs.push("expiry_date", "must be after issue date");
                    }
                }
            }
        }

        errs
    }

    pub fn validate_status_change(&self, req: &ChangeStatusRequest) -> ValidationErrors {
        let mut errs = ValidationErrors::default();

        if req.customer_id.is_nil() {
            errs.push("customer_id", "is required");
        }
        if req.reason.is_empty() {
            errs.push("reason", "is required");
        }

        errs
    }

    pub fn validate_search_filters(&self, filters: &SearchFilters) -> ValidationErrors {
        let mut errs = ValidationErrors::default();

        if let Some(limit) = filters.limit {
            if limit < 0 {
                errs.push("limit", "must be non-negative");
            }
            if limit > 100 {
                errs.push("limit", "must not exceed 100");
            }
        }

        if let Some(offset) = filters.offset {
            if offset < 0 {
                errs.push("offset", "must be non-negative");
            }
        }

        if let Some(email) = non_empty(filters.email.as_deref()) {
            if !EMAIL_RE.is_match(email) {
                errs.push("email", "is invalid format");
            }
        }

        if let Some(phone) = non_empty(filters.phone.as_deref()) {
            if !PHONE_RE.is_match(phone) {
                errs.push("phone", "is invalid format");
            }
        }

        errs
    }

    /// Status-transition state machine. `Closed` is terminal; every other
    /// edge outside the table below is rejected.
    pub fn validate_status_transition(
        &self,
        current: CustomerStatus,
        requested: CustomerStatus,
    ) -> Result<(), InvalidTransition> {
        use CustomerStatus::*;

        let allowed = matches!(
            (current, requested),
            (Pending, Active | Closed)
                | (Active, Inactive | Suspended | Closed)
                | (Inactive, Active | Suspended | Closed)
                | (Suspended, Active | Inactive | Closed)
        );

        if allowed {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: current,
                to: requested,
            })
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn check_name(errs: &mut ValidationErrors, field: &str, value: &str) {
    if value.is_empty() {
        errs.push(field, "is required");
    } else {
        check_name_length(errs, field, value);
    }
}

fn check_name_length(errs: &mut ValidationErrors, field: &str, value: &str) {
    let length = value.chars().count();
    if !(2..=100).contains(&length) {
        errs.push(field, "must be between 2 and 100 characters");
    }
}

fn check_required_bounded(errs: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    if value.is_empty() {
        errs.push(field, "is required");
    } else if value.chars().count() > max {
        errs.push(field, format!("must not exceed {max} characters"));
    }
}

fn check_country_code(errs: &mut ValidationErrors, field: &str, value: &str) {
    if value.is_empty() {
        errs.push(field, "is required");
    } else if value.chars().count() != 2 || !value.chars().all(|c| c.is_ascii_alphabetic()) {
        errs.push(field, "must be a 2-letter ISO country code");
    }
}

fn check_date_of_birth(errs: &mut ValidationErrors, dob: NaiveDate) {
    let today = Utc::now().date_naive();

    if let Some(adult_cutoff) = today.checked_sub_months(Months::new(12 * 18)) {
        if dob > adult_cutoff {
            errs.push("date_of_birth", "customer must be at least 18 years old");
        }
    }

    if let Some(oldest_plausible) = today.checked_sub_months(Months::new(12 * 150)) {
        if dob < oldest_plausible {
            errs.push("date_of_birth", "is too far in the past");
        }
    }
}
