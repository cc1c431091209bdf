use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use customer_core::config::Config;
use customer_core::crypto::FieldCipher;
use customer_core::domain::{CustomerStatus, DocumentType, SearchFilters};
use customer_core::metrics::{start_metrics_server, Metrics};
use customer_core::service::requests::{
    AddAddressRequest, AddDocumentRequest, ChangeStatusRequest, CreateCustomerRequest,
    UpdateCustomerRequest,
};
use customer_core::service::CustomerService;
use customer_core::store::PgCustomerStore;
use customer_core::utils::{retry_with_backoff, RetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering.
    // Default to INFO level, can be overridden with RUST_LOG.
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,customer_core=debug")),
        )
        .init();

    tracing::info!("🚀 Starting customer record service core");

    let config = Config::from_env()?;

    // === 1. Connect to PostgreSQL (riding out a database that is still booting) ===
    tracing::info!("Connecting to PostgreSQL...");
    let pool = retry_with_backoff(&RetryConfig::default(), "database_connect", || {
        PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
    })
    .await?;

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("Schema migrations applied");

    // === 2. Build the cipher, metrics and the service stack ===
    let cipher = Arc::new(FieldCipher::new(config.encryption_key.as_bytes())?);
    let metrics = Arc::new(Metrics::new()?);

    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().expect("metrics runtime");
        rt.block_on(async {
            if let Err(e) = start_metrics_server(metrics_registry, metrics_port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    });

    let store = PgCustomerStore::new(pool.clone(), cipher);
    let service = CustomerService::new(store, metrics);

    // === 3. Demonstrate the full customer lifecycle ===
    tracing::info!("📝 Demonstrating customer lifecycle");

    let operator = Uuid::new_v4();

    let customer = service
        .create_customer(CreateCustomerRequest {
            first_name: "Ada".into(),
            middle_name: None,
            last_name: "Lovelace".into(),
            date_of_birth: Some("1990-01-01".parse()?),
            tax_id: Some("123-45-6789".into()),
            email: "ada@example.com".into(),
            phone: Some("+14155550123".into()),
            created_by: operator,
        })
        .await?;
    tracing::info!(
        "✅ Customer created: {} ({}, version {})",
        customer.customer_number,
        customer.id,
        customer.version
    );

    let customer = service
        .update_customer(UpdateCustomerRequest {
            customer_id: customer.id,
            version: customer.version,
            email: Some("ada.l@example.com".into()),
            updated_by: Some(operator),
            ..Default::default()
        })
        .await?;
    tracing::info!("✅ Customer updated to version {}", customer.version);

    let address = service
        .add_address(AddAddressRequest {
            customer_id: customer.id,
            address_type: None,
            street1: "12 Crescent Road".into(),
            street2: None,
            city: "London".into(),
            state: "Greater London".into(),
            postal_code: "N8 8AX".into(),
            country: "GB".into(),
            is_primary: false,
            valid_from: None,
            valid_to: None,
        })
        .await?;
    tracing::info!("✅ Address added (primary: {})", address.is_primary);

    let document = service
        .add_document(AddDocumentRequest {
            customer_id: customer.id,
            document_type: DocumentType::Passport,
            document_number: "P1234567".into(),
            issuing_authority: "HM Passport Office".into(),
            issuing_country: "GB".into(),
            issue_date: Some("2020-06-01T00:00:00Z".parse()?),
            expiry_date: Some("2030-06-01T00:00:00Z".parse()?),
            submitted_by: operator,
        })
        .await?;
    tracing::info!(
        "✅ Document submitted: {:?} ({:?})",
        document.document_type,
        document.verification_status
    );

    let (customer, change) = service
        .update_customer_status(ChangeStatusRequest {
            customer_id: customer.id,
            new_status: CustomerStatus::Active,
            reason: "KYC review complete".into(),
            changed_by: operator,
        })
        .await?;
    tracing::info!(
        "✅ Status changed: {} -> {} ({})",
        change.previous_status,
        change.new_status,
        change.reason
    );

    let profile = service.get_full_profile(customer.id).await?;
    tracing::info!(
        "✅ Full profile: {} addresses, {} documents, {} status changes",
        profile.addresses.len(),
        profile.documents.len(),
        profile.status_history.len()
    );

    let results = service
        .search_customers(SearchFilters {
            last_name: Some("Lovelace".into()),
            status: Some(CustomerStatus::Active),
            ..Default::default()
        })
        .await?;
    tracing::info!("✅ Search returned {} customer(s)", results.len());

    tracing::info!("🎉 Lifecycle complete");

    Ok(())
}
