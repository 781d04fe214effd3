//! # batiflow-db: Persistence Layer for BatiFlow
//!
//! This crate stores quotes and invoices in SQLite (sqlx, async) and runs
//! the quote → invoice conversion inside a transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        BatiFlow Data Flow                               │
//! │                                                                         │
//! │  Web editor (save, sign, "Create deposit invoice")                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   batiflow-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌─────────────────┐  ┌─────────────────┐   │   │
//! │  │   │   Database    │  │  Repositories   │  │  Conversion     │   │   │
//! │  │   │   (pool.rs)   │  │ DocumentRepo    │  │  Service        │   │   │
//! │  │   │ SqlitePool    │◄─│ SequenceRepo    │◄─│ (one txn per    │   │   │
//! │  │   │ BillingConfig │  │                 │  │  conversion)    │   │   │
//! │  │   └───────────────┘  └─────────────────┘  └─────────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                 ▲                               │
//! │       ▼                                 │ totals, rules                 │
//! │  ┌──────────────────────┐        ┌──────┴────────┐                      │
//! │  │   SQLite Database    │        │ batiflow-core │                      │
//! │  │   documents          │        └───────────────┘                      │
//! │  │   document_sequences │                                               │
//! │  └──────────────────────┘                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML + environment configuration
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Document and numbering repositories
//! - [`service`] - Transactional quote → invoice conversion
//!
//! ## Usage
//!
//! ```rust,ignore
//! use batiflow_core::{ConversionMode, DocumentType};
//! use batiflow_db::{BillingConfig, Database};
//!
//! let config = BillingConfig::load(None)?;
//! let db = Database::new(config.to_db_config()).await?;
//!
//! let quote = db.documents().create_draft(DocumentType::Quote).await?;
//! // ... edit, save, sign ...
//! let deposit = db.conversions().convert(&quote.id, ConversionMode::Deposit).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{BillingConfig, ConfigError, NumberingStrategy};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::document::DocumentRepository;
pub use repository::sequence::SequenceRepository;
pub use service::ConversionService;
