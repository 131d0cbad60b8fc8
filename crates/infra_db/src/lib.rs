//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the chit fund billing system using SQLx.
//!
//! # Architecture
//!
//! - [`repositories`]: SQL and row types
//! - [`adapters`]: `BillingPort` implementation over the repositories
//! - [`pool`]: connection pool configuration and migrations
//!
//! # Invoice Chain Integrity
//!
//! Invoice inserts run in a transaction holding a per-enrollment advisory
//! lock. Inside it the adapter checks that the invoice's predecessor is still
//! the latest earlier invoice and that nothing dated on or after it exists. Invoice
//! numbers come from the `invoice_number_seq` sequence.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresBillingAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/chit", 10)).await?;
//! run_migrations(&pool).await?;
//! let adapter = PostgresBillingAdapter::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::PostgresBillingAdapter;
pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
