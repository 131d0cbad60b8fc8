//! Domain Adapters
//!
//! Implementations of domain ports on the PostgreSQL database layer. Each
//! adapter translates between domain models and repository row types.

pub mod billing;

pub use billing::PostgresBillingAdapter;
