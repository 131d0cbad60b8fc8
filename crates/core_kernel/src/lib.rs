//! Core Kernel - Foundational types for the chit fund billing system
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money types with precise decimal arithmetic
//! - The billing calendar (cutoff day, reset day, month arithmetic)
//! - Strongly-typed identifiers
//! - Port abstractions used by persistence adapters

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError};
pub use temporal::{BillingCalendar, BillingPhase, Timezone, TemporalError, CUTOFF_DAY, RESET_DAY};
pub use identifiers::{CustomerId, PlanId, EnrollmentId, InvoiceId};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
pub use error::CoreError;
