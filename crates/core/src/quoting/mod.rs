//! Quote lifecycle algorithms. Everything here is pure: callers load rows,
//! hand them in, and persist what comes back inside their own transaction.

pub mod clone;
pub mod expiration;
pub mod reconcile;
pub mod submission;
pub mod totals;
pub mod versioning;
