//! Framework-agnostic scheduling and voucher logic.

pub mod catalog;
pub mod clock;
pub mod counter;
pub mod report;
pub mod session;
pub mod slot;
pub mod voucher;
