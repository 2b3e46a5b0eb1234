//! # API crate: club operations for Nkhonde
//!
//! Every screen of the app maps to a handful of stateless async functions here.
//! Each takes a [`store::DocumentStore`] plus explicit request data (the
//! signed-in chairperson's e-mail, ids, form input) and returns an
//! [`ApiResult`]. Front ends hold no state beyond the session token.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | Admin registration, password sign-in, sessions, password reset |
//! | [`members`] | Member roster: add (with photo upload), list, look up, search |
//! | [`contributions`] | Deposits, listing and the live contribution feed |
//! | [`loans`] | Loan applications and listing |
//! | [`ledger`] | Loan approval and unapproval with the matching balance adjustment |
//! | [`attendance`] | Meeting attendance sheets and absence penalties |
//! | [`notifications`] | Club notifications and the derived activity feed |
//! | [`reports`] | Dashboard figures, period series, member statements |
//! | [`routes`] | Named navigation targets |
//! | [`models`] | Documents as stored, and the form inputs that create them |
//! | [`error`] | [`ApiError`] and the mapping from [`store::StoreError`] |

pub mod attendance;
pub mod auth;
pub mod contributions;
pub mod error;
pub mod ledger;
pub mod loans;
pub mod members;
pub mod models;
pub mod notifications;
pub mod reports;
pub mod routes;

#[cfg(test)]
mod testing;

pub use error::{ApiError, ApiResult};
pub use ledger::{approve_loan, unapprove_loan, LedgerAdjustment, LoanDecision};
pub use models::{AdminInfo, Contribution, Loan, LoanStatus, Member, Notification};
pub use routes::Route;

pub use store::ClubConfig;
