//! Data models for club documents.
//!
//! Every model serialises with camelCase field names, the shape documents take
//! in the store. Dates are ISO `YYYY-MM-DD`; instants are epoch milliseconds so
//! they order correctly in queries.

mod admin;
mod attendance;
mod contribution;
mod loan;
mod member;
mod notification;

pub use admin::{Admin, AdminInfo};
pub use attendance::AttendanceRecord;
pub use contribution::{Contribution, NewContribution};
pub use loan::{Loan, LoanStatus, NewLoan};
pub use member::{Member, NewMember};
pub use notification::{NewNotification, Notification, NotificationCategory};
