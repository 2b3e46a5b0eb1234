//! Collection names shared by every client of the store.

pub const CLUB_MEMBERS: &str = "clubMembers";
pub const CONTRIBUTIONS: &str = "contributions";
pub const LOANS: &str = "loans";
pub const ATTENDANCE: &str = "attendance";
pub const NOTIFICATIONS: &str = "notifications";
pub const ADMINS: &str = "admins";
pub const SESSIONS: &str = "sessions";
pub const PASSWORD_RESETS: &str = "passwordResets";
