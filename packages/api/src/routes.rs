//! Named navigation targets of the app.

use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Dashboard,
    Members,
    Loans,
    Contributions,
    Reports,
    Settings,
    Attendance,
    Notifications,
    AddMember,
    AddContribution,
    SendNotification,
}

impl Route {
    pub const ALL: [Route; 12] = [
        Route::Login,
        Route::Dashboard,
        Route::Members,
        Route::Loans,
        Route::Contributions,
        Route::Reports,
        Route::Settings,
        Route::Attendance,
        Route::Notifications,
        Route::AddMember,
        Route::AddContribution,
        Route::SendNotification,
    ];

    /// Tabs of the bottom navigation bar, in display order.
    pub const BOTTOM_NAV: [Route; 4] = [
        Route::Dashboard,
        Route::Members,
        Route::Reports,
        Route::Settings,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "login",
            Route::Dashboard => "dashboard",
            Route::Members => "members",
            Route::Loans => "loans",
            Route::Contributions => "contributions",
            Route::Reports => "reports",
            Route::Settings => "settings",
            Route::Attendance => "attendance",
            Route::Notifications => "notifications",
            Route::AddMember => "addMember",
            Route::AddContribution => "addContribution",
            Route::SendNotification => "sendNotification",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Dashboard => "Dashboard",
            Route::Members => "Members",
            Route::Loans => "Loans",
            Route::Contributions => "Contributions",
            Route::Reports => "Reports",
            Route::Settings => "Settings",
            Route::Attendance => "Daily Attendance",
            Route::Notifications => "Notifications",
            Route::AddMember => "Add Member",
            Route::AddContribution => "Add Contribution",
            Route::SendNotification => "Send Notification",
        }
    }

    /// Screens reachable without a signed-in admin.
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = String;

    /// Accepts the path with or without a leading `/`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.trim().trim_start_matches('/');
        Route::ALL
            .into_iter()
            .find(|r| r.path() == path)
            .ok_or_else(|| format!("unknown route: {s}"))
    }
}
