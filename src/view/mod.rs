//! Route-level state for the console's screens.

pub mod dashboard;
pub mod settings;
pub mod users;

pub use dashboard::{DashboardSummary, summarize};
pub use settings::SettingsView;
pub use users::{LoadOutcome, PageInfo, UsersPage, UsersRoute};
