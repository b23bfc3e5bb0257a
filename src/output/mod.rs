//! Output renderers: terminal and JSON.

pub mod json;
pub mod terminal;

use crate::client::ApiError;
use crate::models::User;
use crate::view::{DashboardSummary, SettingsView, UsersPage};

/// Renders each console screen to a string.
pub trait OutputRenderer {
    /// A page of the user list.
    fn users(&self, page: &UsersPage) -> String;

    /// A single user.
    fn user(&self, user: &User) -> String;

    /// Confirmation that a user was deleted.
    fn deleted(&self, id: &str) -> String;

    fn dashboard(&self, summary: &DashboardSummary) -> String;

    fn settings(&self, view: &SettingsView) -> String;

    /// A failed request, shown in place of the data.
    fn failure(&self, err: &ApiError) -> String;
}
