//! Terminal renderer: colored tables and inline failures.

use colored::{ColoredString, Colorize};

use crate::client::{ApiError, ErrorKind};
use crate::models::{Role, Status, User};
use crate::output::OutputRenderer;
use crate::view::{DashboardSummary, SettingsView, UsersPage};

/// Terminal output renderer.
pub struct TerminalRenderer;

fn role_badge(role: Role) -> ColoredString {
    let label = format!("{:<10}", role.to_string());
    match role {
        Role::Admin => label.red(),
        Role::Moderator => label.blue(),
        Role::User => label.normal(),
    }
}

fn status_badge(status: Status) -> ColoredString {
    let label = format!("{:<10}", status.to_string());
    match status {
        Status::Active => label.green(),
        Status::Inactive => label.red(),
        Status::Suspended => label.yellow(),
    }
}

fn rule() -> ColoredString {
    "───────────────────────────────────".dimmed()
}

impl OutputRenderer for TerminalRenderer {
    fn users(&self, page: &UsersPage) -> String {
        let mut output = String::new();
        if page.list.users.is_empty() {
            output.push_str(&format!("  {}\n", "No users match these filters.".dimmed()));
        } else {
            let id_width = page
                .list
                .users
                .iter()
                .map(|u| u.id.len())
                .max()
                .unwrap_or(2)
                .max(2);
            let name_width = page
                .list
                .users
                .iter()
                .map(|u| u.name.chars().count())
                .max()
                .unwrap_or(4)
                .max(4);
            output.push_str(&format!(
                " {:<id_width$}  {:<name_width$}  {:<10}  {:<10}  {}\n",
                "ID".bold(),
                "NAME".bold(),
                "ROLE".bold(),
                "STATUS".bold(),
                "EMAIL".bold(),
            ));
            for user in page.list.users.iter() {
                output.push_str(&format!(
                    " {:<id_width$}  {:<name_width$}  {}  {}  {}\n",
                    user.id.dimmed(),
                    user.name,
                    role_badge(user.role),
                    status_badge(user.status),
                    user.email,
                ));
            }
        }

        let info = page.info;
        output.push_str(&format!("{}\n", rule()));
        output.push_str(&format!(
            " Showing {}-{} of {} {} · page {} of {}\n",
            info.first,
            info.last,
            info.total.to_string().bold(),
            if info.total == 1 { "user" } else { "users" },
            info.page,
            info.total_pages.max(1),
        ));
        if info.has_next() {
            output.push_str(&format!(
                " {} next page: --page {}\n",
                "→".cyan(),
                info.page + 1
            ));
        }
        output
    }

    fn user(&self, user: &User) -> String {
        let mut output = String::new();
        output.push_str(&format!(" {} {}\n", user.name.bold(), format!("#{}", user.id).dimmed()));
        output.push_str(&format!("   {:<9} {}\n", "email".dimmed(), user.email));
        output.push_str(&format!("   {:<9} {}\n", "role".dimmed(), role_badge(user.role)));
        output.push_str(&format!("   {:<9} {}\n", "status".dimmed(), status_badge(user.status)));
        if let Some(ref avatar) = user.avatar {
            output.push_str(&format!("   {:<9} {}\n", "avatar".dimmed(), avatar));
        }
        output.push_str(&format!(
            "   {:<9} {}\n",
            "created".dimmed(),
            user.created_at.format("%Y-%m-%d %H:%M UTC")
        ));
        output.push_str(&format!(
            "   {:<9} {}\n",
            "updated".dimmed(),
            user.updated_at.format("%Y-%m-%d %H:%M UTC")
        ));
        output
    }

    fn deleted(&self, id: &str) -> String {
        format!("  {} Deleted user {}.\n", "✔".green(), id.bold())
    }

    fn dashboard(&self, summary: &DashboardSummary) -> String {
        let mut output = String::new();
        output.push_str(&format!(" {}\n", "Dashboard".bold()));
        output.push_str(&format!("{}\n", rule()));

        match summary.total_users {
            Ok(total) => output.push_str(&format!(" {:<16} {}\n", "Total users", total.to_string().bold())),
            Err(ref e) => output.push_str(&format!(" {:<16} {}\n", "Total users", inline_error(e))),
        }
        if let Some(share) = summary.active_share() {
            output.push_str(&format!(" {:<16} {share:.0}%\n", "Active share"));
        }
        for (status, count) in &summary.by_status {
            output.push_str(&format!("   {} {count}\n", status_badge(*status)));
        }
        for (role, count) in &summary.by_role {
            output.push_str(&format!("   {} {count}\n", role_badge(*role)));
        }

        output.push_str(&format!("{}\n", rule()));
        match summary.health {
            Ok(ref health) => {
                let overall = if health.is_healthy() {
                    health.status.green()
                } else {
                    health.status.yellow()
                };
                output.push_str(&format!(" {:<16} {}\n", "System health", overall));
                for (name, state) in [
                    ("database", &health.services.database),
                    ("cache", &health.services.cache),
                    ("auth", &health.services.auth),
                ] {
                    let state = if state == "healthy" { state.green() } else { state.red() };
                    output.push_str(&format!("   {:<14} {}\n", name, state));
                }
            }
            Err(ref e) => output.push_str(&format!(" {:<16} {}\n", "System health", inline_error(e))),
        }
        output
    }

    fn settings(&self, view: &SettingsView) -> String {
        let mut output = String::new();
        output.push_str(&format!(" {}\n", "Settings".bold()));
        if view.sources.is_empty() {
            output.push_str(&format!("   {}\n", "no config files, using defaults".dimmed()));
        }
        for source in &view.sources {
            output.push_str(&format!("   {} {}\n", "from".dimmed(), source.display()));
        }
        if view.using_mock {
            output.push_str(&format!("   {}\n", "requests are answered by the built-in mock".yellow()));
        }
        output.push_str(&format!("{}\n", rule()));
        match view.to_toml() {
            Ok(toml) => output.push_str(&toml),
            Err(e) => output.push_str(&format!(" {} {e}\n", "✖".red())),
        }
        output
    }

    fn failure(&self, err: &ApiError) -> String {
        let mut output = format!(" {}\n", inline_error(err));
        if err.kind() == ErrorKind::Failure {
            output.push_str(&format!("   {} run the command again to retry\n", "→".cyan()));
        }
        output
    }
}

fn inline_error(err: &ApiError) -> String {
    match err {
        ApiError::NotFound { id } => format!("{} no user with id {}", "✖".red().bold(), id.bold()),
        ApiError::Validation(schema) => {
            let mut text = format!("{} {}", "✖".red().bold(), format!("invalid {}", schema.subject).red());
            for issue in &schema.issues {
                text.push_str(&format!("\n   · {issue}"));
            }
            text
        }
        ApiError::Network(reason) => format!("{} {} {}", "✖".red().bold(), "request failed:".red(), reason),
        ApiError::Client { status, message } => {
            format!("{} {} ({status}) {message}", "✖".red().bold(), "rejected".red())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::mock::fixture::seed_users;
    use crate::models::{SearchParams, UserList};
    use crate::schema::SchemaError;
    use crate::view::PageInfo;

    fn page(users: Vec<User>, total: u64) -> UsersPage {
        let list = UserList {
            users,
            total,
            page: 1,
            limit: 2,
        };
        UsersPage {
            params: SearchParams::default(),
            info: PageInfo::of(&list),
            list: Arc::new(list),
        }
    }

    #[test]
    fn renders_user_rows_and_footer() {
        let users: Vec<User> = seed_users().into_iter().take(2).collect();
        let output = TerminalRenderer.users(&page(users, 5));
        assert!(output.contains("John Doe"));
        assert!(output.contains("jane@example.com"));
        assert!(output.contains("of"));
        assert!(output.contains("--page 2"));
    }

    #[test]
    fn renders_empty_page() {
        let output = TerminalRenderer.users(&page(vec![], 0));
        assert!(output.contains("No users match"));
    }

    #[test]
    fn renders_user_detail_without_avatar() {
        let alice = seed_users().remove(3);
        let output = TerminalRenderer.user(&alice);
        assert!(output.contains("Alice Cooper"));
        assert!(output.contains("moderator"));
        assert!(!output.contains("avatar"));
    }

    #[test]
    fn not_found_is_explicit_without_retry_hint() {
        let output = TerminalRenderer.failure(&ApiError::NotFound { id: "999".into() });
        assert!(output.contains("no user with id"));
        assert!(output.contains("999"));
        assert!(!output.contains("retry"));
    }

    #[test]
    fn failures_carry_retry_hint_and_issues() {
        let network = TerminalRenderer.failure(&ApiError::Network("connection refused".into()));
        assert!(network.contains("connection refused"));
        assert!(network.contains("retry"));

        let err = SchemaError::malformed("user list", "body is not JSON");
        let validation = TerminalRenderer.failure(&ApiError::Validation(err));
        assert!(validation.contains("body is not JSON"));
        assert!(validation.contains("retry"));
    }
}
