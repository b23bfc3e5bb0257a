//! Seed data for the mock backend.

use chrono::{DateTime, TimeZone, Utc};

use crate::models::{Role, Status, User};

const AVATAR_BASE: &str = "https://raw.githubusercontent.com/mantinedev/mantine/master/.demo/avatars";

fn seeded_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

fn user(id: u32, name: &str, email: &str, role: Role, status: Status, avatar: bool) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        role,
        status,
        avatar: avatar.then(|| format!("{AVATAR_BASE}/avatar-{id}.png")),
        created_at: seeded_at(),
        updated_at: seeded_at(),
    }
}

/// The five users every mock backend starts with.
pub fn seed_users() -> Vec<User> {
    vec![
        user(1, "John Doe", "john@example.com", Role::Admin, Status::Active, true),
        user(2, "Jane Smith", "jane@example.com", Role::User, Status::Active, true),
        user(3, "Bob Johnson", "bob@example.com", Role::User, Status::Inactive, true),
        user(4, "Alice Cooper", "alice@example.com", Role::Moderator, Status::Active, false),
        user(5, "David Wilson", "david@example.com", Role::User, Status::Suspended, true),
    ]
}
