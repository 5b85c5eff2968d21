//! Accounts the mock backend starts with.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

use crate::user::{User, UserRole, UserStatus};

/// Password shared by every seeded account.
pub const SEED_PASSWORD: &str = "12345678";

static SEED_USERS: Lazy<Vec<User>> = Lazy::new(|| {
    vec![
        seeded("super_001", "superadmin@chapa.co", "Abebe", "Kebede", UserRole::SuperAdmin, UserStatus::Active, "2024-01-01T00:00:00Z"),
        seeded("admin_001", "admin1@chapa.co", "Almaz", "Tesfaye", UserRole::Admin, UserStatus::Active, "2024-01-05T10:30:00Z"),
        seeded("admin_002", "admin2@chapa.co", "Dawit", "Haile", UserRole::Admin, UserStatus::Active, "2024-01-10T14:20:00Z"),
        seeded("user_001", "merchant1@gmail.com", "Hanan", "Mohammed", UserRole::User, UserStatus::Active, "2024-01-15T09:15:00Z"),
        seeded("user_002", "merchant2@gmail.com", "Kalkidan", "Assefa", UserRole::User, UserStatus::Active, "2024-01-18T16:45:00Z"),
        seeded("user_003", "merchant3@gmail.com", "Bereket", "Girma", UserRole::User, UserStatus::Inactive, "2024-01-20T11:30:00Z"),
        seeded("user_004", "merchant4@gmail.com", "Tigist", "Wondimu", UserRole::User, UserStatus::Active, "2024-01-22T13:10:00Z"),
        seeded("user_005", "merchant5@gmail.com", "Yohannes", "Tadesse", UserRole::User, UserStatus::Active, "2024-01-25T08:20:00Z"),
    ]
});

fn seeded(
    id: &str,
    email: &str,
    first_name: &str,
    last_name: &str,
    role: UserRole,
    status: UserStatus,
    created_at: &str,
) -> User {
    User {
        id: id.into(),
        email: email.into(),
        first_name: first_name.into(),
        last_name: last_name.into(),
        phone: None,
        city: None,
        role,
        status,
        created_at: parse_ts(created_at),
        password: SEED_PASSWORD.into(),
    }
}

fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

/// All seeded accounts, in seeding order.
pub fn users() -> Vec<User> {
    SEED_USERS.clone()
}

pub fn find(email: &str) -> Option<User> {
    SEED_USERS.iter().find(|u| u.email == email).cloned()
}
