//! Activity log migrations - embedded SQL files
//!
//! Same conventions as the account store migrations; the activity log lives
//! in its own database file so it can be rotated or exported independently.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_activity.sql", include_str!("001_activity.sql")),
];
