//! Admin credential rows.

use rusqlite::{params, OptionalExtension, Row};

use crate::store::Store;

/// One admin account.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

impl AdminUser {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
        })
    }
}

impl Store {
    pub fn admin_by_username(&self, username: &str) -> Result<Option<AdminUser>, rusqlite::Error> {
        self.lock()
            .query_row(
                "SELECT id, username, password_hash FROM admin_users WHERE username = ?1",
                params![username],
                AdminUser::from_row,
            )
            .optional()
    }

    /// Create the admin account or refresh its hash. Run at startup so a
    /// changed `ADMIN_PASSWORD` takes effect on restart.
    pub fn upsert_admin(
        &self,
        username: &str,
        password_hash: &str,
        now: i64,
    ) -> Result<(), rusqlite::Error> {
        self.lock().execute(
            "INSERT INTO admin_users (username, password_hash, created_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(username) DO UPDATE SET password_hash = excluded.password_hash",
            params![username, password_hash, now],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_refreshes_the_hash() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_admin("admin", "hash-one", 100).unwrap();
        let first = store.admin_by_username("admin").unwrap().unwrap();

        store.upsert_admin("admin", "hash-two", 200).unwrap();
        let second = store.admin_by_username("admin").unwrap().unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.password_hash, "hash-two");
        assert!(store.admin_by_username("nobody").unwrap().is_none());
    }
}
