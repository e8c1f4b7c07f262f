use chrono::Utc;
use herdbook_core::User;
use rusqlite::{params, OptionalExtension};

use crate::{map_unique, parse_ts, Result, Store};

const USER_COLS: &str = "id, email, display_name, irz_login, created_at, updated_at";

impl Store {
    /// Fails with [`crate::StoreError::Duplicate`] when the email is taken.
    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, email, display_name, irz_login, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id,
                    user.email,
                    user.display_name,
                    user.irz_login,
                    user.created_at.to_rfc3339(),
                    user.updated_at.to_rfc3339(),
                ],
            )
            .map_err(map_unique)?;
        Ok(())
    }

    pub fn user_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
                params![id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE email = ?1"),
                params![email],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Stores the registry login and the sealed password on the user.
    pub fn set_irz_credentials(&self, user_id: &str, login: &str, sealed: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE users SET irz_login = ?2, irz_password_sealed = ?3, updated_at = ?4 \
             WHERE id = ?1",
            params![user_id, login, sealed, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// `(login, sealed_password)` when both are set, `None` otherwise.
    pub fn irz_credentials(&self, user_id: &str) -> Result<Option<(String, String)>> {
        let pair = self
            .conn()
            .query_row(
                "SELECT irz_login, irz_password_sealed FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                    ))
                },
            )
            .optional()?;
        Ok(pair.and_then(|(login, sealed)| login.zip(sealed)))
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        irz_login: row.get(3)?,
        created_at: parse_ts(4, row.get(4)?)?,
        updated_at: parse_ts(5, row.get(5)?)?,
    })
}
