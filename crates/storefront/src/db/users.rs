//! User repository for database operations.
//!
//! Accounts live in `shop.user`; the argon2 hash is kept apart in
//! `shop.user_password` and contact details in `shop.user_profile`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bazaar_core::{Email, UserId, UserRole};

use super::RepositoryError;
use crate::models::user::{User, UserProfile};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    first_name: String,
    last_name: String,
    role: UserRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    photo: Option<String>,
    phone: String,
    address: String,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            photo: row.photo,
            phone: row.phone,
            address: row.address,
        }
    }
}

/// Fields collected at registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub phone: String,
    pub address: String,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, first_name, last_name, role, created_at, updated_at
            FROM shop.user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    /// Get a user by their (normalized) email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, first_name, last_name, role, created_at, updated_at
            FROM shop.user
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    /// Create a user, their password hash and an empty-or-filled profile in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(
        &self,
        new_user: &NewUser,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO shop.user (email, first_name, last_name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, first_name, last_name, role, created_at, updated_at
            ",
        )
        .bind(&new_user.email)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.role)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_write(e, "email"))?;

        sqlx::query("INSERT INTO shop.user_password (user_id, password_hash) VALUES ($1, $2)")
            .bind(row.id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO shop.user_profile (user_id, phone, address) VALUES ($1, $2, $3)")
            .bind(row.id)
            .bind(&new_user.phone)
            .bind(&new_user.address)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Get a user together with their password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(
            r"
            SELECT u.id, u.email, u.first_name, u.last_name, u.role,
                   u.created_at, u.updated_at, p.password_hash
            FROM shop.user u
            JOIN shop.user_password p ON p.user_id = u.id
            WHERE u.email = $1
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((r.user.try_into()?, r.password_hash))),
            None => Ok(None),
        }
    }

    /// Replace a user's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop.user_password (user_id, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET password_hash = EXCLUDED.password_hash, updated_at = NOW()
            ",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Update the account fields (name and email).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Conflict` if the email belongs to another user.
    pub async fn update_account(
        &self,
        id: UserId,
        first_name: &str,
        last_name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            UPDATE shop.user
            SET first_name = $2, last_name = $3, email = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, first_name, last_name, role, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .bind(email)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "email"))?
        .ok_or(RepositoryError::NotFound)?
        .try_into()
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_role(&self, id: UserId, role: UserRole) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE shop.user SET role = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(role)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Get a user's profile, defaulting to empty fields if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_profile(&self, id: UserId) -> Result<UserProfile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT photo, phone, address FROM shop.user_profile WHERE user_id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(UserProfile::from).unwrap_or_default())
    }

    /// Update the contact fields of a profile, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_contact(
        &self,
        id: UserId,
        phone: &str,
        address: &str,
    ) -> Result<UserProfile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            INSERT INTO shop.user_profile (user_id, phone, address)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id)
            DO UPDATE SET phone = EXCLUDED.phone, address = EXCLUDED.address, updated_at = NOW()
            RETURNING photo, phone, address
            ",
        )
        .bind(id)
        .bind(phone)
        .bind(address)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// Point the profile at a new photo. Returns the previous photo path.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_photo(&self, id: UserId, photo: &str) -> Result<Option<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<(Option<String>,)> =
            sqlx::query_as("SELECT photo FROM shop.user_profile WHERE user_id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        sqlx::query(
            r"
            INSERT INTO shop.user_profile (user_id, photo)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET photo = EXCLUDED.photo, updated_at = NOW()
            ",
        )
        .bind(id)
        .bind(photo)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(previous.and_then(|(p,)| p))
    }

    /// List users newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, limit: u32, offset: u32) -> Result<Vec<User>, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, first_name, last_name, role, created_at, updated_at
            FROM shop.user
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(super::limit(limit))
        .bind(i64::from(offset))
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    /// Delete a user. Their orders, cart, reviews and wishlist cascade.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.user WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
