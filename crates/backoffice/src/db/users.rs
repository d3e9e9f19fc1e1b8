//! End-user account repository.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use bamboo_core::{Email, Gender, Metadata, PhoneNumber, RegistrationMethod, UserId};

use super::{RepositoryError, corrupt, map_unique_violation};
use crate::models::{Contact, NewUser, ProfileChanges, User, VerificationCode};
use crate::services::user_auth::UserStore;

const USER_COLUMNS: &str = r"
    id, email, phone, first_name, last_name, date_of_birth, gender, profession,
    monthly_income, city, address, password_hash, registration_method,
    email_verified, phone_verified, verification_code, verification_channel,
    verification_expires_at,
    is_active, preferences, last_login, created_at
";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: Option<String>,
    phone: Option<String>,
    first_name: String,
    last_name: String,
    date_of_birth: Option<NaiveDate>,
    gender: Option<Gender>,
    profession: Option<String>,
    monthly_income: Option<Decimal>,
    city: Option<String>,
    address: Option<String>,
    password_hash: Option<String>,
    registration_method: RegistrationMethod,
    email_verified: bool,
    phone_verified: bool,
    verification_code: Option<String>,
    verification_channel: Option<RegistrationMethod>,
    verification_expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    preferences: Json<Metadata>,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// A user together with the secrets the public type never exposes.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user: User,
    pub password_hash: Option<String>,
    pub verification: Option<VerificationCode>,
}

impl TryFrom<UserRow> for StoredUser {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        // Empty strings were historically stored for absent contacts.
        let email = row
            .email
            .filter(|e| !e.is_empty())
            .map(|e| Email::parse(&e))
            .transpose()
            .map_err(|e| corrupt("user email", e))?;
        let phone = row
            .phone
            .filter(|p| !p.is_empty())
            .map(|p| PhoneNumber::parse(&p))
            .transpose()
            .map_err(|e| corrupt("user phone", e))?;

        let verification = match (
            row.verification_code,
            row.verification_channel,
            row.verification_expires_at,
        ) {
            (Some(code), Some(channel), Some(expires_at)) => Some(VerificationCode {
                code,
                channel,
                expires_at,
            }),
            _ => None,
        };

        Ok(Self {
            user: User {
                id: UserId::new(row.id),
                email,
                phone,
                first_name: row.first_name,
                last_name: row.last_name,
                date_of_birth: row.date_of_birth,
                gender: row.gender,
                profession: row.profession,
                monthly_income: row.monthly_income,
                city: row.city,
                address: row.address,
                registration_method: row.registration_method,
                email_verified: row.email_verified,
                phone_verified: row.phone_verified,
                is_active: row.is_active,
                last_login: row.last_login,
                created_at: row.created_at,
                preferences: row.preferences.0,
            },
            password_hash: row.password_hash,
            verification,
        })
    }
}

/// Repository for end-user accounts.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, column: &str, value: &str) -> Result<Option<StoredUser>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM backoffice.app_user WHERE {column} = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }
}

#[async_trait]
impl UserStore for UserRepository<'_> {
    async fn contact_taken(&self, contact: &Contact) -> Result<bool, RepositoryError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM backoffice.app_user WHERE {} = $1)",
            contact_column(contact)
        );
        let taken = sqlx::query_scalar::<_, bool>(&sql)
            .bind(contact.as_str())
            .fetch_one(self.pool)
            .await?;
        Ok(taken)
    }

    async fn insert(
        &self,
        user: &NewUser,
        code: &VerificationCode,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO backoffice.app_user (
                id, email, phone, first_name, last_name, date_of_birth, gender,
                profession, monthly_income, city, address, password_hash,
                registration_method, verification_code, verification_channel,
                verification_expires_at, preferences
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id.as_str())
            .bind(user.email.as_ref().map(Email::as_str))
            .bind(user.phone.as_ref().map(PhoneNumber::as_str))
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.date_of_birth)
            .bind(user.gender)
            .bind(user.profession.as_deref())
            .bind(user.monthly_income)
            .bind(user.city.as_deref())
            .bind(user.address.as_deref())
            .bind(user.password_hash.as_deref())
            .bind(user.registration_method)
            .bind(&code.code)
            .bind(code.channel)
            .bind(code.expires_at)
            .bind(Json(&user.preferences))
            .fetch_one(self.pool)
            .await
            .map_err(map_unique_violation)?;
        Ok(StoredUser::try_from(row)?.user)
    }

    async fn find_by_contact(
        &self,
        contact: &Contact,
    ) -> Result<Option<StoredUser>, RepositoryError> {
        self.fetch(contact_column(contact), contact.as_str()).await
    }

    async fn get(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.fetch("id", id.as_str()).await?.map(|stored| stored.user))
    }

    async fn password_hash(&self, id: &UserId) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar::<_, Option<String>>(
            "SELECT password_hash FROM backoffice.app_user WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(self.pool)
        .await?;
        Ok(hash.flatten())
    }

    async fn record_login(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE backoffice.app_user SET last_login = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(at)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    async fn mark_verified(
        &self,
        id: &UserId,
        method: RegistrationMethod,
    ) -> Result<User, RepositoryError> {
        let flag = verified_column(method);
        let sql = format!(
            r"
            UPDATE backoffice.app_user
            SET {flag} = TRUE,
                verification_code = NULL,
                verification_channel = NULL,
                verification_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(StoredUser::try_from(row)?.user)
    }

    async fn set_verification(
        &self,
        id: &UserId,
        code: Option<&VerificationCode>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE backoffice.app_user
            SET verification_code = $2,
                verification_channel = $3,
                verification_expires_at = $4,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id.as_str())
        .bind(code.map(|c| c.code.as_str()))
        .bind(code.map(|c| c.channel))
        .bind(code.map(|c| c.expires_at))
        .execute(self.pool)
        .await?;
        Ok(())
    }

    async fn set_password(&self, id: &UserId, hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE backoffice.app_user SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_str())
        .bind(hash)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        id: &UserId,
        changes: &ProfileChanges,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            r"
            UPDATE backoffice.app_user
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                date_of_birth = COALESCE($4, date_of_birth),
                gender = COALESCE($5, gender),
                profession = COALESCE($6, profession),
                monthly_income = COALESCE($7, monthly_income),
                city = COALESCE($8, city),
                address = COALESCE($9, address),
                preferences = COALESCE($10, preferences),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.as_str())
            .bind(changes.first_name.as_deref())
            .bind(changes.last_name.as_deref())
            .bind(changes.date_of_birth)
            .bind(changes.gender)
            .bind(changes.profession.as_deref())
            .bind(changes.monthly_income)
            .bind(changes.city.as_deref())
            .bind(changes.address.as_deref())
            .bind(changes.preferences.as_ref().map(Json))
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(StoredUser::try_from(row)?.user)
    }

    async fn add_contact(
        &self,
        id: &UserId,
        contact: &Contact,
        code: &VerificationCode,
    ) -> Result<User, RepositoryError> {
        let column = contact_column(contact);
        let flag = verified_column(contact.method());
        let sql = format!(
            r"
            UPDATE backoffice.app_user
            SET {column} = $2,
                {flag} = FALSE,
                verification_code = $3,
                verification_channel = $4,
                verification_expires_at = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.as_str())
            .bind(contact.as_str())
            .bind(&code.code)
            .bind(code.channel)
            .bind(code.expires_at)
            .fetch_optional(self.pool)
            .await
            .map_err(map_unique_violation)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(StoredUser::try_from(row)?.user)
    }
}

const fn contact_column(contact: &Contact) -> &'static str {
    match contact {
        Contact::Email(_) => "email",
        Contact::Phone(_) => "phone",
    }
}

const fn verified_column(method: RegistrationMethod) -> &'static str {
    match method {
        RegistrationMethod::Email => "email_verified",
        RegistrationMethod::Phone => "phone_verified",
    }
}
