//! End-user account service.
//!
//! Registration with a one-time verification code, password login issuing
//! opaque bearer sessions, password reset, and profile maintenance.
//! Delivering codes by email or SMS is left to an external collaborator;
//! codes are stored and logged at debug level only.

mod error;
pub mod requests;

pub use error::AuthError;
pub use requests::{
    AddContactRequest, ChangePasswordRequest, ContactRequest, LoginRequest, MarkReadRequest,
    PasswordResetConfirm, ProfileUpdateRequest, RegistrationRequest, ValidRegistration,
    VerifyRequest,
};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::{Rng, RngCore};
use tracing::instrument;

use bamboo_core::{NotificationId, RegistrationMethod, SessionId, UserId};

use crate::config::AccountPolicy;
use crate::db::{RepositoryError, StoredUser};
use crate::models::{
    Contact, NewUser, NewUserSession, Notification, ProfileChanges, User, UserSession,
    VerificationCode,
};
use crate::services::credentials::CredentialHasher;

/// Most notifications returned by one listing.
pub const NOTIFICATION_PAGE: i64 = 50;

/// Account persistence needed by [`UserAccounts`].
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Whether any account already uses this contact.
    async fn contact_taken(&self, contact: &Contact) -> Result<bool, RepositoryError>;

    /// Insert an unverified account carrying its first verification code.
    async fn insert(&self, user: &NewUser, code: &VerificationCode)
    -> Result<User, RepositoryError>;

    async fn find_by_contact(&self, contact: &Contact)
    -> Result<Option<StoredUser>, RepositoryError>;

    async fn get(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;

    async fn password_hash(&self, id: &UserId) -> Result<Option<String>, RepositoryError>;

    async fn record_login(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// Flag the channel as verified and consume the pending code.
    async fn mark_verified(
        &self,
        id: &UserId,
        method: RegistrationMethod,
    ) -> Result<User, RepositoryError>;

    /// Replace (or with `None`, clear) the pending verification code.
    async fn set_verification(
        &self,
        id: &UserId,
        code: Option<&VerificationCode>,
    ) -> Result<(), RepositoryError>;

    async fn set_password(&self, id: &UserId, hash: &str) -> Result<(), RepositoryError>;

    async fn update_profile(
        &self,
        id: &UserId,
        changes: &ProfileChanges,
    ) -> Result<User, RepositoryError>;

    /// Attach an unverified contact and the code sent to it.
    ///
    /// Returns `RepositoryError::Conflict` naming `email` or `phone` when
    /// another account holds it.
    async fn add_contact(
        &self,
        id: &UserId,
        contact: &Contact,
        code: &VerificationCode,
    ) -> Result<User, RepositoryError>;
}

/// Bearer session persistence needed by [`UserAccounts`].
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &NewUserSession) -> Result<UserSession, RepositoryError>;

    /// Look up a session by token regardless of its state.
    async fn find_by_token(&self, token: &str) -> Result<Option<UserSession>, RepositoryError>;

    /// Deactivate one session. Unknown tokens are ignored.
    async fn deactivate(&self, token: &str) -> Result<(), RepositoryError>;

    /// Deactivate every session of a user.
    async fn deactivate_all(&self, user_id: &UserId) -> Result<u64, RepositoryError>;
}

/// Read side of the in-app notification feed.
#[async_trait]
pub trait NotificationInbox: Send + Sync {
    /// Newest first, at most `limit`.
    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
    ) -> Result<Vec<Notification>, RepositoryError>;

    /// Ids owned by other users are skipped.
    async fn mark_read(
        &self,
        user_id: &UserId,
        ids: &[NotificationId],
    ) -> Result<u64, RepositoryError>;
}

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_verification_code() -> String {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

/// Generate an opaque bearer token (32 random bytes, base64url).
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Whether a code is pending for `contact`, was sent there and is still valid.
fn code_matches(stored: &StoredUser, contact: &Contact, code: &str, now: DateTime<Utc>) -> bool {
    stored
        .verification
        .as_ref()
        .is_some_and(|pending| pending.accepts(contact, code, now))
}

/// Result of a successful registration.
#[derive(Debug)]
pub struct Registered {
    pub user: User,
    /// Channel the verification code was issued on.
    pub channel: Contact,
}

/// Result of a successful login.
#[derive(Debug)]
pub struct LoggedIn {
    pub user: User,
    pub session: UserSession,
}

impl LoggedIn {
    /// Seconds until the session expires.
    #[must_use]
    pub fn expires_in(&self, now: DateTime<Utc>) -> i64 {
        (self.session.expires_at - now).num_seconds().max(0)
    }
}

/// Client metadata recorded on a new session.
#[derive(Debug, Default, Clone)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// End-user account service.
pub struct UserAccounts<'a, U: ?Sized, S: ?Sized, N: ?Sized> {
    users: &'a U,
    sessions: &'a S,
    inbox: &'a N,
    hasher: &'a dyn CredentialHasher,
    policy: AccountPolicy,
}

impl<'a, U, S, N> UserAccounts<'a, U, S, N>
where
    U: UserStore + ?Sized,
    S: SessionStore + ?Sized,
    N: NotificationInbox + ?Sized,
{
    /// Create a new account service.
    #[must_use]
    pub const fn new(
        users: &'a U,
        sessions: &'a S,
        inbox: &'a N,
        hasher: &'a dyn CredentialHasher,
        policy: AccountPolicy,
    ) -> Self {
        Self {
            users,
            sessions,
            inbox,
            hasher,
            policy,
        }
    }

    fn fresh_code(&self, channel: RegistrationMethod, now: DateTime<Utc>) -> VerificationCode {
        VerificationCode {
            code: generate_verification_code(),
            channel,
            expires_at: now + self.policy.code_lifetime(),
        }
    }

    /// Register a new end user and issue a verification code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation`, `AuthError::EmailTaken` or
    /// `AuthError::PhoneTaken` before anything is written.
    #[instrument(skip(self, request), fields(method = %request.registration_method))]
    pub async fn register(&self, request: RegistrationRequest) -> Result<Registered, AuthError> {
        let valid = request.validate()?;
        let channel = valid
            .channel()
            .ok_or_else(|| AuthError::Validation("contact is required".to_string()))?;
        let ValidRegistration { mut user, password } = valid;

        if let Some(email) = &user.email
            && self.users.contact_taken(&Contact::Email(email.clone())).await?
        {
            return Err(AuthError::EmailTaken);
        }
        if let Some(phone) = &user.phone
            && self.users.contact_taken(&Contact::Phone(phone.clone())).await?
        {
            return Err(AuthError::PhoneTaken);
        }

        user.password_hash = password
            .as_deref()
            .map(|p| self.hasher.hash(p))
            .transpose()?;

        let code = self.fresh_code(channel.method(), Utc::now());
        let user = self.users.insert(&user, &code).await?;

        tracing::info!(user_id = %user.id, "User registered");
        tracing::debug!(channel = %channel.method(), "Verification code issued");
        Ok(Registered { user, channel })
    }

    /// Check credentials and open a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` when no channel is given and
    /// `AuthError::InvalidCredentials` for unknown, disabled, password-less
    /// or wrongly authenticated accounts.
    #[instrument(skip(self, request, client))]
    pub async fn login(
        &self,
        request: LoginRequest,
        client: ClientInfo,
    ) -> Result<LoggedIn, AuthError> {
        let contact = request.contact()?;
        let stored = self
            .users
            .find_by_contact(&contact)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let verified = stored
            .password_hash
            .as_deref()
            .is_some_and(|hash| self.hasher.verify(&request.password, hash));
        if !verified || !stored.user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let session = self
            .sessions
            .insert(&NewUserSession {
                id: SessionId::generate(),
                user_id: stored.user.id.clone(),
                token: generate_token(),
                refresh_token: Some(generate_token()),
                device_info: request.device_info,
                ip_address: client.ip_address,
                user_agent: client.user_agent,
                expires_at: now + self.policy.session_lifetime(request.remember_me),
            })
            .await?;
        self.users.record_login(&stored.user.id, now).await?;

        tracing::info!(user_id = %stored.user.id, "User logged in");
        Ok(LoggedIn {
            user: User {
                last_login: Some(now),
                ..stored.user
            },
            session,
        })
    }

    /// Resolve a bearer token to its user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSession` unless the session is active,
    /// unexpired and owned by an active user.
    pub async fn authenticate(&self, token: &str) -> Result<(User, UserSession), AuthError> {
        let session = self
            .sessions
            .find_by_token(token)
            .await?
            .filter(|session| session.is_valid_at(Utc::now()))
            .ok_or(AuthError::InvalidSession)?;
        let user = self
            .users
            .get(&session.user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AuthError::InvalidSession)?;
        Ok((user, session))
    }

    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the update fails.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.deactivate(token).await?;
        Ok(())
    }

    /// Confirm a contact channel with the code that was sent to it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCode` for an unknown account, a wrong or
    /// expired code, or a code issued on the other channel.
    #[instrument(skip(self, request))]
    pub async fn verify(&self, request: &VerifyRequest) -> Result<User, AuthError> {
        let (contact, code) = request.validate()?;
        let stored = self
            .users
            .find_by_contact(&contact)
            .await?
            .ok_or(AuthError::InvalidCode)?;
        if !code_matches(&stored, &contact, code, Utc::now()) {
            return Err(AuthError::InvalidCode);
        }

        let user = self.users.mark_verified(&stored.user.id, contact.method()).await?;
        tracing::info!(user_id = %user.id, method = %contact.method(), "Contact verified");
        Ok(user)
    }

    /// Issue a fresh verification code on `contact`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if no account uses this contact.
    pub async fn resend_verification(&self, request: &ContactRequest) -> Result<Contact, AuthError> {
        let contact = request.contact()?;
        let stored = self
            .users
            .find_by_contact(&contact)
            .await?
            .ok_or(AuthError::NotFound)?;
        let code = self.fresh_code(contact.method(), Utc::now());
        self.users.set_verification(&stored.user.id, Some(&code)).await?;
        tracing::debug!(user_id = %stored.user.id, "Verification code reissued");
        Ok(contact)
    }

    /// Issue a reset code. Succeeds silently for unknown contacts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for a missing contact.
    pub async fn request_password_reset(&self, request: &ContactRequest) -> Result<(), AuthError> {
        let contact = request.contact()?;
        match self.users.find_by_contact(&contact).await? {
            Some(stored) => {
                let code = self.fresh_code(contact.method(), Utc::now());
                self.users.set_verification(&stored.user.id, Some(&code)).await?;
                tracing::info!(user_id = %stored.user.id, "Password reset requested");
            }
            None => tracing::debug!("Password reset requested for unknown contact"),
        }
        Ok(())
    }

    /// Set a new password with a reset code and end every open session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCode` for an unknown account or a bad code.
    #[instrument(skip(self, request))]
    pub async fn confirm_password_reset(
        &self,
        request: &PasswordResetConfirm,
    ) -> Result<(), AuthError> {
        let (contact, code) = request.validate()?;
        let stored = self
            .users
            .find_by_contact(&contact)
            .await?
            .ok_or(AuthError::InvalidCode)?;
        if !code_matches(&stored, &contact, code, Utc::now()) {
            return Err(AuthError::InvalidCode);
        }

        let hash = self.hasher.hash(&request.new_password)?;
        self.users.set_password(&stored.user.id, &hash).await?;
        self.users.set_verification(&stored.user.id, None).await?;
        let ended = self.sessions.deactivate_all(&stored.user.id).await?;
        tracing::info!(user_id = %stored.user.id, sessions_ended = ended, "Password reset");
        Ok(())
    }

    /// Add an email or phone to an existing account.
    ///
    /// The new channel starts unverified and receives a verification code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for a wrong password,
    /// `AuthError::Validation` if the account already has that kind of
    /// contact, and `AuthError::EmailTaken` or `AuthError::PhoneTaken` when
    /// another account uses it.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn add_contact(
        &self,
        user_id: &UserId,
        request: &AddContactRequest,
    ) -> Result<(User, Contact), AuthError> {
        let contact = request.contact()?;
        let hash = self
            .users
            .password_hash(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !self.hasher.verify(&request.password, &hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self.users.get(user_id).await?.ok_or(AuthError::NotFound)?;
        let existing = match contact {
            Contact::Email(_) => user.email.is_some().then_some("an email address"),
            Contact::Phone(_) => user.phone.is_some().then_some("a phone number"),
        };
        if let Some(existing) = existing {
            return Err(AuthError::Validation(format!("account already has {existing}")));
        }
        if self.users.contact_taken(&contact).await? {
            return Err(match contact {
                Contact::Email(_) => AuthError::EmailTaken,
                Contact::Phone(_) => AuthError::PhoneTaken,
            });
        }

        let code = self.fresh_code(contact.method(), Utc::now());
        let user = self.users.add_contact(user_id, &contact, &code).await?;
        tracing::info!(method = %contact.method(), "Contact added");
        Ok((user, contact))
    }

    /// # Errors
    ///
    /// Returns `AuthError::Validation` or `AuthError::NotFound`.
    pub async fn update_profile(
        &self,
        user_id: &UserId,
        request: ProfileUpdateRequest,
    ) -> Result<User, AuthError> {
        let changes = request.validate()?;
        Ok(self.users.update_profile(user_id, &changes).await?)
    }

    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the current password is wrong.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn change_password(
        &self,
        user_id: &UserId,
        request: &ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        request.validate()?;
        let hash = self
            .users
            .password_hash(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if !self.hasher.verify(&request.current_password, &hash) {
            return Err(AuthError::InvalidCredentials);
        }
        let new_hash = self.hasher.hash(&request.new_password)?;
        self.users.set_password(user_id, &new_hash).await?;
        tracing::info!("User password changed");
        Ok(())
    }

    /// Most recent notifications first.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the query fails.
    pub async fn notifications(&self, user_id: &UserId) -> Result<Vec<Notification>, AuthError> {
        Ok(self.inbox.list_for_user(user_id, NOTIFICATION_PAGE).await?)
    }

    /// Mark notifications read; ids owned by other users are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the update fails.
    pub async fn mark_notifications_read(
        &self,
        user_id: &UserId,
        ids: &[NotificationId],
    ) -> Result<u64, AuthError> {
        Ok(self.inbox.mark_read(user_id, ids).await?)
    }
}

#[cfg(test)]
mod tests;
