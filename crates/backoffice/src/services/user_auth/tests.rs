#![allow(clippy::unwrap_used)]

use std::sync::Mutex;

use bamboo_core::{Email, NotificationPriority, PhoneNumber};
use chrono::Duration;
use serde_json::json;

use super::*;
use crate::services::credentials::CredentialError;

/// Reversible hasher so tests don't pay for argon2.
struct PlainHasher;

impl CredentialHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String, CredentialError> {
        Ok(format!("plain:{password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        hash.strip_prefix("plain:") == Some(password)
    }
}

fn holds(user: &User, contact: &Contact) -> bool {
    match contact {
        Contact::Email(email) => user.email.as_ref() == Some(email),
        Contact::Phone(phone) => user.phone.as_ref() == Some(phone),
    }
}

#[derive(Default)]
struct MemoryUsers {
    users: Mutex<Vec<StoredUser>>,
}

impl MemoryUsers {
    fn update<R>(
        &self,
        id: &UserId,
        f: impl FnOnce(&mut StoredUser) -> R,
    ) -> Result<R, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        users
            .iter_mut()
            .find(|s| &s.user.id == id)
            .map(f)
            .ok_or(RepositoryError::NotFound)
    }

    fn stored(&self, id: &UserId) -> StoredUser {
        self.update(id, |s| s.clone()).unwrap()
    }

    fn pending_code(&self, id: &UserId) -> VerificationCode {
        self.stored(id).verification.unwrap()
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn contact_taken(&self, contact: &Contact) -> Result<bool, RepositoryError> {
        Ok(self.users.lock().unwrap().iter().any(|s| holds(&s.user, contact)))
    }

    async fn insert(
        &self,
        user: &NewUser,
        code: &VerificationCode,
    ) -> Result<User, RepositoryError> {
        let stored = StoredUser {
            user: User {
                id: user.id.clone(),
                email: user.email.clone(),
                phone: user.phone.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                date_of_birth: user.date_of_birth,
                gender: user.gender,
                profession: user.profession.clone(),
                monthly_income: user.monthly_income,
                city: user.city.clone(),
                address: user.address.clone(),
                registration_method: user.registration_method,
                email_verified: false,
                phone_verified: false,
                is_active: true,
                last_login: None,
                created_at: Utc::now(),
                preferences: user.preferences.clone(),
            },
            password_hash: user.password_hash.clone(),
            verification: Some(code.clone()),
        };
        let created = stored.user.clone();
        self.users.lock().unwrap().push(stored);
        Ok(created)
    }

    async fn find_by_contact(
        &self,
        contact: &Contact,
    ) -> Result<Option<StoredUser>, RepositoryError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|s| holds(&s.user, contact))
            .cloned())
    }

    async fn get(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.update(id, |s| s.user.clone()).ok())
    }

    async fn password_hash(&self, id: &UserId) -> Result<Option<String>, RepositoryError> {
        Ok(self.update(id, |s| s.password_hash.clone()).ok().flatten())
    }

    async fn record_login(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        self.update(id, |s| s.user.last_login = Some(at))
    }

    async fn mark_verified(
        &self,
        id: &UserId,
        method: RegistrationMethod,
    ) -> Result<User, RepositoryError> {
        self.update(id, |s| {
            match method {
                RegistrationMethod::Email => s.user.email_verified = true,
                RegistrationMethod::Phone => s.user.phone_verified = true,
            }
            s.verification = None;
            s.user.clone()
        })
    }

    async fn set_verification(
        &self,
        id: &UserId,
        code: Option<&VerificationCode>,
    ) -> Result<(), RepositoryError> {
        self.update(id, |s| s.verification = code.cloned())
    }

    async fn set_password(&self, id: &UserId, hash: &str) -> Result<(), RepositoryError> {
        self.update(id, |s| s.password_hash = Some(hash.to_string()))
    }

    async fn update_profile(
        &self,
        id: &UserId,
        changes: &ProfileChanges,
    ) -> Result<User, RepositoryError> {
        self.update(id, |s| {
            if let Some(first_name) = &changes.first_name {
                s.user.first_name.clone_from(first_name);
            }
            if let Some(city) = &changes.city {
                s.user.city = Some(city.clone());
            }
            s.user.clone()
        })
    }

    async fn add_contact(
        &self,
        id: &UserId,
        contact: &Contact,
        code: &VerificationCode,
    ) -> Result<User, RepositoryError> {
        self.update(id, |s| {
            match contact {
                Contact::Email(email) => {
                    s.user.email = Some(email.clone());
                    s.user.email_verified = false;
                }
                Contact::Phone(phone) => {
                    s.user.phone = Some(phone.clone());
                    s.user.phone_verified = false;
                }
            }
            s.verification = Some(code.clone());
            s.user.clone()
        })
    }
}

#[derive(Default)]
struct MemorySessions {
    sessions: Mutex<Vec<UserSession>>,
}

impl MemorySessions {
    fn expire(&self, token: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.iter_mut().find(|s| s.token == token).unwrap();
        session.expires_at = Utc::now() - Duration::seconds(1);
    }
}

#[async_trait]
impl SessionStore for MemorySessions {
    async fn insert(&self, session: &NewUserSession) -> Result<UserSession, RepositoryError> {
        let stored = UserSession {
            id: session.id.clone(),
            user_id: session.user_id.clone(),
            token: session.token.clone(),
            refresh_token: session.refresh_token.clone(),
            device_info: session.device_info.clone(),
            ip_address: session.ip_address.clone(),
            user_agent: session.user_agent.clone(),
            expires_at: session.expires_at,
            is_active: true,
            created_at: Utc::now(),
        };
        self.sessions.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<UserSession>, RepositoryError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.token == token)
            .cloned())
    }

    async fn deactivate(&self, token: &str) -> Result<(), RepositoryError> {
        for session in self.sessions.lock().unwrap().iter_mut() {
            if session.token == token {
                session.is_active = false;
            }
        }
        Ok(())
    }

    async fn deactivate_all(&self, user_id: &UserId) -> Result<u64, RepositoryError> {
        let mut ended = 0;
        for session in self.sessions.lock().unwrap().iter_mut() {
            if &session.user_id == user_id && session.is_active {
                session.is_active = false;
                ended += 1;
            }
        }
        Ok(ended)
    }
}

#[derive(Default)]
struct MemoryInbox {
    notifications: Mutex<Vec<(UserId, Notification)>>,
}

impl MemoryInbox {
    fn push(&self, user_id: &UserId, title: &str) -> NotificationId {
        let id = NotificationId::generate();
        self.notifications.lock().unwrap().push((
            user_id.clone(),
            Notification {
                id: id.clone(),
                kind: "application_status".to_string(),
                title: title.to_string(),
                message: String::new(),
                related_entity_type: None,
                related_entity_id: None,
                is_read: false,
                priority: NotificationPriority::Normal,
                created_at: Utc::now(),
            },
        ));
        id
    }
}

#[async_trait]
impl NotificationInbox for MemoryInbox {
    async fn list_for_user(
        &self,
        user_id: &UserId,
        limit: i64,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = self.notifications.lock().unwrap();
        Ok(notifications
            .iter()
            .rev()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, n)| n.clone())
            .take(usize::try_from(limit).unwrap())
            .collect())
    }

    async fn mark_read(
        &self,
        user_id: &UserId,
        ids: &[NotificationId],
    ) -> Result<u64, RepositoryError> {
        let mut updated = 0;
        for (owner, n) in self.notifications.lock().unwrap().iter_mut() {
            if owner == user_id && ids.contains(&n.id) && !n.is_read {
                n.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[derive(Default)]
struct Fixture {
    users: MemoryUsers,
    sessions: MemorySessions,
    inbox: MemoryInbox,
}

impl Fixture {
    fn accounts(&self) -> UserAccounts<'_, MemoryUsers, MemorySessions, MemoryInbox> {
        UserAccounts::new(
            &self.users,
            &self.sessions,
            &self.inbox,
            &PlainHasher,
            AccountPolicy::default(),
        )
    }

    /// Register by email with a phone on file too.
    async fn register_awa(&self) -> User {
        self.accounts()
            .register(registration(json!({
                "registration_method": "email",
                "email": "awa@example.ga",
                "phone": "06 12 34 56",
                "first_name": "Awa",
                "last_name": "Ndong",
                "password": "correct-horse",
            })))
            .await
            .unwrap()
            .user
    }

    async fn login(&self, remember_me: bool) -> LoggedIn {
        self.accounts()
            .login(
                serde_json::from_value(json!({
                    "email": "awa@example.ga",
                    "password": "correct-horse",
                    "remember_me": remember_me,
                }))
                .unwrap(),
                ClientInfo::default(),
            )
            .await
            .unwrap()
    }
}

fn registration(value: serde_json::Value) -> RegistrationRequest {
    serde_json::from_value(value).unwrap()
}

fn with_contact(contact: serde_json::Value, fields: serde_json::Value) -> serde_json::Value {
    let mut merged = contact;
    if let (Some(target), Some(extra)) = (merged.as_object_mut(), fields.as_object()) {
        target.extend(extra.clone());
    }
    merged
}

fn verify_request(contact: serde_json::Value, code: &str) -> VerifyRequest {
    serde_json::from_value(with_contact(contact, json!({ "code": code }))).unwrap()
}

fn email_contact() -> serde_json::Value {
    json!({ "email": "awa@example.ga" })
}

fn phone_contact() -> serde_json::Value {
    json!({ "phone": "06 12 34 56" })
}

#[test]
fn test_generate_verification_code_format() {
    let code = generate_verification_code();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
}

#[test]
fn test_generate_verification_code_range() {
    for _ in 0..100 {
        let code: u32 = generate_verification_code().parse().unwrap();
        assert!((100_000..1_000_000).contains(&code));
    }
}

#[test]
fn test_tokens_are_url_safe_and_unique() {
    let a = generate_token();
    let b = generate_token();
    assert_ne!(a, b);
    assert_eq!(a.len(), 43);
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
}

#[tokio::test]
async fn test_register_issues_code_on_registration_channel() {
    let fx = Fixture::default();
    let user = fx.register_awa().await;

    assert!(!user.email_verified);
    assert!(!user.phone_verified);
    let code = fx.users.pending_code(&user.id);
    assert_eq!(code.channel, RegistrationMethod::Email);
    assert_eq!(fx.users.stored(&user.id).password_hash.as_deref(), Some("plain:correct-horse"));
}

#[tokio::test]
async fn test_register_rejects_taken_contacts() {
    let fx = Fixture::default();
    fx.register_awa().await;

    let err = fx
        .accounts()
        .register(registration(json!({
            "registration_method": "email",
            "email": "AWA@example.ga",
            "first_name": "Other",
            "last_name": "Person",
            "password": "another-pass",
        })))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::EmailTaken));

    let err = fx
        .accounts()
        .register(registration(json!({
            "registration_method": "phone",
            "phone": "+241 6 12 34 56",
            "first_name": "Other",
            "last_name": "Person",
        })))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::PhoneTaken));
    assert_eq!(fx.users.users.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_session_lifetime_follows_remember_me() {
    let fx = Fixture::default();
    fx.register_awa().await;
    let policy = AccountPolicy::default();

    let short = fx.login(false).await;
    let long = fx.login(true).await;
    let now = Utc::now();

    let day = policy.session_lifetime(false).num_seconds();
    let month = policy.session_lifetime(true).num_seconds();
    assert!((day - 60..=day).contains(&short.expires_in(now)));
    assert!((month - 60..=month).contains(&long.expires_in(now)));
    assert_ne!(short.session.token, long.session.token);
    assert!(short.user.last_login.is_some());
}

#[tokio::test]
async fn test_login_rejects_wrong_password_and_disabled_account() {
    let fx = Fixture::default();
    let user = fx.register_awa().await;

    let wrong = serde_json::from_value(json!({
        "email": "awa@example.ga",
        "password": "wrong-horse",
    }))
    .unwrap();
    let err = fx.accounts().login(wrong, ClientInfo::default()).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    fx.users.update(&user.id, |s| s.user.is_active = false).unwrap();
    let right = serde_json::from_value(json!({
        "email": "awa@example.ga",
        "password": "correct-horse",
    }))
    .unwrap();
    let err = fx.accounts().login(right, ClientInfo::default()).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(fx.sessions.sessions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_authenticate_requires_live_session_and_active_user() {
    let fx = Fixture::default();
    let user = fx.register_awa().await;

    let live = fx.login(false).await;
    let (found, _) = fx.accounts().authenticate(&live.session.token).await.unwrap();
    assert_eq!(found.id, user.id);

    let expired = fx.login(false).await;
    fx.sessions.expire(&expired.session.token);
    let err = fx.accounts().authenticate(&expired.session.token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidSession));

    let logged_out = fx.login(false).await;
    fx.accounts().logout(&logged_out.session.token).await.unwrap();
    let err = fx.accounts().authenticate(&logged_out.session.token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidSession));

    let err = fx.accounts().authenticate("unknown-token").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidSession));

    fx.users.update(&user.id, |s| s.user.is_active = false).unwrap();
    let err = fx.accounts().authenticate(&live.session.token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidSession));
}

#[tokio::test]
async fn test_code_only_verifies_the_channel_it_was_sent_to() {
    let fx = Fixture::default();
    let user = fx.register_awa().await;
    let code = fx.users.pending_code(&user.id).code;

    let err = fx
        .accounts()
        .verify(&verify_request(phone_contact(), &code))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCode));
    assert!(!fx.users.stored(&user.id).user.phone_verified);

    let verified = fx
        .accounts()
        .verify(&verify_request(email_contact(), &code))
        .await
        .unwrap();
    assert!(verified.email_verified);
    assert!(!verified.phone_verified);
    assert!(fx.users.stored(&user.id).verification.is_none());

    let err = fx
        .accounts()
        .verify(&verify_request(email_contact(), &code))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCode));
}

#[tokio::test]
async fn test_expired_code_is_rejected() {
    let fx = Fixture::default();
    let user = fx.register_awa().await;
    let code = fx.users.pending_code(&user.id).code;
    fx.users
        .update(&user.id, |s| {
            if let Some(pending) = s.verification.as_mut() {
                pending.expires_at = Utc::now() - Duration::seconds(1);
            }
        })
        .unwrap();

    let err = fx
        .accounts()
        .verify(&verify_request(email_contact(), &code))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCode));
}

#[tokio::test]
async fn test_resend_rebinds_code_to_requested_channel() {
    let fx = Fixture::default();
    let user = fx.register_awa().await;

    let contact: ContactRequest = serde_json::from_value(phone_contact()).unwrap();
    fx.accounts().resend_verification(&contact).await.unwrap();
    let code = fx.users.pending_code(&user.id);
    assert_eq!(code.channel, RegistrationMethod::Phone);

    let verified = fx
        .accounts()
        .verify(&verify_request(phone_contact(), &code.code))
        .await
        .unwrap();
    assert!(verified.phone_verified);
}

#[tokio::test]
async fn test_password_reset_ends_sessions_and_binds_channel() {
    let fx = Fixture::default();
    let user = fx.register_awa().await;
    let open = fx.login(true).await;

    let contact: ContactRequest = serde_json::from_value(phone_contact()).unwrap();
    fx.accounts().request_password_reset(&contact).await.unwrap();
    let code = fx.users.pending_code(&user.id).code;

    let by_email: PasswordResetConfirm = serde_json::from_value(with_contact(
        email_contact(),
        json!({ "code": code, "new_password": "battery-staple" }),
    ))
    .unwrap();
    let err = fx.accounts().confirm_password_reset(&by_email).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCode));

    let by_phone: PasswordResetConfirm = serde_json::from_value(with_contact(
        phone_contact(),
        json!({ "code": code, "new_password": "battery-staple" }),
    ))
    .unwrap();
    fx.accounts().confirm_password_reset(&by_phone).await.unwrap();

    let stored = fx.users.stored(&user.id);
    assert_eq!(stored.password_hash.as_deref(), Some("plain:battery-staple"));
    assert!(stored.verification.is_none());
    let err = fx.accounts().authenticate(&open.session.token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidSession));
}

#[tokio::test]
async fn test_reset_for_unknown_contact_is_silent() {
    let fx = Fixture::default();
    let contact: ContactRequest =
        serde_json::from_value(json!({ "email": "nobody@example.ga" })).unwrap();
    fx.accounts().request_password_reset(&contact).await.unwrap();
}

#[tokio::test]
async fn test_add_contact_checks_password_and_existing_channels() {
    let fx = Fixture::default();
    let user = fx.register_awa().await;

    let wrong: AddContactRequest = serde_json::from_value(json!({
        "email": "awa.work@example.ga",
        "password": "wrong-horse",
    }))
    .unwrap();
    let err = fx.accounts().add_contact(&user.id, &wrong).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    let second_email: AddContactRequest = serde_json::from_value(json!({
        "email": "awa.work@example.ga",
        "password": "correct-horse",
    }))
    .unwrap();
    let err = fx.accounts().add_contact(&user.id, &second_email).await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(msg) if msg.contains("email address")));
}

#[tokio::test]
async fn test_add_contact_rejects_contact_of_another_account() {
    let fx = Fixture::default();
    fx.register_awa().await;
    let other = fx
        .accounts()
        .register(registration(json!({
            "registration_method": "email",
            "email": "jean@example.ga",
            "first_name": "Jean",
            "last_name": "Mba",
            "password": "jean-password",
        })))
        .await
        .unwrap()
        .user;

    let request: AddContactRequest = serde_json::from_value(json!({
        "phone": "+241 6 12 34 56",
        "password": "jean-password",
    }))
    .unwrap();
    let err = fx.accounts().add_contact(&other.id, &request).await.unwrap_err();
    assert!(matches!(err, AuthError::PhoneTaken));
    assert!(fx.users.stored(&other.id).user.phone.is_none());
}

#[tokio::test]
async fn test_added_contact_starts_unverified_and_verifies_with_its_code() {
    let fx = Fixture::default();
    let user = fx
        .accounts()
        .register(registration(json!({
            "registration_method": "phone",
            "phone": "07 11 22 33",
            "first_name": "Paul",
            "last_name": "Obame",
            "password": "paul-password",
        })))
        .await
        .unwrap()
        .user;

    let request: AddContactRequest = serde_json::from_value(json!({
        "email": "paul@example.ga",
        "password": "paul-password",
    }))
    .unwrap();
    let (updated, contact) = fx.accounts().add_contact(&user.id, &request).await.unwrap();
    assert_eq!(contact, Contact::Email(Email::parse("paul@example.ga").unwrap()));
    assert!(!updated.email_verified);

    let code = fx.users.pending_code(&user.id);
    assert_eq!(code.channel, RegistrationMethod::Email);
    let verified = fx
        .accounts()
        .verify(&verify_request(json!({ "email": "paul@example.ga" }), &code.code))
        .await
        .unwrap();
    assert!(verified.email_verified);
    assert_eq!(verified.phone, Some(PhoneNumber::parse("07 11 22 33").unwrap()));
}

#[tokio::test]
async fn test_change_password_requires_current_password() {
    let fx = Fixture::default();
    let user = fx.register_awa().await;

    let wrong: ChangePasswordRequest = serde_json::from_value(json!({
        "current_password": "nope-nope",
        "new_password": "battery-staple",
    }))
    .unwrap();
    let err = fx.accounts().change_password(&user.id, &wrong).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    let right: ChangePasswordRequest = serde_json::from_value(json!({
        "current_password": "correct-horse",
        "new_password": "battery-staple",
    }))
    .unwrap();
    fx.accounts().change_password(&user.id, &right).await.unwrap();
    assert_eq!(
        fx.users.stored(&user.id).password_hash.as_deref(),
        Some("plain:battery-staple")
    );
}

#[tokio::test]
async fn test_mark_read_ignores_other_users_notifications() {
    let fx = Fixture::default();
    let user = fx.register_awa().await;
    let mine = fx.inbox.push(&user.id, "Application approved");
    let theirs = fx.inbox.push(&UserId::new("user_other"), "Not yours");

    let updated = fx
        .accounts()
        .mark_notifications_read(&user.id, &[mine, theirs])
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let listed = fx.accounts().notifications(&user.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed.iter().all(|n| n.is_read));
}
