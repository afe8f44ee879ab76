use chrono::Utc;

use super::model::{
    normalize_email, Credentials, LoginPayload, RegisterPayload, UpdateProfilePayload, User,
    UserRole,
};
use super::password::{hash_password, verify_password};
use super::service::UserStore;
use crate::error::WorkNestError;

const INVALID_LOGIN: &str = "Invalid email or password";

fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn valid_email(raw: &str) -> Result<String, WorkNestError> {
    let email = normalize_email(raw);
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(WorkNestError::validation("Please enter a valid email address")),
    }
}

/// Create an account. The admin role is granted only when `admin_invite_token`
/// is configured and the payload presents the same value.
pub async fn register(
    users: &dyn UserStore,
    payload: RegisterPayload,
    admin_invite_token: Option<&str>,
) -> Result<User, WorkNestError> {
    let (Some(name), Some(email), Some(password)) = (
        required(payload.name),
        required(payload.email),
        required(payload.password),
    ) else {
        return Err(WorkNestError::validation(
            "Name, email and password are required",
        ));
    };
    let email = valid_email(&email)?;

    let role = match (admin_invite_token, payload.admin_invite_token.as_deref()) {
        (Some(expected), Some(presented)) if expected == presented => UserRole::Admin,
        _ => UserRole::Member,
    };

    let user = User {
        user_id: uuid::Uuid::new_v4().to_string(),
        name: name.trim().to_string(),
        email: email.clone(),
        role,
        profile_image_url: required(payload.profile_image_url),
        created_at: Utc::now(),
    };
    let credentials = Credentials {
        email,
        user_id: user.user_id.clone(),
        password_hash: hash_password(&password)?,
    };

    if !users.claim_credentials(&credentials).await? {
        return Err(WorkNestError::validation("User already exists"));
    }
    users.put_user(&user).await?;

    tracing::info!("Registered user {} as {}", user.user_id, user.role.as_str());
    Ok(user)
}

/// Resolve an email and password to the account they belong to. Every
/// mismatch reports the same message.
pub async fn login(users: &dyn UserStore, payload: LoginPayload) -> Result<User, WorkNestError> {
    let (Some(email), Some(password)) = (required(payload.email), required(payload.password))
    else {
        return Err(WorkNestError::validation("Email and password are required"));
    };

    let Some(credentials) = users.get_credentials(&normalize_email(&email)).await? else {
        return Err(WorkNestError::unauthorized(INVALID_LOGIN));
    };
    if !verify_password(&password, &credentials.password_hash) {
        tracing::warn!("Failed login for user {}", credentials.user_id);
        return Err(WorkNestError::unauthorized(INVALID_LOGIN));
    }

    users
        .get_user(&credentials.user_id)
        .await?
        .ok_or_else(|| WorkNestError::unauthorized(INVALID_LOGIN))
}

/// Change the caller's name, email, password or profile image. Absent or
/// blank fields keep their current value.
pub async fn update_profile(
    users: &dyn UserStore,
    current: &User,
    payload: UpdateProfilePayload,
) -> Result<User, WorkNestError> {
    let mut user = current.clone();

    if let Some(name) = required(payload.name) {
        user.name = name.trim().to_string();
    }
    if let Some(url) = payload.profile_image_url {
        user.profile_image_url = required(Some(url));
    }

    let new_email = required(payload.email)
        .map(|raw| valid_email(&raw))
        .transpose()?
        .filter(|email| *email != current.email);
    let new_password = required(payload.password);

    if new_email.is_some() || new_password.is_some() {
        let mut credentials = users
            .get_credentials(&current.email)
            .await?
            .ok_or_else(|| WorkNestError::Internal(format!(
                "No credentials stored for user {}",
                current.user_id
            )))?;

        if let Some(password) = new_password {
            credentials.password_hash = hash_password(&password)?;
        }

        match new_email {
            Some(email) => {
                let moved = Credentials {
                    email: email.clone(),
                    ..credentials
                };
                if !users.claim_credentials(&moved).await? {
                    return Err(WorkNestError::validation("Email is already in use"));
                }
                users.delete_credentials(&current.email).await?;
                user.email = email;
            }
            None => users.save_credentials(&credentials).await?,
        }
    }

    users.put_user(&user).await?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn registration(email: &str, invite: Option<&str>) -> RegisterPayload {
        RegisterPayload {
            name: Some("Ari Lane".to_string()),
            email: Some(email.to_string()),
            password: Some("s3cret-pass".to_string()),
            profile_image_url: None,
            admin_invite_token: invite.map(String::from),
        }
    }

    fn login_as(email: &str, password: &str) -> LoginPayload {
        LoginPayload {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn registration_defaults_to_member_and_normalizes_email() {
        let store = MemoryStore::default();
        let user = register(&store, registration(" Ari@WorkNest.test", None), Some("invite"))
            .await
            .unwrap();

        assert_eq!(user.role, UserRole::Member);
        assert_eq!(user.email, "ari@worknest.test");
        assert_eq!(store.get_user(&user.user_id).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn matching_invite_token_grants_admin() {
        let store = MemoryStore::default();
        let admin = register(&store, registration("a@worknest.test", Some("invite")), Some("invite"))
            .await
            .unwrap();
        assert!(admin.is_admin());

        let wrong = register(&store, registration("b@worknest.test", Some("guess")), Some("invite"))
            .await
            .unwrap();
        assert!(!wrong.is_admin());

        // No invite configured means nobody can register as admin
        let unconfigured = register(&store, registration("c@worknest.test", Some("")), None)
            .await
            .unwrap();
        assert!(!unconfigured.is_admin());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::default();
        register(&store, registration("ari@worknest.test", None), None)
            .await
            .unwrap();

        let err = register(&store, registration("ARI@worknest.test", None), None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkNestError::Validation(m) if m == "User already exists"));
        assert_eq!(store.users.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn registration_requires_every_field() {
        let store = MemoryStore::default();
        let mut payload = registration("ari@worknest.test", None);
        payload.password = Some("  ".to_string());
        assert!(matches!(
            register(&store, payload, None).await,
            Err(WorkNestError::Validation(_))
        ));

        assert!(matches!(
            register(&store, registration("not-an-email", None), None).await,
            Err(WorkNestError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn login_checks_the_password() {
        let store = MemoryStore::default();
        let user = register(&store, registration("ari@worknest.test", None), None)
            .await
            .unwrap();

        let found = login(&store, login_as("Ari@worknest.test", "s3cret-pass"))
            .await
            .unwrap();
        assert_eq!(found.user_id, user.user_id);

        for (email, password) in [
            ("ari@worknest.test", "wrong"),
            ("nobody@worknest.test", "s3cret-pass"),
        ] {
            let err = login(&store, login_as(email, password)).await.unwrap_err();
            assert!(matches!(err, WorkNestError::Unauthorized(m) if m == INVALID_LOGIN));
        }
    }

    #[tokio::test]
    async fn profile_update_moves_credentials_with_the_email() {
        let store = MemoryStore::default();
        let user = register(&store, registration("ari@worknest.test", None), None)
            .await
            .unwrap();

        let updated = update_profile(
            &store,
            &user,
            UpdateProfilePayload {
                name: Some("Ari L.".to_string()),
                email: Some("ari.lane@worknest.test".to_string()),
                password: Some("n3w-pass".to_string()),
                profile_image_url: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Ari L.");
        assert_eq!(updated.email, "ari.lane@worknest.test");
        assert!(store.get_credentials("ari@worknest.test").await.unwrap().is_none());
        assert!(login(&store, login_as("ari.lane@worknest.test", "n3w-pass"))
            .await
            .is_ok());
        assert!(login(&store, login_as("ari.lane@worknest.test", "s3cret-pass"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn profile_update_cannot_take_another_users_email() {
        let store = MemoryStore::default();
        let ari = register(&store, registration("ari@worknest.test", None), None)
            .await
            .unwrap();
        register(&store, registration("bea@worknest.test", None), None)
            .await
            .unwrap();

        let err = update_profile(
            &store,
            &ari,
            UpdateProfilePayload {
                email: Some("bea@worknest.test".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WorkNestError::Validation(m) if m == "Email is already in use"));
        assert!(login(&store, login_as("ari@worknest.test", "s3cret-pass"))
            .await
            .is_ok());
    }
}
