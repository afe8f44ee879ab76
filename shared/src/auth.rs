use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lambda_http::http::header::{HeaderValue, CONTENT_TYPE};
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use worknest_atoms::error::ErrorBody;
use worknest_atoms::response::{parse_body, respond};
use worknest_atoms::users::account;
use worknest_atoms::users::model::{LoginPayload, RegisterPayload, UpdateProfilePayload};
use worknest_atoms::users::{User, UserStore};
use worknest_atoms::WorkNestError;

use crate::config::Config;

/// Lifetime of tokens issued on register, login and profile update.
pub const TOKEN_TTL_DAYS: i64 = 7;

/// Claims carried by a WorkNest bearer token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// User id
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("jwt malformed")]
    Malformed,
    #[error("invalid algorithm")]
    UnsupportedAlgorithm,
    #[error("invalid signature")]
    BadSignature,
    #[error("jwt expired")]
    Expired,
    #[error("invalid signing key")]
    InvalidKey,
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                Self::UnsupportedAlgorithm
            }
            ErrorKind::InvalidKeyFormat => Self::InvalidKey,
            _ => Self::Malformed,
        }
    }
}

/// Sign `claims` as an HS256 token.
pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, TokenError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Token for a signed-in user, valid for [`TOKEN_TTL_DAYS`].
pub fn session_token(user_id: &str, secret: &str) -> Result<String, TokenError> {
    let now = Utc::now();
    issue_token(
        &Claims {
            id: user_id.to_string(),
            iat: Some(now.timestamp()),
            exp: Some((now + Duration::days(TOKEN_TTL_DAYS)).timestamp()),
        },
        secret,
    )
}

/// Verify an HS256 token and return its claims. Tokens without `exp` do not
/// expire.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.required_spec_claims.clear();
    validation.leeway = 0;

    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(TokenError::from)
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    pub fn user_id(&self) -> &str {
        &self.user.user_id
    }
}

fn error_response(status: StatusCode, message: &str, error: Option<String>) -> Response<Body> {
    let body = ErrorBody {
        message: message.to_string(),
        error,
    };
    let mut resp = Response::new(Body::from(
        serde_json::to_string(&body).unwrap_or_default(),
    ));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

/// Resolve `Authorization: Bearer <token>` to a stored user.
/// On failure the returned response is ready to send.
pub async fn authenticate_bearer_request(
    users: &dyn UserStore,
    jwt_secret: &str,
    authorization: Option<&str>,
) -> Result<AuthContext, Response<Body>> {
    let Some(token) = authorization
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|rest| rest.split_whitespace().next())
    else {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Not authorized, no token",
            None,
        ));
    };

    let claims = verify_token(token, jwt_secret).map_err(|e| {
        tracing::warn!("Rejected bearer token: {}", e);
        error_response(StatusCode::UNAUTHORIZED, "Token failed", Some(e.to_string()))
    })?;

    match users.get_user(&claims.id).await {
        Ok(Some(user)) => Ok(AuthContext { user }),
        Ok(None) => {
            tracing::warn!("Token for unknown user {}", claims.id);
            Err(error_response(
                StatusCode::UNAUTHORIZED,
                "Token failed",
                Some("User not found".to_string()),
            ))
        }
        Err(e) => {
            tracing::error!("User lookup failed during auth: {}", e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error",
                Some(e.to_string()),
            ))
        }
    }
}

/// Admin-only guard for routes such as the global dashboard.
pub fn require_admin(ctx: &AuthContext) -> Result<(), Response<Body>> {
    if ctx.user.is_admin() {
        Ok(())
    } else {
        Err(error_response(
            StatusCode::FORBIDDEN,
            "Access denied. Admin only.",
            None,
        ))
    }
}

// ========== SESSION ROUTES ==========

/// Profile plus a fresh bearer token.
#[derive(Debug, Serialize)]
struct SessionBody {
    #[serde(flatten)]
    user: User,
    token: String,
}

fn with_session(user: User, secret: &str) -> Result<SessionBody, WorkNestError> {
    let token = session_token(&user.user_id, secret)
        .map_err(|e| WorkNestError::Internal(e.to_string()))?;
    Ok(SessionBody { user, token })
}

/// HTTP Handler: POST /api/auth/register
pub async fn register_handler(
    users: &dyn UserStore,
    config: &Config,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: RegisterPayload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };

    let result = account::register(users, payload, config.admin_invite_token.as_deref())
        .await
        .and_then(|user| with_session(user, &config.jwt_secret));
    respond(StatusCode::CREATED, result)
}

/// HTTP Handler: POST /api/auth/login
pub async fn login_handler(
    users: &dyn UserStore,
    config: &Config,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: LoginPayload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };

    let result = account::login(users, payload)
        .await
        .and_then(|user| with_session(user, &config.jwt_secret));
    respond(StatusCode::OK, result)
}

/// HTTP Handler: PUT /api/auth/profile
pub async fn update_profile_handler(
    users: &dyn UserStore,
    config: &Config,
    ctx: &AuthContext,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: UpdateProfilePayload = match parse_body(body) {
        Ok(payload) => payload,
        Err(e) => return e.into_response(),
    };

    let result = account::update_profile(users, &ctx.user, payload)
        .await
        .and_then(|user| with_session(user, &config.jwt_secret));
    respond(StatusCode::OK, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use worknest_atoms::users::UserRole;
    use worknest_atoms::MemoryStore;

    const SECRET: &str = "test-secret";

    fn claims(id: &str, exp: Option<i64>) -> Claims {
        Claims {
            id: id.to_string(),
            iat: Some(1_700_000_000),
            exp,
        }
    }

    fn in_an_hour() -> Option<i64> {
        Some(Utc::now().timestamp() + 3600)
    }

    fn member(id: &str, role: UserRole) -> User {
        User {
            user_id: id.to_string(),
            name: "Member".to_string(),
            email: "member@worknest.test".to_string(),
            role,
            profile_image_url: None,
            created_at: Utc::now(),
        }
    }

    fn config() -> Config {
        Config {
            table_name: "worknest-test".to_string(),
            jwt_secret: SECRET.to_string(),
            client_url: "*".to_string(),
            admin_invite_token: Some("invite".to_string()),
        }
    }

    fn body_json(resp: &Response<Body>) -> serde_json::Value {
        serde_json::from_slice(resp.body()).unwrap()
    }

    #[test]
    fn issued_tokens_verify() {
        let token = issue_token(&claims("u1", in_an_hour()), SECRET).unwrap();
        let verified = verify_token(&token, SECRET).unwrap();
        assert_eq!(verified.id, "u1");
    }

    #[test]
    fn tokens_without_expiry_verify() {
        let token = issue_token(&claims("u1", None), SECRET).unwrap();
        assert_eq!(verify_token(&token, SECRET).unwrap().exp, None);
    }

    #[test]
    fn session_tokens_last_a_week() {
        let token = session_token("u1", SECRET).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        let (iat, exp) = (claims.iat.unwrap(), claims.exp.unwrap());
        assert_eq!(exp - iat, TOKEN_TTL_DAYS * 24 * 60 * 60);
    }

    #[test]
    fn wrong_secret_or_spliced_payload_fails() {
        let token = issue_token(&claims("u1", None), SECRET).unwrap();
        assert_eq!(verify_token(&token, "other"), Err(TokenError::BadSignature));

        let admin_token = issue_token(&claims("admin", None), "other").unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = admin_token.split('.').nth(1).unwrap();
        assert_eq!(
            verify_token(&parts.join("."), SECRET),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn expired_tokens_fail() {
        let past = Some(Utc::now().timestamp() - 60);
        let token = issue_token(&claims("u1", past), SECRET).unwrap();
        assert_eq!(verify_token(&token, SECRET), Err(TokenError::Expired));
    }

    #[test]
    fn only_hs256_is_accepted() {
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS384),
            &claims("u1", None),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(
            verify_token(&token, SECRET),
            Err(TokenError::UnsupportedAlgorithm)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(verify_token("abc", SECRET), Err(TokenError::Malformed));
        assert_eq!(verify_token("a.b.c.d", SECRET), Err(TokenError::Malformed));
    }

    #[tokio::test]
    async fn missing_or_non_bearer_header_is_unauthorized() {
        let store = MemoryStore::default();
        let token = issue_token(&claims("u1", None), SECRET).unwrap();
        let glued = format!("Bearer{}", token);
        for header in [None, Some("Basic abc"), Some("Bearer"), Some("Bearer   "), Some(glued.as_str())] {
            let resp = authenticate_bearer_request(&store, SECRET, header)
                .await
                .unwrap_err();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(body_json(&resp)["message"], "Not authorized, no token");
        }
    }

    #[tokio::test]
    async fn valid_token_for_unknown_user_fails() {
        let store = MemoryStore::default();
        let token = issue_token(&claims("ghost", None), SECRET).unwrap();
        let resp = authenticate_bearer_request(&store, SECRET, Some(&format!("Bearer {}", token)))
            .await
            .unwrap_err();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(&resp);
        assert_eq!(body["message"], "Token failed");
        assert_eq!(body["error"], "User not found");
    }

    #[tokio::test]
    async fn valid_token_resolves_the_user_and_admin_guard_applies() {
        let store = MemoryStore::default();
        store.put_user(&member("u1", UserRole::Member)).await.unwrap();
        store.put_user(&member("boss", UserRole::Admin)).await.unwrap();

        let token = issue_token(&claims("u1", None), SECRET).unwrap();
        let ctx = authenticate_bearer_request(&store, SECRET, Some(&format!("Bearer {}", token)))
            .await
            .unwrap();
        assert_eq!(ctx.user_id(), "u1");
        let denied = require_admin(&ctx).unwrap_err();
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let token = issue_token(&claims("boss", None), SECRET).unwrap();
        let ctx = authenticate_bearer_request(&store, SECRET, Some(&format!("Bearer {}", token)))
            .await
            .unwrap();
        assert!(require_admin(&ctx).is_ok());
    }

    #[tokio::test]
    async fn register_then_login_returns_usable_tokens() {
        let store = MemoryStore::default();
        let config = config();

        let resp = register_handler(
            &store,
            &config,
            br#"{"name":"Ari","email":"ari@worknest.test","password":"pw-123","adminInviteToken":"invite"}"#,
        )
        .await
        .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let registered = body_json(&resp);
        assert_eq!(registered["role"], "admin");
        assert!(registered.get("passwordHash").is_none());

        let resp = login_handler(
            &store,
            &config,
            br#"{"email":"ari@worknest.test","password":"pw-123"}"#,
        )
        .await
        .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let session = body_json(&resp);
        assert_eq!(session["_id"], registered["_id"]);

        let token = session["token"].as_str().unwrap();
        let ctx = authenticate_bearer_request(&store, SECRET, Some(&format!("Bearer {}", token)))
            .await
            .unwrap();
        assert!(ctx.user.is_admin());
    }

    #[tokio::test]
    async fn bad_login_is_unauthorized() {
        let store = MemoryStore::default();
        let resp = login_handler(
            &store,
            &config(),
            br#"{"email":"ari@worknest.test","password":"nope"}"#,
        )
        .await
        .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(&resp)["message"], "Invalid email or password");
    }
}
