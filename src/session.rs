use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use std::env;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

pub const LOGIN_PATH: &str = "/login";
pub const SESSION_COOKIE: &str = "catalog_admin_session";
pub const SESSION_TTL_HOURS: i64 = 12;

type HmacSha256 = Hmac<Sha256>;

/// Credential of one signed-in browser. The API client reads the bearer
/// token from here for every call made on that admin's behalf.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    token: RwLock<Option<String>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            token: RwLock::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn get_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.get_token().is_some()
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= Duration::hours(SESSION_TTL_HOURS)
    }
}

/// Signed-in sessions keyed by id. Browsers hold `<id>.<signature>` in the
/// session cookie; the signature is HMAC-SHA256 over the id, URL-safe base64
/// without padding.
pub struct SessionStore {
    mac: HmacSha256,
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionStore {
    pub fn new(secret: &str) -> anyhow::Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| anyhow::anyhow!("Invalid SESSION_SECRET"))?;
        Ok(Self {
            mac,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Keyed by `SESSION_SECRET`; without it a random key is used and
    /// sessions do not survive a restart.
    pub fn from_env() -> anyhow::Result<Self> {
        match env::var("SESSION_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => Self::new(secret.trim()),
            _ => {
                log::warn!("SESSION_SECRET not set, signing sessions with a random key");
                Self::new(&format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()))
            }
        }
    }

    fn signature(&self, id: Uuid) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(id.as_bytes());
        mac
    }

    pub fn cookie_value(&self, session: &Session) -> String {
        let bytes = self.signature(session.id()).finalize().into_bytes();
        format!(
            "{}.{}",
            session.id(),
            general_purpose::URL_SAFE_NO_PAD.encode(bytes)
        )
    }

    pub fn cookie(&self, session: &Session) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, self.cookie_value(session))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish()
    }

    fn verify(&self, value: &str) -> Option<Uuid> {
        let (id, signature) = value.split_once('.')?;
        let id = Uuid::parse_str(id).ok()?;
        let signature = general_purpose::URL_SAFE_NO_PAD.decode(signature).ok()?;
        self.signature(id).verify_slice(&signature).ok()?;
        Some(id)
    }

    pub fn insert(&self, session: Arc<Session>) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, s| !s.is_expired(now));
        sessions.insert(session.id(), session);
    }

    pub fn remove(&self, id: Uuid) -> Option<Arc<Session>> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    /// Live session for a cookie value: signature valid, session known, not
    /// expired and still holding a credential.
    pub fn resolve(&self, value: &str) -> Option<Arc<Session>> {
        let id = self.verify(value)?;
        let session = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()?;

        if session.is_expired(Utc::now()) {
            self.remove(id);
            return None;
        }
        session.is_authenticated().then_some(session)
    }

    pub fn from_request(&self, req: &HttpRequest) -> Option<Arc<Session>> {
        req.cookie(SESSION_COOKIE)
            .and_then(|cookie| self.resolve(cookie.value()))
    }
}

/**
 * removal_cookie
 * Cookie that makes the browser drop its session cookie.
 */
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/**
 * login_redirect
 * 303 to the login entry point.
 */
pub fn login_redirect() -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, LOGIN_PATH))
        .finish()
}

/**
 * gate
 * Lets a protected request through only when it carries the cookie of a
 * live session, and hands that session to the handler.
 */
pub fn gate(store: &SessionStore, req: &HttpRequest) -> Result<Arc<Session>, HttpResponse> {
    store.from_request(req).ok_or_else(|| {
        log::debug!("No admin session on {}, redirecting to {}", req.path(), LOGIN_PATH);
        login_redirect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;

    fn store() -> SessionStore {
        SessionStore::new("test-secret").unwrap()
    }

    fn signed_in(store: &SessionStore) -> Arc<Session> {
        let session = Arc::new(Session::new());
        session.set_token("abc");
        store.insert(session.clone());
        session
    }

    #[test]
    fn token_can_be_set_read_and_cleared() {
        let session = Session::new();
        assert_eq!(session.get_token(), None);

        session.set_token("abc");
        assert_eq!(session.get_token().as_deref(), Some("abc"));

        session.set_token("def");
        assert_eq!(session.get_token().as_deref(), Some("def"));

        session.clear();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn gate_redirects_requests_without_a_cookie() {
        let store = store();
        signed_in(&store);

        let req = TestRequest::default().to_http_request();
        let response = gate(&store, &req).unwrap_err();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            LOGIN_PATH
        );
    }

    #[test]
    fn gate_admits_only_the_signed_in_browser() {
        let store = store();
        let session = signed_in(&store);

        let req = TestRequest::default()
            .cookie(store.cookie(&session))
            .to_http_request();
        assert_eq!(gate(&store, &req).unwrap().id(), session.id());

        session.clear();
        assert!(gate(&store, &req).is_err());
    }

    #[test]
    fn tampered_or_foreign_cookies_are_rejected() {
        let store = store();
        let session = signed_in(&store);
        let value = store.cookie_value(&session);

        let (_, signature) = value.split_once('.').unwrap();
        let forged = format!("{}.{}", Uuid::new_v4(), signature);
        assert!(store.resolve(&forged).is_none());
        assert!(store.resolve(&format!("{}x", value)).is_none());
        assert!(store.resolve(&session.id().to_string()).is_none());

        let other = SessionStore::new("another-secret").unwrap();
        other.insert(session.clone());
        assert!(other.resolve(&value).is_none());
        assert!(store.resolve(&value).is_some());
    }

    #[test]
    fn removed_sessions_stop_resolving() {
        let store = store();
        let session = signed_in(&store);
        let value = store.cookie_value(&session);

        assert!(store.remove(session.id()).is_some());
        assert!(store.resolve(&value).is_none());
    }

    #[test]
    fn removal_cookie_expires_the_session_cookie() {
        let cookie = removal_cookie();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "");
        assert!(cookie.max_age().is_some());
    }
}
