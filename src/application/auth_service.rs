use crate::application::session::SessionStore;
use crate::data::collection::{load_list, persist_list};
use crate::domain::error::DomainError;
use crate::domain::storage::{KeyValueStore, USERS_KEY};
use crate::domain::user::{CreateUser, LoginRequest, StoredUser, User};
use crate::infrastructure::config::StoreConfig;
use crate::infrastructure::ids::new_user_id;
use crate::infrastructure::security::{PasswordHasher, generate_token, validate_token};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, trace, warn};

pub struct AuthService<S: KeyValueStore> {
    store: Arc<S>,
    session: SessionStore<S>,
    hasher: Arc<dyn PasswordHasher>,
    token_secret: String,
    latency: Duration,
}

impl<S: KeyValueStore> AuthService<S> {
    pub fn new(store: Arc<S>, hasher: Arc<dyn PasswordHasher>, config: &StoreConfig) -> Self {
        Self {
            session: SessionStore::new(Arc::clone(&store)),
            store,
            hasher,
            token_secret: config.token_secret.clone(),
            latency: config.latency.auth,
        }
    }

    pub fn session(&self) -> &SessionStore<S> {
        &self.session
    }

    fn load_users(&self) -> Result<Vec<StoredUser>> {
        load_list(self.store.as_ref(), USERS_KEY)
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: CreateUser) -> Result<User> {
        trace!("Starting user registration");
        tokio::time::sleep(self.latency).await;

        let mut users = self.load_users()?;
        if users.iter().any(|u| u.matches_email(&req.email)) {
            warn!(email = %req.email, "Account already exists");
            return Err(DomainError::DuplicateAccount(req.email).into());
        }

        let password_hash = self.hasher.hash(&req.password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            DomainError::Internal(format!("Failed to hash password: {}", e))
        })?;

        let id = loop {
            let candidate = new_user_id();
            if !users.iter().any(|u| u.id == candidate) {
                break candidate;
            }
        };

        let stored = StoredUser {
            id,
            name: req.name,
            email: req.email,
            password_hash,
        };
        let user = stored.to_public();
        users.push(stored);

        debug!(user_id = %user.id, total = users.len(), "Saving user list");
        persist_list(self.store.as_ref(), USERS_KEY, &users)?;
        self.session.establish(&user)?;

        info!(user_id = %user.id, email = %user.email, "User registered successfully");
        Ok(user)
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<User> {
        trace!("Starting login");
        tokio::time::sleep(self.latency).await;

        let users = self.load_users()?;
        let stored = users
            .iter()
            .find(|u| u.matches_email(&req.email))
            .ok_or_else(|| {
                warn!(email = %req.email, "No account for email");
                DomainError::InvalidCredentials
            })?;

        let is_valid = self
            .hasher
            .verify(&req.password, &stored.password_hash)
            .map_err(|e| {
                error!(user_id = %stored.id, error = %e, "Failed to verify password");
                DomainError::Internal(format!("Failed to verify password: {}", e))
            })?;

        if !is_valid {
            warn!(user_id = %stored.id, "Invalid password during login");
            return Err(DomainError::InvalidCredentials.into());
        }

        let user = stored.to_public();
        self.session.establish(&user)?;

        info!(user_id = %user.id, email = %user.email, "Login successful");
        Ok(user)
    }

    pub fn logout(&self) -> Result<()> {
        self.session.clear()?;
        info!("Logged out");
        Ok(())
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current()
    }

    /// Token for the current session, `None` when nobody is logged in.
    pub fn get_token(&self) -> Option<String> {
        let user = self.session.current()?;
        match generate_token(&user.id, &self.token_secret) {
            Ok(token) => Some(token),
            Err(e) => {
                error!(user_id = %user.id, error = %e, "Failed to generate token");
                None
            }
        }
    }

    /// User id a token from [`AuthService::get_token`] was issued for.
    pub fn validate_token(&self, token: &str) -> Result<String> {
        validate_token(token, &self.token_secret).map_err(|e| {
            warn!(error = %e, "Rejected token");
            DomainError::Unauthenticated.into()
        })
    }
}
