use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    Currency, EngineError, ResultEngine, User, UserRole, Wallet, WalletOwner,
    password::PasswordHash,
    users,
    util::normalize_required_text,
    wallets,
};

use super::{Engine, with_tx};

const USERNAME_MAX: usize = 50;
const EMAIL_MAX: usize = 255;

fn invalid_credentials() -> EngineError {
    EngineError::Forbidden("invalid credentials".to_string())
}

impl Engine {
    /// Registers a user together with their first personal wallet.
    ///
    /// Username and email are unique (email compared case-insensitively).
    /// The wallet starts at zero in the default currency.
    pub async fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ResultEngine<(User, Wallet)> {
        let username = normalize_required_text(username, "username", USERNAME_MAX)?;
        let email = normalize_required_text(email, "email", EMAIL_MAX)?.to_lowercase();
        if !email.contains('@') {
            return Err(EngineError::InvalidName("invalid email".to_string()));
        }
        let password = PasswordHash::new(password, self.password_cost)?;

        with_tx!(self, "register user", |db_tx| {
            if users::Entity::find()
                .filter(users::Column::Username.eq(username.clone()))
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(username.clone()));
            }
            if users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(email.clone()));
            }

            let user_id = Uuid::new_v4();
            let user_model = users::ActiveModel {
                id: ActiveValue::Set(user_id),
                username: ActiveValue::Set(username.clone()),
                email: ActiveValue::Set(email.clone()),
                password: ActiveValue::Set(password.clone().into_inner()),
                role: ActiveValue::Set(UserRole::User.as_str().to_string()),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            let wallet = Wallet::new(
                format!("First Wallet {username}"),
                Currency::default(),
                WalletOwner::Personal(user_id),
            );
            wallets::ActiveModel::from(&wallet).insert(&db_tx).await?;

            info!(%user_id, %username, "user registered");
            Ok((User::try_from(user_model)?, wallet))
        })
    }

    /// Checks an email/password pair.
    ///
    /// An unknown email and a wrong password fail the same way.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> ResultEngine<User> {
        let email = email.trim().to_lowercase();
        with_tx!(self, "verify credentials", |db_tx| {
            let Some(model) = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
            else {
                warn!("login attempt for unknown email");
                return Err(invalid_credentials());
            };
            if !PasswordHash::from_stored(model.password.clone()).verify(password) {
                warn!(user_id = %model.id, "login attempt with wrong password");
                return Err(invalid_credentials());
            }
            User::try_from(model)
        })
    }

    pub async fn user_by_username(&self, username: &str) -> ResultEngine<User> {
        let username = username.trim();
        with_tx!(self, "find user", |db_tx| {
            let model = users::Entity::find()
                .filter(users::Column::Username.eq(username))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
            User::try_from(model)
        })
    }

    pub async fn user_profile(&self, user_id: Uuid) -> ResultEngine<User> {
        with_tx!(self, "find user", |db_tx| {
            User::try_from(self.require_user(&db_tx, user_id).await?)
        })
    }

    /// Lists every registered user by username. Any user may look.
    pub async fn list_users(&self, actor_id: Uuid) -> ResultEngine<Vec<User>> {
        with_tx!(self, "list users", |db_tx| {
            self.require_user(&db_tx, actor_id).await?;
            let models = users::Entity::find()
                .order_by_asc(users::Column::Username)
                .all(&db_tx)
                .await?;
            models.into_iter().map(User::try_from).collect()
        })
    }
}
