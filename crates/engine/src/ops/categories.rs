use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait, prelude::*,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    Category, CategoryScope, EngineError, Polarity, ResultEngine, categories,
    group_memberships, transactions,
    util::{normalize_key, normalize_required_text},
};

use super::{Engine, with_tx};

const CATEGORY_NAME_MAX: usize = 100;

fn category_not_found() -> EngineError {
    EngineError::KeyNotFound("category not exists".to_string())
}

fn normalize_category_name(name: &str) -> ResultEngine<(String, String)> {
    let name = normalize_required_text(name, "category name", CATEGORY_NAME_MAX)?;
    let name_norm = normalize_key(&name).ok_or_else(|| {
        EngineError::InvalidName("category name must contain letters or digits".to_string())
    })?;
    Ok((name, name_norm))
}

/// Lower is preferred when several scopes share a name.
fn scope_rank(scope: CategoryScope) -> u8 {
    match scope {
        CategoryScope::User(_) => 0,
        CategoryScope::Group(_) => 1,
        CategoryScope::Global => 2,
    }
}

impl Engine {
    /// Resolves a category reference for a write on a wallet.
    ///
    /// `reference` is a category id or a name. Names are matched on their
    /// normalized key and the actor's own category wins over the wallet
    /// group's, which wins over a global default. Categories scoped to other
    /// users or groups never resolve.
    pub(super) async fn resolve_category(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
        wallet_group_id: Option<Uuid>,
        reference: &str,
    ) -> ResultEngine<Category> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(EngineError::InvalidName(
                "category must not be empty".to_string(),
            ));
        }

        if let Ok(category_id) = Uuid::parse_str(reference) {
            let category = self.category_by_id(db_tx, category_id).await?;
            let visible = match category.scope {
                CategoryScope::Global => true,
                CategoryScope::User(owner_id) => owner_id == user_id,
                CategoryScope::Group(group_id) => {
                    Some(group_id) == wallet_group_id
                        || self.is_group_member(db_tx, group_id, user_id).await?
                }
            };
            if !visible {
                return Err(category_not_found());
            }
            return Ok(category);
        }

        let name_norm = normalize_key(reference).ok_or_else(category_not_found)?;
        let mut scope = Condition::any()
            .add(categories::Column::UserId.eq(user_id))
            .add(
                Condition::all()
                    .add(categories::Column::UserId.is_null())
                    .add(categories::Column::GroupId.is_null()),
            );
        if let Some(group_id) = wallet_group_id {
            scope = scope.add(categories::Column::GroupId.eq(group_id));
        }

        let models = categories::Entity::find()
            .filter(categories::Column::NameNorm.eq(name_norm))
            .filter(scope)
            .all(db_tx)
            .await?;

        let mut best: Option<Category> = None;
        for model in models {
            let candidate = Category::try_from(model)?;
            let replace = best
                .as_ref()
                .is_none_or(|current| scope_rank(candidate.scope) < scope_rank(current.scope));
            if replace {
                best = Some(candidate);
            }
        }

        let category = best.ok_or_else(category_not_found)?;
        debug!(category = %category.name, polarity = category.polarity.as_str(), "resolved category");
        Ok(category)
    }

    pub(super) async fn category_by_id(
        &self,
        db_tx: &DatabaseTransaction,
        category_id: Uuid,
    ) -> ResultEngine<Category> {
        let model = categories::Entity::find_by_id(category_id)
            .one(db_tx)
            .await?
            .ok_or_else(category_not_found)?;
        Category::try_from(model)
    }

    /// Creates a category private to `user_id`, or shared with `group_id`.
    ///
    /// Creating a group category requires membership. Names are unique per
    /// scope once normalized.
    pub async fn create_category(
        &self,
        user_id: Uuid,
        name: &str,
        polarity: Polarity,
        group_id: Option<Uuid>,
    ) -> ResultEngine<Category> {
        let (name, name_norm) = normalize_category_name(name)?;

        with_tx!(self, "create category", |db_tx| {
            self.require_user(&db_tx, user_id).await?;

            let scope = match group_id {
                Some(group_id) => {
                    if !self.is_group_member(&db_tx, group_id, user_id).await? {
                        return Err(EngineError::unauthorized());
                    }
                    CategoryScope::Group(group_id)
                }
                None => CategoryScope::User(user_id),
            };

            if self
                .scoped_category_by_key(&db_tx, scope, &name_norm)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(name.clone()));
            }

            let id = Uuid::new_v4();
            let (owner_user, owner_group) = match scope {
                CategoryScope::Group(group_id) => (None, Some(group_id)),
                _ => (Some(user_id), None),
            };
            let model = categories::ActiveModel {
                id: ActiveValue::Set(id),
                name: ActiveValue::Set(name.clone()),
                name_norm: ActiveValue::Set(name_norm.clone()),
                polarity: ActiveValue::Set(polarity.as_str().to_string()),
                user_id: ActiveValue::Set(owner_user),
                group_id: ActiveValue::Set(owner_group),
            }
            .insert(&db_tx)
            .await?;

            info!(%user_id, category = %name, polarity = polarity.as_str(), "category created");
            Category::try_from(model)
        })
    }

    /// Lists the categories `user_id` can use: global defaults, their own and
    /// those of every group they belong to.
    pub async fn list_categories(&self, user_id: Uuid) -> ResultEngine<Vec<Category>> {
        with_tx!(self, "list categories", |db_tx| {
            self.require_user(&db_tx, user_id).await?;

            let group_ids: Vec<Uuid> = group_memberships::Entity::find()
                .filter(group_memberships::Column::UserId.eq(user_id))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|m| m.group_id)
                .collect();

            let mut scope = Condition::any()
                .add(categories::Column::UserId.eq(user_id))
                .add(
                    Condition::all()
                        .add(categories::Column::UserId.is_null())
                        .add(categories::Column::GroupId.is_null()),
                );
            if !group_ids.is_empty() {
                scope = scope.add(categories::Column::GroupId.is_in(group_ids));
            }

            let models = categories::Entity::find()
                .filter(scope)
                .order_by_asc(categories::Column::Polarity)
                .order_by_asc(categories::Column::NameNorm)
                .all(&db_tx)
                .await?;

            models.into_iter().map(Category::try_from).collect()
        })
    }

    /// Renames a user or group category. The polarity never changes.
    ///
    /// A private category can only be renamed by its owner and a group
    /// category by an admin of the group. Global defaults are read-only.
    pub async fn rename_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        name: &str,
    ) -> ResultEngine<Category> {
        let (name, name_norm) = normalize_category_name(name)?;

        with_tx!(self, "rename category", |db_tx| {
            let category = self
                .require_category_editor(&db_tx, user_id, category_id)
                .await?;
            let clash = self
                .scoped_category_by_key(&db_tx, category.scope, &name_norm)
                .await?;
            if clash.is_some_and(|other| other.id != category.id) {
                return Err(EngineError::ExistingKey(name.clone()));
            }

            let model = categories::ActiveModel {
                id: ActiveValue::Set(category.id),
                name: ActiveValue::Set(name.clone()),
                name_norm: ActiveValue::Set(name_norm.clone()),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            info!(%user_id, %category_id, category = %name, "category renamed");
            Category::try_from(model)
        })
    }

    /// Deletes a user or group category that no transaction refers to.
    ///
    /// Soft deleted transactions still hold their category, so they count
    /// as references too.
    pub async fn delete_category(&self, user_id: Uuid, category_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, "delete category", |db_tx| {
            let category = self
                .require_category_editor(&db_tx, user_id, category_id)
                .await?;

            let references = transactions::Entity::find()
                .filter(transactions::Column::CategoryId.eq(category.id))
                .count(&db_tx)
                .await?;
            if references > 0 {
                warn!(%category_id, references, "category still in use");
                return Err(EngineError::Conflict("category is in use".to_string()));
            }

            categories::Entity::delete_by_id(category.id)
                .exec(&db_tx)
                .await?;
            info!(%user_id, %category_id, "category deleted");
            Ok(())
        })
    }

    /// Loads a category the actor may change.
    ///
    /// Categories the actor cannot see are `KeyNotFound`, visible ones they
    /// may not change (global defaults, group categories for non-admins)
    /// are `Forbidden`.
    async fn require_category_editor(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
        category_id: Uuid,
    ) -> ResultEngine<Category> {
        let category = self.category_by_id(db_tx, category_id).await?;
        match category.scope {
            CategoryScope::Global => Err(EngineError::unauthorized()),
            CategoryScope::User(owner_id) if owner_id == user_id => Ok(category),
            CategoryScope::User(_) => Err(category_not_found()),
            CategoryScope::Group(group_id) => match self.group_role(db_tx, group_id, user_id).await? {
                None => Err(category_not_found()),
                Some(role) if role.can_manage_members() => Ok(category),
                Some(_) => Err(EngineError::unauthorized()),
            },
        }
    }

    /// Finds the category named `name_norm` inside exactly one scope.
    async fn scoped_category_by_key(
        &self,
        db_tx: &DatabaseTransaction,
        scope: CategoryScope,
        name_norm: &str,
    ) -> ResultEngine<Option<categories::Model>> {
        let query = categories::Entity::find().filter(categories::Column::NameNorm.eq(name_norm));
        let query = match scope {
            CategoryScope::User(owner_id) => query.filter(categories::Column::UserId.eq(owner_id)),
            CategoryScope::Group(group_id) => query.filter(categories::Column::GroupId.eq(group_id)),
            CategoryScope::Global => query
                .filter(categories::Column::UserId.is_null())
                .filter(categories::Column::GroupId.is_null()),
        };
        Ok(query.one(db_tx).await?)
    }
}
