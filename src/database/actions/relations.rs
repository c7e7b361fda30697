use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::ApiError,
    jwt::SessionData,
    schema::{RecipeShort, Subscription, Uuid},
};

use super::{get_recipe, get_subscription, get_user_by_id};

/// Link records toggled by a session on some object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Favorite,
    ShoppingCart,
    Follow,
}

impl Relation {
    /// Table, subject column and object column.
    fn columns(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            Relation::Favorite => ("favorites", "user_id", "recipe_id"),
            Relation::ShoppingCart => ("shopping_cart", "owner_id", "recipe_id"),
            Relation::Follow => ("subscriptions", "user_id", "author_id"),
        }
    }

    fn action(&self) -> ActionType {
        match self {
            Relation::Favorite => ActionType::ManageOwnFavorites,
            Relation::ShoppingCart => ActionType::ManageOwnCart,
            Relation::Follow => ActionType::ManageSubscriptions,
        }
    }

    fn already_exists(&self) -> ApiError {
        ApiError::AlreadyExists(match self {
            Relation::Favorite => "Recipe is already in favorites",
            Relation::ShoppingCart => "Recipe is already in the shopping cart",
            Relation::Follow => "You are already subscribed to this author",
        })
    }

    fn not_found(&self) -> ApiError {
        ApiError::NotFound(match self {
            Relation::Favorite => "Recipe is not in favorites",
            Relation::ShoppingCart => "Recipe is not in the shopping cart",
            Relation::Follow => "You are not subscribed to this author",
        })
    }

    /// Rejects links that can never exist, before the store is touched.
    pub fn guard(&self, subject: Uuid, object: Uuid) -> Result<(), ApiError> {
        if *self == Relation::Follow && subject == object {
            return Err(ApiError::SelfFollow);
        }
        Ok(())
    }

    pub fn authorize(&self, session: &SessionData) -> Result<(), ApiError> {
        session
            .authenticate(self.action())
            .map_err(|_| ApiError::Forbidden)
    }
}

/// Creates the link `subject -> object`, failing with `AlreadyExists` if it is there.
pub async fn add_relation(
    relation: Relation,
    subject: Uuid,
    object: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    relation.guard(subject, object)?;

    let (table, subject_column, object_column) = relation.columns();
    let result = sqlx::query(&format!(
        "INSERT INTO {table} ({subject_column}, {object_column}) VALUES ($1, $2) ON CONFLICT DO NOTHING"
    ))
    .bind(subject)
    .bind(object)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(relation.already_exists());
    }

    Ok(())
}

/// Deletes the link `subject -> object`, failing with `NotFound` if there is none.
pub async fn remove_relation(
    relation: Relation,
    subject: Uuid,
    object: Uuid,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    relation.guard(subject, object)?;

    let (table, subject_column, object_column) = relation.columns();
    let result = sqlx::query(&format!(
        "DELETE FROM {table} WHERE {subject_column} = $1 AND {object_column} = $2"
    ))
    .bind(subject)
    .bind(object)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(relation.not_found());
    }

    Ok(())
}

pub async fn link_recipe(
    relation: Relation,
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, ApiError> {
    relation.authorize(session)?;
    let recipe = get_recipe(recipe_id, pool).await?;

    add_relation(relation, session.user_id, recipe.id, pool).await?;

    Ok(RecipeShort::from(&recipe))
}

pub async fn unlink_recipe(
    relation: Relation,
    recipe_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    relation.authorize(session)?;
    let recipe = get_recipe(recipe_id, pool).await?;

    remove_relation(relation, session.user_id, recipe.id, pool).await
}

pub async fn subscribe(
    author_id: Uuid,
    recipes_limit: Option<i64>,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Subscription, ApiError> {
    Relation::Follow.guard(session.user_id, author_id)?;
    Relation::Follow.authorize(session)?;
    get_user_by_id(pool, author_id)
        .await?
        .ok_or(ApiError::Missing("No user exists with specified id"))?;

    add_relation(Relation::Follow, session.user_id, author_id, pool).await?;

    get_subscription(author_id, recipes_limit, pool).await
}

pub async fn unsubscribe(
    author_id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    Relation::Follow.guard(session.user_id, author_id)?;
    Relation::Follow.authorize(session)?;
    get_user_by_id(pool, author_id)
        .await?
        .ok_or(ApiError::Missing("No user exists with specified id"))?;

    remove_relation(Relation::Follow, session.user_id, author_id, pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::schema::UserRole;

    fn session(user_id: Uuid) -> SessionData {
        SessionData {
            user_id,
            username: String::from("anna"),
            user_role: UserRole::User,
            is_admin: false,
        }
    }

    #[test]
    fn only_following_yourself_is_guarded() {
        assert!(matches!(
            Relation::Follow.guard(4, 4),
            Err(ApiError::SelfFollow)
        ));
        assert!(Relation::Follow.guard(4, 5).is_ok());
        assert!(Relation::Favorite.guard(4, 4).is_ok());
    }

    #[tokio::test]
    async fn self_follow_fails_without_touching_the_store() {
        // Never connects: the guard runs first.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();

        let added = add_relation(Relation::Follow, 9, 9, &pool).await;
        let removed = unsubscribe(9, &session(9), &pool).await;
        let subscribed = subscribe(9, None, &session(9), &pool).await;

        assert!(matches!(added, Err(ApiError::SelfFollow)));
        assert!(matches!(removed, Err(ApiError::SelfFollow)));
        assert!(matches!(subscribed, Err(ApiError::SelfFollow)));
    }

    #[test]
    fn toggles_report_their_own_messages() {
        assert_eq!(
            Relation::ShoppingCart.already_exists().to_string(),
            "Recipe is already in the shopping cart"
        );
        assert_eq!(
            Relation::Favorite.not_found().to_string(),
            "Recipe is not in favorites"
        );
    }
}
