use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    error::{ApiError, TypeError},
    pagination::{PageContext, PageRequest},
    schema::{AuthoredRecipeShort, RecipeShort, Subscription, SubscriptionRow, Uuid},
};

/// `recipes_limit` query value; absent means no limit.
pub fn parse_recipes_limit(value: Option<&str>) -> Result<Option<i64>, TypeError> {
    match value {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|limit| *limit >= 0)
            .map(Some)
            .ok_or_else(|| TypeError::new("recipes_limit must be a non-negative integer")),
    }
}

async fn list_authored_recipes(
    author_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, Vec<RecipeShort>>, ApiError> {
    let rows: Vec<AuthoredRecipeShort> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time
        FROM recipes
        WHERE author_id = ANY($1)
        ORDER BY pub_date DESC, id DESC
    ",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await?;

    let mut recipes: HashMap<Uuid, Vec<RecipeShort>> = HashMap::new();
    for row in rows {
        recipes.entry(row.author_id).or_default().push(row.into());
    }

    Ok(recipes)
}

fn into_subscription(
    row: SubscriptionRow,
    recipes: &mut HashMap<Uuid, Vec<RecipeShort>>,
    recipes_limit: Option<i64>,
) -> Subscription {
    let mut own = recipes.remove(&row.id).unwrap_or_default();
    if let Some(limit) = recipes_limit {
        own.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    }

    Subscription {
        email: row.email,
        id: row.id,
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        is_subscribed: true,
        recipes: own,
        recipes_count: row.recipes_count,
    }
}

/// Authors followed by `user_id`, each with their newest recipes.
pub async fn list_subscriptions(
    user_id: Uuid,
    request: PageRequest,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<Subscription>, ApiError> {
    let rows: Vec<SubscriptionRow> = sqlx::query_as(
        "
        SELECT u.email, u.id, u.username, u.first_name, u.last_name,
            (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
            COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY u.username, u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(request.limit)
    .bind(request.offset())
    .fetch_all(pool)
    .await?;

    request.check_rows(&rows)?;

    let author_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut recipes = list_authored_recipes(&author_ids, pool).await?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok(PageContext::from_rows(rows, total_count, request)
        .map(|row| into_subscription(row, &mut recipes, recipes_limit)))
}

/// Subscription view of one author, as returned after following them.
pub async fn get_subscription(
    author_id: Uuid,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Subscription, ApiError> {
    let row: Option<SubscriptionRow> = sqlx::query_as(
        "
        SELECT u.email, u.id, u.username, u.first_name, u.last_name,
            (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count,
            1::BIGINT AS count
        FROM users u
        WHERE u.id = $1
    ",
    )
    .bind(author_id)
    .fetch_optional(pool)
    .await?;

    let row = row.ok_or(ApiError::Missing("No user exists with specified id"))?;
    let mut recipes = list_authored_recipes(&[author_id], pool).await?;

    Ok(into_subscription(row, &mut recipes, recipes_limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(id: Uuid) -> RecipeShort {
        RecipeShort {
            id,
            name: format!("recipe {id}"),
            image: String::from("recipes/images/x.png"),
            cooking_time: 10,
        }
    }

    fn row(id: Uuid, recipes_count: i64) -> SubscriptionRow {
        SubscriptionRow {
            email: String::from("chef@example.com"),
            id,
            username: String::from("chef"),
            first_name: String::from("Chef"),
            last_name: String::from("Cook"),
            recipes_count,
            count: 1,
        }
    }

    #[test]
    fn recipes_limit_must_be_non_negative() {
        assert_eq!(parse_recipes_limit(None).unwrap(), None);
        assert_eq!(parse_recipes_limit(Some("0")).unwrap(), Some(0));
        assert_eq!(parse_recipes_limit(Some("3")).unwrap(), Some(3));
        assert!(parse_recipes_limit(Some("-1")).is_err());
        assert!(parse_recipes_limit(Some("three")).is_err());
    }

    #[test]
    fn recipes_are_truncated_but_counted_in_full() {
        let mut recipes = HashMap::from([(2, vec![short(9), short(8), short(7)])]);

        let subscription = into_subscription(row(2, 3), &mut recipes, Some(2));

        assert!(subscription.is_subscribed);
        assert_eq!(subscription.recipes, vec![short(9), short(8)]);
        assert_eq!(subscription.recipes_count, 3);
    }

    #[test]
    fn author_without_recipes_gets_an_empty_list() {
        let subscription = into_subscription(row(5, 0), &mut HashMap::new(), None);

        assert!(subscription.recipes.is_empty());
    }
}
