use std::collections::HashSet;

use redis::aio::MultiplexedConnection;
use sqlx::{Executor, Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    cache::cache::{cached, CacheKeyType, CacheLifetime},
    constants::DEFAULT_TAG_COLOR,
    error::{ApiError, QueryError},
    form::TagForm,
    jwt::SessionData,
    schema::{LinkedRecipeTag, Tag, Uuid},
    validation::validate_tag,
};

const TAG_CONSTRAINTS: &[(&str, &str, &str)] = &[
    ("tags_name_key", "name", "A tag with that name already exists"),
    ("tags_slug_key", "slug", "A tag with that slug already exists"),
    ("tags_color_key", "color", "A tag with that color already exists"),
];

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

pub async fn list_tags_cached(
    pool: &Pool<Postgres>,
    cache: Option<MultiplexedConnection>,
) -> Result<Vec<Tag>, ApiError> {
    let pool = pool.clone();

    cached(cache, CacheKeyType::Tags.new("all"), move || {
        let pool = pool.clone();
        async move { list_tags(&pool).await }
    })
    .await
}

pub async fn get_tag(id: Uuid, pool: &Pool<Postgres>) -> Result<Tag, ApiError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    tag.ok_or(ApiError::Missing("No tag exists with specified id"))
}

/// The subset of `ids` that refer to existing tags.
pub async fn existing_tag_ids<'e, E>(ids: &[Uuid], executor: E) -> Result<HashSet<Uuid>, ApiError>
where
    E: Executor<'e, Database = Postgres>,
{
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(executor)
        .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

pub async fn list_recipe_tags(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<LinkedRecipeTag>, ApiError> {
    let list: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

/// Creates a tag. Admin only.
pub async fn create_tag(
    form: &TagForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
    cache: Option<MultiplexedConnection>,
) -> Result<Tag, ApiError> {
    session
        .authenticate(ActionType::CreateTags)
        .map_err(|_| ApiError::Forbidden)?;

    let color = form.color.as_deref().unwrap_or(DEFAULT_TAG_COLOR);
    validate_tag(&form.name, &form.slug, Some(color))?;

    let tag: Tag =
        sqlx::query_as("INSERT INTO tags (name, slug, color) VALUES ($1, $2, $3) RETURNING *")
            .bind(form.name.trim())
            .bind(&form.slug)
            .bind(color)
            .fetch_one(pool)
            .await
            .map_err(|e| QueryError::from(e).into_field_error(TAG_CONSTRAINTS))?;

    if let Some(mut cache) = cache {
        if let Err(e) = CacheLifetime::BindTagCache.invalidate(&mut cache).await {
            log::warn!("Failed to invalidate tag cache: {e}");
        }
    }

    Ok(tag)
}
