use std::collections::HashMap;

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    authentication::permissions::ActionType,
    error::{ApiError, QueryError, TypeError, ValidationError},
    form::{RecipeComposition, RecipeForm},
    jwt::SessionData,
    pagination::{PageContext, PageRequest},
    schema::{
        LinkedRecipeTag, Recipe, RecipeDetail, RecipePart, RecipePartNoId, RecipeRow, Tag,
        UserProfile, Uuid,
    },
    validation::{
        candidate_ingredient_ids, candidate_tag_ids, validate_composition, validate_recipe_fields,
    },
};

use super::{existing_ingredient_ids, existing_tag_ids, list_profiles, list_recipe_tags};

const RECIPE_CONSTRAINTS: &[(&str, &str, &str)] = &[(
    "unique_author_recipename",
    "name",
    "You already have a recipe with this name",
)];

/// Recipe list filters. The relation filters only apply to a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

fn parse_flag(name: &str, value: &str) -> Result<bool, TypeError> {
    match value.trim() {
        "1" | "true" | "True" => Ok(true),
        "0" | "false" | "False" => Ok(false),
        _ => Err(TypeError::new(&format!("{name} must be 0 or 1"))),
    }
}

impl RecipeFilter {
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self, TypeError> {
        let mut filter = Self::default();

        for (key, value) in pairs {
            match key.as_str() {
                "author" => {
                    filter.author = Some(
                        value
                            .trim()
                            .parse::<Uuid>()
                            .map_err(|_| TypeError::new("author must be a user id"))?,
                    )
                }
                "tags" if !value.is_empty() => filter.tags.push(value.to_owned()),
                "is_favorited" => filter.is_favorited = parse_flag(key, value)?,
                "is_in_shopping_cart" => filter.is_in_shopping_cart = parse_flag(key, value)?,
                _ => {}
            }
        }

        Ok(filter)
    }
}

pub async fn get_recipe(id: Uuid, pool: &Pool<Postgres>) -> Result<Recipe, ApiError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.ok_or(ApiError::Missing("No recipe exists with specified id"))
}

/// Loads a recipe for modification. Only its author may modify it.
pub async fn get_recipe_mut(
    id: Uuid,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    session
        .authenticate(ActionType::ManageOwnRecipes)
        .map_err(|_| ApiError::Forbidden)?;

    let recipe = get_recipe(id, pool).await?;
    if recipe.author_id != session.user_id {
        return Err(ApiError::Forbidden);
    }

    Ok(recipe)
}

pub async fn list_recipe_parts(
    recipe_ids: &[Uuid],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, ApiError> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, ri.ingredient_id AS ingredient_id,
            i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

fn assemble_details(
    rows: Vec<RecipeRow>,
    tags: Vec<LinkedRecipeTag>,
    parts: Vec<RecipePart>,
    authors: &HashMap<Uuid, UserProfile>,
) -> Result<Vec<RecipeDetail>, ApiError> {
    let mut tags_by_recipe: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for tag in tags {
        tags_by_recipe.entry(tag.recipe_id).or_default().push(tag.into());
    }
    let mut parts_by_recipe: HashMap<Uuid, Vec<RecipePartNoId>> = HashMap::new();
    for part in parts {
        parts_by_recipe.entry(part.recipe_id).or_default().push(part.into());
    }

    rows.into_iter()
        .map(|row| {
            let author = authors.get(&row.author_id).cloned().ok_or_else(|| {
                log::error!("Author {} of recipe {} is missing", row.author_id, row.id);
                ApiError::Internal("Recipe author is missing")
            })?;

            Ok(RecipeDetail {
                id: row.id,
                tags: tags_by_recipe.remove(&row.id).unwrap_or_default(),
                author,
                ingredients: parts_by_recipe.remove(&row.id).unwrap_or_default(),
                is_favorited: row.is_favorited,
                is_in_shopping_cart: row.is_in_shopping_cart,
                name: row.name,
                image: row.image,
                text: row.text,
                cooking_time: row.cooking_time,
            })
        })
        .collect()
}

async fn load_details(
    rows: Vec<RecipeRow>,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, ApiError> {
    let recipe_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut author_ids: Vec<Uuid> = rows.iter().map(|row| row.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let tags = list_recipe_tags(&recipe_ids, pool).await?;
    let parts = list_recipe_parts(&recipe_ids, pool).await?;
    let authors = list_profiles(&author_ids, viewer, pool).await?;

    assemble_details(rows, tags, parts, &authors)
}

const RECIPE_ROW_COLUMNS: &str = "
    SELECT r.*,
        EXISTS (
            SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ";
const RECIPE_ROW_CART: &str = "
        ) AS is_favorited,
        EXISTS (
            SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.owner_id = ";

fn recipe_row_query<'a>(viewer: Option<Uuid>) -> QueryBuilder<'a, Postgres> {
    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(RECIPE_ROW_COLUMNS);
    query_builder.push_bind(viewer);
    query_builder.push(RECIPE_ROW_CART);
    query_builder.push_bind(viewer);
    query_builder.push(") AS is_in_shopping_cart, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");
    query_builder
}

/// Recipes matching `filter`, newest first.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    request: PageRequest,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeDetail>, ApiError> {
    let mut query_builder = recipe_row_query(viewer);

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ");
        query_builder.push_bind(author);
    }
    if !filter.tags.is_empty() {
        query_builder.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        );
        query_builder.push_bind(filter.tags.clone());
        query_builder.push("))");
    }
    if let Some(viewer) = viewer {
        if filter.is_favorited {
            query_builder.push(
                " AND EXISTS (SELECT 1 FROM favorites ff WHERE ff.recipe_id = r.id AND ff.user_id = ",
            );
            query_builder.push_bind(viewer);
            query_builder.push(")");
        }
        if filter.is_in_shopping_cart {
            query_builder.push(
                " AND EXISTS (SELECT 1 FROM shopping_cart cc WHERE cc.recipe_id = r.id AND cc.owner_id = ",
            );
            query_builder.push_bind(viewer);
            query_builder.push(")");
        }
    }

    query_builder.push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ");
    query_builder.push_bind(request.limit);
    query_builder.push(" OFFSET ");
    query_builder.push_bind(request.offset());

    let rows: Vec<RecipeRow> = query_builder.build_query_as().fetch_all(pool).await?;

    request.check_rows(&rows)?;
    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let details = load_details(rows, viewer, pool).await?;

    Ok(PageContext::from_rows(details, total_count, request))
}

pub async fn get_recipe_detail(
    id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<RecipeDetail, ApiError> {
    let mut query_builder = recipe_row_query(viewer);
    query_builder.push(" AND r.id = ");
    query_builder.push_bind(id);

    let row: Option<RecipeRow> = query_builder.build_query_as().fetch_optional(pool).await?;
    let row = row.ok_or(ApiError::Missing("No recipe exists with specified id"))?;

    load_details(vec![row], viewer, pool)
        .await?
        .pop()
        .ok_or(ApiError::Missing("No recipe exists with specified id"))
}

/// Runs every recipe check and returns the normalized composition.
async fn validate_recipe(
    form: &RecipeForm,
    required: bool,
    conn: &mut PgConnection,
) -> Result<RecipeComposition, ApiError> {
    let known_tags = existing_tag_ids(&candidate_tag_ids(form), &mut *conn).await?;
    let known_ingredients =
        existing_ingredient_ids(&candidate_ingredient_ids(form), &mut *conn).await?;

    let mut errors = ValidationError::new();
    validate_recipe_fields(form, required, &mut errors);

    match validate_composition(form, &known_tags, &known_ingredients) {
        Ok(composition) => Ok(errors.into_result(composition)?),
        Err(e) => {
            errors.extend(e);
            Err(errors.into())
        }
    }
}

async fn write_composition(
    recipe_id: Uuid,
    composition: &RecipeComposition,
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    if !composition.tags.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        query_builder.push_values(&composition.tags, |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });
        query_builder.build().execute(&mut *conn).await?;
    }

    if !composition.ingredients.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
        );
        query_builder.push_values(&composition.ingredients, |mut b, line| {
            b.push_bind(recipe_id)
                .push_bind(line.id)
                .push_bind(line.amount);
        });
        query_builder.build().execute(&mut *conn).await?;
    }

    Ok(())
}

/// Creates a recipe with its tags and ingredient lines in one transaction.
pub async fn create_recipe(
    form: &RecipeForm,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    session
        .authenticate(ActionType::CreateRecipes)
        .map_err(|_| ApiError::Forbidden)?;

    let mut tr = pool.begin().await?;
    let composition = validate_recipe(form, true, &mut tr).await?;

    let recipe: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(session.user_id)
    .bind(form.name.as_deref().unwrap_or_default().trim())
    .bind(form.image.as_deref().unwrap_or_default())
    .bind(form.text.as_deref().unwrap_or_default())
    .bind(composition.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(|e| QueryError::from(e).into_field_error(RECIPE_CONSTRAINTS))?;

    write_composition(recipe.id, &composition, &mut tr).await?;
    tr.commit().await?;

    log::info!("User {} created recipe {}", session.user_id, recipe.id);

    Ok(recipe)
}

/// Replaces a recipe's composition wholesale. Absent scalar fields keep their value.
pub async fn replace_recipe(
    recipe: &Recipe,
    form: &RecipeForm,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    let mut tr = pool.begin().await?;
    let composition = validate_recipe(form, false, &mut tr).await?;

    let updated: Recipe = sqlx::query_as(
        "
        UPDATE recipes
        SET name = $2, image = $3, text = $4, cooking_time = $5
        WHERE id = $1
        RETURNING *
    ",
    )
    .bind(recipe.id)
    .bind(form.name.as_deref().map(str::trim).unwrap_or(&recipe.name))
    .bind(form.image.as_deref().unwrap_or(&recipe.image))
    .bind(form.text.as_deref().unwrap_or(&recipe.text))
    .bind(composition.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(|e| QueryError::from(e).into_field_error(RECIPE_CONSTRAINTS))?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await?;
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await?;

    write_composition(recipe.id, &composition, &mut tr).await?;
    tr.commit().await?;

    Ok(updated)
}

/// Deletes a recipe; its lines, tags and link records cascade.
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF
pub async fn delete_recipe(recipe: &Recipe, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await?;

    log::info!("Deleted recipe {}", recipe.id);

    Ok(())
}
