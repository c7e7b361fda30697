use warp::{
    http::StatusCode,
    reject::{self, Rejection},
    reply::{self, json, with_header, with_status},
    Reply,
};

use crate::{
    actions::{self, RecipeFilter, Relation},
    constants::{
        RECIPE_COUNT_PER_PAGE, SHOPPING_LIST_FILENAME, SUBSCRIPTION_COUNT_PER_PAGE,
        USER_COUNT_PER_PAGE,
    },
    error::ApiError,
    form::{LoginForm, PasswordForm, RecipeForm, RegisterForm, TagForm},
    jwt::SessionData,
    pagination::PageRequest,
    schema::Uuid,
};

use super::{query_value, ApiContext};

type Query = Vec<(String, String)>;

fn page_request(query: &Query, default_limit: i64) -> Result<PageRequest, ApiError> {
    Ok(PageRequest::parse(
        query_value(query, "page"),
        query_value(query, "limit"),
        default_limit,
    )?)
}

fn viewer(session: &Option<SessionData>) -> Option<Uuid> {
    session.as_ref().map(|session| session.user_id)
}

fn no_content() -> impl Reply {
    with_status(reply::reply(), StatusCode::NO_CONTENT)
}

// Users

pub async fn register(form: RegisterForm, context: ApiContext) -> Result<impl Reply, Rejection> {
    let user = actions::register_user(&form, &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(with_status(json(&user), StatusCode::CREATED))
}

pub async fn list_users(
    session: Option<SessionData>,
    query: Query,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    let request = page_request(&query, USER_COUNT_PER_PAGE).map_err(reject::custom)?;
    let page = actions::list_users(viewer(&session), request, &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&page))
}

pub async fn get_user(
    id: Uuid,
    session: Option<SessionData>,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    let user = actions::get_profile(id, viewer(&session), &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&user))
}

pub async fn me(session: SessionData, context: ApiContext) -> Result<impl Reply, Rejection> {
    let user = actions::get_profile(session.user_id, Some(session.user_id), &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&user))
}

pub async fn set_password(
    session: SessionData,
    form: PasswordForm,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    actions::set_password(&session, &form, &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(no_content())
}

pub async fn login(form: LoginForm, context: ApiContext) -> Result<impl Reply, Rejection> {
    let token = actions::login_user(
        &form,
        context.secret.as_bytes(),
        context.session_hours,
        &context.pool,
    )
    .await
    .map_err(reject::custom)?;

    Ok(json(&serde_json::json!({ "auth_token": token })))
}

pub async fn logout(session: SessionData) -> Result<impl Reply, Rejection> {
    log::trace!("> Logout of {}", session.username);

    Ok(no_content())
}

// Tags & ingredients

pub async fn list_tags(context: ApiContext) -> Result<impl Reply, Rejection> {
    let tags = actions::list_tags_cached(&context.pool, context.cache.clone())
        .await
        .map_err(reject::custom)?;

    Ok(json(&tags))
}

pub async fn get_tag(id: Uuid, context: ApiContext) -> Result<impl Reply, Rejection> {
    let tag = actions::get_tag(id, &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&tag))
}

pub async fn create_tag(
    session: SessionData,
    form: TagForm,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    let tag = actions::create_tag(&form, &session, &context.pool, context.cache.clone())
        .await
        .map_err(reject::custom)?;

    Ok(with_status(json(&tag), StatusCode::CREATED))
}

pub async fn list_ingredients(query: Query, context: ApiContext) -> Result<impl Reply, Rejection> {
    let prefix = query_value(&query, "name")
        .filter(|name| !name.trim().is_empty())
        .map(str::to_owned);
    let ingredients =
        actions::search_ingredients_cached(prefix, &context.pool, context.cache.clone())
            .await
            .map_err(reject::custom)?;

    Ok(json(&ingredients))
}

pub async fn get_ingredient(id: Uuid, context: ApiContext) -> Result<impl Reply, Rejection> {
    let ingredient = actions::get_ingredient(id, &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&ingredient))
}

// Recipes

pub async fn list_recipes(
    session: Option<SessionData>,
    query: Query,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    let request = page_request(&query, RECIPE_COUNT_PER_PAGE).map_err(reject::custom)?;
    let filter = RecipeFilter::from_query(&query)
        .map_err(|e| reject::custom(ApiError::from(e)))?;

    let page = actions::fetch_recipes(&filter, request, viewer(&session), &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&page))
}

pub async fn get_recipe(
    id: Uuid,
    session: Option<SessionData>,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    let recipe = actions::get_recipe_detail(id, viewer(&session), &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&recipe))
}

pub async fn create_recipe(
    session: SessionData,
    form: RecipeForm,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    let recipe = actions::create_recipe(&form, &session, &context.pool)
        .await
        .map_err(reject::custom)?;
    let detail = actions::get_recipe_detail(recipe.id, Some(session.user_id), &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(with_status(json(&detail), StatusCode::CREATED))
}

pub async fn update_recipe(
    id: Uuid,
    session: SessionData,
    form: RecipeForm,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    let recipe = actions::get_recipe_mut(id, &session, &context.pool)
        .await
        .map_err(reject::custom)?;
    let recipe = actions::replace_recipe(&recipe, &form, &context.pool)
        .await
        .map_err(reject::custom)?;
    let detail = actions::get_recipe_detail(recipe.id, Some(session.user_id), &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&detail))
}

pub async fn delete_recipe(
    id: Uuid,
    session: SessionData,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    let recipe = actions::get_recipe_mut(id, &session, &context.pool)
        .await
        .map_err(reject::custom)?;
    actions::delete_recipe(&recipe, &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(no_content())
}

pub async fn link_recipe(
    relation: Relation,
    id: Uuid,
    session: SessionData,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    let recipe = actions::link_recipe(relation, id, &session, &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(with_status(json(&recipe), StatusCode::CREATED))
}

pub async fn unlink_recipe(
    relation: Relation,
    id: Uuid,
    session: SessionData,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    actions::unlink_recipe(relation, id, &session, &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(no_content())
}

pub async fn download_shopping_cart(
    session: SessionData,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    let items = actions::aggregate_shopping_list(session.user_id, &context.pool)
        .await
        .map_err(reject::custom)?;
    let text = actions::render_shopping_list(&items);

    let reply = with_header(text, "content-type", "text/plain; charset=utf-8");
    Ok(with_header(
        reply,
        "content-disposition",
        format!("attachment; filename={SHOPPING_LIST_FILENAME}"),
    ))
}

// Subscriptions

pub async fn list_subscriptions(
    session: SessionData,
    query: Query,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    let request = page_request(&query, SUBSCRIPTION_COUNT_PER_PAGE).map_err(reject::custom)?;
    let recipes_limit = actions::parse_recipes_limit(query_value(&query, "recipes_limit"))
        .map_err(|e| reject::custom(ApiError::from(e)))?;

    let page = actions::list_subscriptions(session.user_id, request, recipes_limit, &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(json(&page))
}

pub async fn subscribe(
    id: Uuid,
    session: SessionData,
    query: Query,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    let recipes_limit = actions::parse_recipes_limit(query_value(&query, "recipes_limit"))
        .map_err(|e| reject::custom(ApiError::from(e)))?;

    let subscription = actions::subscribe(id, recipes_limit, &session, &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(with_status(json(&subscription), StatusCode::CREATED))
}

pub async fn unsubscribe(
    id: Uuid,
    session: SessionData,
    context: ApiContext,
) -> Result<impl Reply, Rejection> {
    actions::unsubscribe(id, &session, &context.pool)
        .await
        .map_err(reject::custom)?;

    Ok(no_content())
}
