use std::convert::Infallible;

use warp::{reject::Rejection, Filter, Reply};

use crate::{
    actions::Relation,
    middleware::{with_possible_session, with_session},
    schema::Uuid,
};

use super::{handle_rejection, handlers, with_context, with_query, ApiContext};

// Recipe payloads may carry an inline image of up to RECIPE_IMAGE_MAX_LENGTH bytes
const MAX_BODY_SIZE: u64 = 4 * 1024 * 1024;

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn with_relation(
    relation: Relation,
) -> impl Filter<Extract = (Relation,), Error = Infallible> + Clone {
    warp::any().map(move || relation)
}

fn user_routes(
    context: ApiContext,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let secret = context.secret.clone();

    let register = warp::path!("api" / "users")
        .and(warp::post())
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(handlers::register);

    let list = warp::path!("api" / "users")
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_query())
        .and(with_context(context.clone()))
        .and_then(handlers::list_users);

    let me = warp::path!("api" / "users" / "me")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(handlers::me);

    let set_password = warp::path!("api" / "users" / "set_password")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(handlers::set_password);

    let subscriptions = warp::path!("api" / "users" / "subscriptions")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_query())
        .and(with_context(context.clone()))
        .and_then(handlers::list_subscriptions);

    let subscribe = warp::path!("api" / "users" / Uuid / "subscribe")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_query())
        .and(with_context(context.clone()))
        .and_then(handlers::subscribe);

    let unsubscribe = warp::path!("api" / "users" / Uuid / "subscribe")
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(handlers::unsubscribe);

    let profile = warp::path!("api" / "users" / Uuid)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(handlers::get_user);

    let login = warp::path!("api" / "auth" / "token" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_context(context))
        .and_then(handlers::login);

    let logout = warp::path!("api" / "auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(secret))
        .and_then(handlers::logout);

    register
        .or(list)
        .or(me)
        .or(set_password)
        .or(subscriptions)
        .or(subscribe)
        .or(unsubscribe)
        .or(profile)
        .or(login)
        .or(logout)
}

fn catalog_routes(
    context: ApiContext,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let tags = warp::path!("api" / "tags")
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(handlers::list_tags);

    let tag = warp::path!("api" / "tags" / Uuid)
        .and(warp::get())
        .and(with_context(context.clone()))
        .and_then(handlers::get_tag);

    let create_tag = warp::path!("api" / "tags")
        .and(warp::post())
        .and(with_session(context.secret.clone()))
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(handlers::create_tag);

    let ingredients = warp::path!("api" / "ingredients")
        .and(warp::get())
        .and(with_query())
        .and(with_context(context.clone()))
        .and_then(handlers::list_ingredients);

    let ingredient = warp::path!("api" / "ingredients" / Uuid)
        .and(warp::get())
        .and(with_context(context))
        .and_then(handlers::get_ingredient);

    tags.or(tag).or(create_tag).or(ingredients).or(ingredient)
}

fn recipe_routes(
    context: ApiContext,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let secret = context.secret.clone();

    let download = warp::path!("api" / "recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(handlers::download_shopping_cart);

    let list = warp::path!("api" / "recipes")
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_query())
        .and(with_context(context.clone()))
        .and_then(handlers::list_recipes);

    let create = warp::path!("api" / "recipes")
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(handlers::create_recipe);

    let detail = warp::path!("api" / "recipes" / Uuid)
        .and(warp::get())
        .and(with_possible_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(handlers::get_recipe);

    let update = warp::path!("api" / "recipes" / Uuid)
        .and(warp::patch())
        .and(with_session(secret.clone()))
        .and(json_body())
        .and(with_context(context.clone()))
        .and_then(handlers::update_recipe);

    let delete = warp::path!("api" / "recipes" / Uuid)
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(handlers::delete_recipe);

    let favorite = with_relation(Relation::Favorite)
        .and(warp::path!("api" / "recipes" / Uuid / "favorite"))
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(handlers::link_recipe);

    let unfavorite = with_relation(Relation::Favorite)
        .and(warp::path!("api" / "recipes" / Uuid / "favorite"))
        .and(warp::delete())
        .and(with_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(handlers::unlink_recipe);

    let add_to_cart = with_relation(Relation::ShoppingCart)
        .and(warp::path!("api" / "recipes" / Uuid / "shopping_cart"))
        .and(warp::post())
        .and(with_session(secret.clone()))
        .and(with_context(context.clone()))
        .and_then(handlers::link_recipe);

    let remove_from_cart = with_relation(Relation::ShoppingCart)
        .and(warp::path!("api" / "recipes" / Uuid / "shopping_cart"))
        .and(warp::delete())
        .and(with_session(secret))
        .and(with_context(context))
        .and_then(handlers::unlink_recipe);

    download
        .or(list)
        .or(create)
        .or(detail)
        .or(update)
        .or(delete)
        .or(favorite)
        .or(unfavorite)
        .or(add_to_cart)
        .or(remove_from_cart)
}

/// Every route of the API with rejections turned into JSON error responses.
pub fn routes(
    context: ApiContext,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    user_routes(context.clone())
        .or(catalog_routes(context.clone()))
        .or(recipe_routes(context))
        .recover(handle_rejection)
        .with(warp::log("foodgram::api"))
}
