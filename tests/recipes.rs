//! Scenario tests against a live Postgres. They run whenever `DATABASE_URL` is set at build time.

use foodgram::{
    add_relation, aggregate_shopping_list, create_recipe, error::ApiError, fetch_recipes,
    form::RecipeForm, form::RegisterForm, get_recipe_detail, get_recipe_mut, import_ingredients,
    jwt::SessionData, list_recipe_parts, pagination::PageRequest, register_user, remove_relation,
    replace_recipe, schema::UserRole, schema::Uuid, RecipeFilter, Relation,
};
use serde_json::json;
use sqlx::PgPool;

async fn user(pool: &PgPool, username: &str) -> SessionData {
    let profile = register_user(
        &RegisterForm {
            email: format!("{username}@example.com"),
            username: username.to_owned(),
            first_name: String::from("Test"),
            last_name: String::from("User"),
            password: String::from("correct horse battery staple"),
        },
        pool,
    )
    .await
    .unwrap();

    SessionData {
        user_id: profile.id,
        username: profile.username,
        user_role: UserRole::User,
        is_admin: false,
    }
}

async fn tag(pool: &PgPool, slug: &str, color: &str) -> Uuid {
    let row: (Uuid,) =
        sqlx::query_as("INSERT INTO tags (name, slug, color) VALUES ($1, $1, $2) RETURNING id")
            .bind(slug)
            .bind(color)
            .fetch_one(pool)
            .await
            .unwrap();
    row.0
}

async fn ingredient(pool: &PgPool, name: &str, unit: &str) -> Uuid {
    import_ingredients(&[(name.to_owned(), unit.to_owned())], pool, None)
        .await
        .unwrap();

    let row: (Uuid,) =
        sqlx::query_as("SELECT id FROM ingredients WHERE name = $1 AND measurement_unit = $2")
            .bind(name)
            .bind(unit)
            .fetch_one(pool)
            .await
            .unwrap();
    row.0
}

fn form(value: serde_json::Value) -> RecipeForm {
    serde_json::from_value(value).unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[cfg_attr(not(database_tests), ignore = "needs DATABASE_URL")]
async fn replace_swaps_the_whole_composition(pool: PgPool) {
    let author = user(&pool, "chef").await;
    let t1 = tag(&pool, "breakfast", "#E26C2D").await;
    let t2 = tag(&pool, "dinner", "#8775D2").await;
    let i1 = ingredient(&pool, "flour", "g").await;
    let i2 = ingredient(&pool, "milk", "ml").await;

    let recipe = create_recipe(
        &form(json!({
            "name": "Pancakes",
            "image": "recipes/images/pancakes.png",
            "text": "Whisk and fry.",
            "cooking_time": 20,
            "tags": [t1, t2],
            "ingredients": [{"id": i1, "amount": 2}, {"id": i2, "amount": 3}],
        })),
        &author,
        &pool,
    )
    .await
    .unwrap();

    let recipe = replace_recipe(
        &recipe,
        &form(json!({
            "cooking_time": "25",
            "tags": [t2],
            "ingredients": [{"id": i1, "amount": 5}],
        })),
        &pool,
    )
    .await
    .unwrap();

    assert_eq!(recipe.name, "Pancakes");
    assert_eq!(recipe.cooking_time, 25);

    let detail = get_recipe_detail(recipe.id, Some(author.user_id), &pool)
        .await
        .unwrap();
    let tags: Vec<Uuid> = detail.tags.iter().map(|tag| tag.id).collect();
    let lines: Vec<(Uuid, i32)> = list_recipe_parts(&[recipe.id], &pool)
        .await
        .unwrap()
        .into_iter()
        .map(|part| (part.ingredient_id, part.amount))
        .collect();

    assert_eq!(tags, vec![t2]);
    assert_eq!(lines, vec![(i1, 5)]);
}

#[sqlx::test(migrations = "./migrations")]
#[cfg_attr(not(database_tests), ignore = "needs DATABASE_URL")]
async fn failed_replace_keeps_the_previous_composition(pool: PgPool) {
    let author = user(&pool, "chef").await;
    let t1 = tag(&pool, "breakfast", "#E26C2D").await;
    let t2 = tag(&pool, "dinner", "#8775D2").await;
    let i1 = ingredient(&pool, "flour", "g").await;
    let i2 = ingredient(&pool, "milk", "ml").await;

    let recipe = create_recipe(
        &form(json!({
            "name": "Pancakes",
            "image": "recipes/images/pancakes.png",
            "text": "Whisk and fry.",
            "cooking_time": 20,
            "tags": [t1, t2],
            "ingredients": [{"id": i1, "amount": 2}, {"id": i2, "amount": 3}],
        })),
        &author,
        &pool,
    )
    .await
    .unwrap();

    let invalid = [
        json!({
            "cooking_time": 5,
            "tags": [t2],
            "ingredients": [{"id": i1, "amount": 1}, {"id": i1, "amount": 4}],
        }),
        json!({
            "cooking_time": 0,
            "tags": [t2],
            "ingredients": [{"id": i1, "amount": 5}],
        }),
        json!({
            "cooking_time": 5,
            "tags": [t2],
            "ingredients": [{"id": i1 + 1000, "amount": 5}],
        }),
        json!({
            "cooking_time": 5,
            "tags": [t2 + 1000],
            "ingredients": [{"id": i1, "amount": 5}],
        }),
    ];

    for payload in invalid {
        let result = replace_recipe(&recipe, &form(payload), &pool).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));

        let detail = get_recipe_detail(recipe.id, None, &pool).await.unwrap();
        let tags: Vec<Uuid> = detail.tags.iter().map(|tag| tag.id).collect();
        let lines: Vec<(Uuid, i32)> = list_recipe_parts(&[recipe.id], &pool)
            .await
            .unwrap()
            .into_iter()
            .map(|part| (part.ingredient_id, part.amount))
            .collect();

        assert_eq!(detail.cooking_time, 20);
        assert_eq!(tags, vec![t1, t2]);
        assert_eq!(lines, vec![(i1, 2), (i2, 3)]);
    }
}

#[sqlx::test(migrations = "./migrations")]
#[cfg_attr(not(database_tests), ignore = "needs DATABASE_URL")]
async fn page_past_the_end_is_missing(pool: PgPool) {
    let author = user(&pool, "chef").await;
    let t1 = tag(&pool, "breakfast", "#E26C2D").await;
    let i1 = ingredient(&pool, "flour", "g").await;

    create_recipe(
        &form(json!({
            "name": "Bread",
            "image": "recipes/images/bread.png",
            "text": "Knead.",
            "cooking_time": 60,
            "tags": [t1],
            "ingredients": [{"id": i1, "amount": 500}],
        })),
        &author,
        &pool,
    )
    .await
    .unwrap();

    let filter = RecipeFilter::default();
    let first = fetch_recipes(&filter, PageRequest::new(1, 6), None, &pool)
        .await
        .unwrap();
    assert_eq!(first.count, 1);

    let past = fetch_recipes(&filter, PageRequest::new(5, 6), None, &pool).await;
    assert!(matches!(past, Err(ApiError::Missing(_))));
}

#[sqlx::test(migrations = "./migrations")]
#[cfg_attr(not(database_tests), ignore = "needs DATABASE_URL")]
async fn invalid_composition_writes_nothing(pool: PgPool) {
    let author = user(&pool, "chef").await;
    let t1 = tag(&pool, "breakfast", "#E26C2D").await;
    let i1 = ingredient(&pool, "flour", "g").await;

    let result = create_recipe(
        &form(json!({
            "name": "Bread",
            "image": "recipes/images/bread.png",
            "text": "Knead.",
            "cooking_time": 0,
            "tags": [t1],
            "ingredients": [{"id": i1, "amount": 2}, {"id": i1, "amount": 3}],
        })),
        &author,
        &pool,
    )
    .await;

    match result {
        Err(ApiError::Validation(errors)) => {
            assert!(errors.has_field("ingredients"));
            assert!(errors.has_field("cooking_time"));
            assert!(!errors.has_field("tags"));
        }
        other => panic!("expected a validation error, got {other:?}"),
    }

    let recipes: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(recipes.0, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[cfg_attr(not(database_tests), ignore = "needs DATABASE_URL")]
async fn duplicate_recipe_name_is_a_name_error(pool: PgPool) {
    let author = user(&pool, "chef").await;
    let t1 = tag(&pool, "breakfast", "#E26C2D").await;
    let i1 = ingredient(&pool, "flour", "g").await;
    let payload = json!({
        "name": "Bread",
        "image": "recipes/images/bread.png",
        "text": "Knead.",
        "cooking_time": 60,
        "tags": [t1],
        "ingredients": [{"id": i1, "amount": 500}],
    });

    create_recipe(&form(payload.clone()), &author, &pool)
        .await
        .unwrap();
    let result = create_recipe(&form(payload), &author, &pool).await;

    assert!(matches!(result, Err(ApiError::Validation(e)) if e.has_field("name")));
}

#[sqlx::test(migrations = "./migrations")]
#[cfg_attr(not(database_tests), ignore = "needs DATABASE_URL")]
async fn only_the_author_may_modify(pool: PgPool) {
    let author = user(&pool, "chef").await;
    let other = user(&pool, "guest").await;
    let t1 = tag(&pool, "breakfast", "#E26C2D").await;
    let i1 = ingredient(&pool, "flour", "g").await;

    let recipe = create_recipe(
        &form(json!({
            "name": "Bread",
            "image": "recipes/images/bread.png",
            "text": "Knead.",
            "cooking_time": 60,
            "tags": [t1],
            "ingredients": [{"id": i1, "amount": 500}],
        })),
        &author,
        &pool,
    )
    .await
    .unwrap();

    assert!(get_recipe_mut(recipe.id, &author, &pool).await.is_ok());
    assert!(matches!(
        get_recipe_mut(recipe.id, &other, &pool).await,
        Err(ApiError::Forbidden)
    ));
    assert!(matches!(
        get_recipe_mut(recipe.id + 1000, &author, &pool).await,
        Err(ApiError::Missing(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[cfg_attr(not(database_tests), ignore = "needs DATABASE_URL")]
async fn shopping_list_sums_the_cart(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let t1 = tag(&pool, "baking", "#E26C2D").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let sugar = ingredient(&pool, "sugar", "g").await;

    assert!(matches!(
        aggregate_shopping_list(cook.user_id, &pool).await,
        Err(ApiError::EmptyCart)
    ));

    let a = create_recipe(
        &form(json!({
            "name": "Cake",
            "image": "recipes/images/cake.png",
            "text": "Bake.",
            "cooking_time": 40,
            "tags": [t1],
            "ingredients": [{"id": flour, "amount": 200}, {"id": sugar, "amount": 50}],
        })),
        &cook,
        &pool,
    )
    .await
    .unwrap();
    let b = create_recipe(
        &form(json!({
            "name": "Bread",
            "image": "recipes/images/bread.png",
            "text": "Knead.",
            "cooking_time": 60,
            "tags": [t1],
            "ingredients": [{"id": flour, "amount": 300}],
        })),
        &cook,
        &pool,
    )
    .await
    .unwrap();

    add_relation(Relation::ShoppingCart, cook.user_id, a.id, &pool)
        .await
        .unwrap();
    add_relation(Relation::ShoppingCart, cook.user_id, b.id, &pool)
        .await
        .unwrap();

    let items: Vec<(String, String, i64)> = aggregate_shopping_list(cook.user_id, &pool)
        .await
        .unwrap()
        .into_iter()
        .map(|item| (item.name, item.measurement_unit, item.amount))
        .collect();

    assert_eq!(
        items,
        vec![
            (String::from("flour"), String::from("g"), 500),
            (String::from("sugar"), String::from("g"), 50),
        ]
    );
}

#[sqlx::test(migrations = "./migrations")]
#[cfg_attr(not(database_tests), ignore = "needs DATABASE_URL")]
async fn toggles_report_repeated_and_missing_links(pool: PgPool) {
    let cook = user(&pool, "cook").await;
    let fan = user(&pool, "fan").await;
    let t1 = tag(&pool, "baking", "#E26C2D").await;
    let flour = ingredient(&pool, "flour", "g").await;
    let recipe = create_recipe(
        &form(json!({
            "name": "Bread",
            "image": "recipes/images/bread.png",
            "text": "Knead.",
            "cooking_time": 60,
            "tags": [t1],
            "ingredients": [{"id": flour, "amount": 300}],
        })),
        &cook,
        &pool,
    )
    .await
    .unwrap();

    add_relation(Relation::Favorite, fan.user_id, recipe.id, &pool)
        .await
        .unwrap();
    assert!(matches!(
        add_relation(Relation::Favorite, fan.user_id, recipe.id, &pool).await,
        Err(ApiError::AlreadyExists(_))
    ));

    remove_relation(Relation::Favorite, fan.user_id, recipe.id, &pool)
        .await
        .unwrap();
    assert!(matches!(
        remove_relation(Relation::Favorite, fan.user_id, recipe.id, &pool).await,
        Err(ApiError::NotFound(_))
    ));

    add_relation(Relation::Follow, fan.user_id, cook.user_id, &pool)
        .await
        .unwrap();
    assert!(matches!(
        add_relation(Relation::Follow, cook.user_id, cook.user_id, &pool).await,
        Err(ApiError::SelfFollow)
    ));
}
