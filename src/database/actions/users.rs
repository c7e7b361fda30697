use std::collections::HashMap;

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    error::{ApiError, QueryError, ValidationError},
    form::{LoginForm, PasswordForm, RegisterForm},
    jwt::SessionData,
    pagination::{PageContext, PageRequest},
    schema::{User, UserProfile, UserRow, Uuid},
    validation::validate_registration,
};

use sqlx::{Pool, Postgres};

const USER_CONSTRAINTS: &[(&str, &str, &str)] = &[
    ("users_email_key", "email", "A user with that email already exists"),
    ("users_username_key", "username", "A user with that username already exists"),
];

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Uuid) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Public profile of `user_id`; `is_subscribed` is relative to `viewer`.
pub async fn get_profile(
    user_id: Uuid,
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, ApiError> {
    let row: Option<UserProfile> = sqlx::query_as(
        "
        SELECT u.email, u.id, u.username, u.first_name, u.last_name,
            EXISTS (
                SELECT 1 FROM subscriptions s WHERE s.user_id = $2 AND s.author_id = u.id
            ) AS is_subscribed
        FROM users u
        WHERE u.id = $1
    ",
    )
    .bind(user_id)
    .bind(viewer)
    .fetch_optional(pool)
    .await?;

    row.ok_or(ApiError::Missing("No user exists with specified id"))
}

/// Profiles of several users at once, keyed by id.
pub async fn list_profiles(
    user_ids: &[Uuid],
    viewer: Option<Uuid>,
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, UserProfile>, ApiError> {
    let rows: Vec<UserProfile> = sqlx::query_as(
        "
        SELECT u.email, u.id, u.username, u.first_name, u.last_name,
            EXISTS (
                SELECT 1 FROM subscriptions s WHERE s.user_id = $2 AND s.author_id = u.id
            ) AS is_subscribed
        FROM users u
        WHERE u.id = ANY($1)
    ",
    )
    .bind(user_ids)
    .bind(viewer)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

pub async fn list_users(
    viewer: Option<Uuid>,
    request: PageRequest,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserProfile>, ApiError> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.email, u.id, u.username, u.first_name, u.last_name,
            EXISTS (
                SELECT 1 FROM subscriptions s WHERE s.user_id = $1 AND s.author_id = u.id
            ) AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(viewer)
    .bind(request.limit)
    .bind(request.offset())
    .fetch_all(pool)
    .await?;

    request.check_rows(&rows)?;
    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    Ok(PageContext::from_rows(rows, total_count, request).map(UserProfile::from))
}

/// Creates a user; the password is stored as an argon2 hash.
pub async fn register_user(
    form: &RegisterForm,
    pool: &Pool<Postgres>,
) -> Result<UserProfile, ApiError> {
    validate_registration(form)?;

    let password = hash_password(&form.password).map_err(|e| {
        log::error!("Failed to hash password: {e}");
        ApiError::Internal("Could not create the user")
    })?;

    let user: User = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(form.email.trim())
    .bind(&form.username)
    .bind(&form.first_name)
    .bind(&form.last_name)
    .bind(password)
    .fetch_one(pool)
    .await
    .map_err(|e| QueryError::from(e).into_field_error(USER_CONSTRAINTS))?;

    log::info!("Registered user {} ({})", user.username, user.id);

    Ok(UserProfile {
        email: user.email,
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        is_subscribed: false,
    })
}

pub async fn login_user(
    form: &LoginForm,
    secret: &[u8],
    lifetime_hours: i64,
    pool: &Pool<Postgres>,
) -> Result<String, ApiError> {
    let user = get_user_by_email(pool, form.email.trim())
        .await?
        .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    let authenticated = verify_password(&form.password, &user.password).map_err(|e| {
        log::error!("Stored password of user {} is unreadable: {e}", user.id);
        ApiError::Internal("Could not verify credentials")
    })?;
    if !authenticated {
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    generate_jwt_session(&user, secret, lifetime_hours)
}

pub async fn set_password(
    session: &SessionData,
    form: &PasswordForm,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let user = get_user_by_id(pool, session.user_id)
        .await?
        .ok_or(ApiError::Unauthorized("User no longer exists"))?;

    let mut errors = ValidationError::new();
    if form.new_password.is_empty() {
        errors.add("new_password", "This field may not be blank");
    }
    let current_matches = verify_password(&form.current_password, &user.password).unwrap_or(false);
    if !current_matches {
        errors.add("current_password", "Wrong password");
    }
    errors.into_result(())?;

    let password = hash_password(&form.new_password).map_err(|e| {
        log::error!("Failed to hash password: {e}");
        ApiError::Internal("Could not change the password")
    })?;

    sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
        .bind(user.id)
        .bind(password)
        .execute(pool)
        .await?;

    Ok(())
}
