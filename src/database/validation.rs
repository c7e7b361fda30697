use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use serde_json::Value;

use super::{
    error::ValidationError,
    form::{
        get_number, IngredientAmount, IngredientEntry, RecipeComposition, RecipeForm, RegisterForm,
    },
    schema::Uuid,
};
use crate::constants::{
    EMAIL_MAX_LENGTH, RECIPE_IMAGE_MAX_LENGTH, RECIPE_NAME_MAX_LENGTH, RESERVED_USERNAME,
    TAG_MAX_LENGTH, USER_MAX_LENGTH,
};

static NAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").ok());

static HEX_COLOR_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").ok());

fn matches(pattern: &LazyLock<Option<Regex>>, value: &str) -> bool {
    match &**pattern {
        Some(re) => re.is_match(value),
        None => false,
    }
}

/// Tag ids as sent by the client, for the existence lookup. Non-integers are dropped
/// here and reported by [`validate_composition`].
pub fn candidate_tag_ids(form: &RecipeForm) -> Vec<Uuid> {
    form.tags
        .iter()
        .flatten()
        .filter_map(|tag| get_number(tag))
        .collect()
}

pub fn candidate_ingredient_ids(form: &RecipeForm) -> Vec<Uuid> {
    form.ingredients
        .iter()
        .flatten()
        .filter_map(|entry| entry.id.as_ref().and_then(get_number))
        .collect()
}

/// Checks the composition part of a recipe payload against the ids known to exist.
///
/// Every field is checked and every offending entry is reported; the error is
/// returned only after all three fields were looked at.
pub fn validate_composition(
    form: &RecipeForm,
    known_tags: &HashSet<Uuid>,
    known_ingredients: &HashSet<Uuid>,
) -> Result<RecipeComposition, ValidationError> {
    let mut errors = ValidationError::new();

    let tags = validate_tags(form.tags.as_deref(), known_tags, &mut errors);
    let ingredients =
        validate_ingredients(form.ingredients.as_deref(), known_ingredients, &mut errors);
    let cooking_time = validate_cooking_time(form.cooking_time.as_ref(), &mut errors);

    errors.into_result(RecipeComposition {
        tags,
        ingredients,
        cooking_time: cooking_time.unwrap_or_default(),
    })
}

fn validate_tags(
    tags: Option<&[Value]>,
    known: &HashSet<Uuid>,
    errors: &mut ValidationError,
) -> Vec<Uuid> {
    let tags = match tags {
        Some(tags) if !tags.is_empty() => tags,
        _ => {
            errors.add("tags", "At least one tag is required");
            return vec![];
        }
    };

    let mut ids: Vec<Uuid> = Vec::with_capacity(tags.len());
    for tag in tags {
        match get_number::<Uuid>(tag) {
            Some(id) if known.contains(&id) => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            Some(id) => errors.add("tags", format!("Tag {id} doesn't exist")),
            None => errors.add("tags", format!("{tag} is not a valid tag id")),
        }
    }

    ids
}

fn validate_ingredients(
    entries: Option<&[IngredientEntry]>,
    known: &HashSet<Uuid>,
    errors: &mut ValidationError,
) -> Vec<IngredientAmount> {
    let entries = match entries {
        Some(entries) if !entries.is_empty() => entries,
        _ => {
            errors.add("ingredients", "A recipe needs at least one ingredient");
            return vec![];
        }
    };

    let mut seen: HashSet<Uuid> = HashSet::with_capacity(entries.len());
    let mut lines = Vec::with_capacity(entries.len());

    for entry in entries {
        let id = match entry.id.as_ref() {
            None | Some(Value::Null) => {
                errors.add("ingredients", "Ingredient id is required");
                continue;
            }
            Some(value) => match get_number::<Uuid>(value) {
                Some(id) => id,
                None => {
                    errors.add("ingredients", format!("{value} is not a valid ingredient id"));
                    continue;
                }
            },
        };

        if !known.contains(&id) {
            errors.add("ingredients", format!("Ingredient {id} doesn't exist"));
            continue;
        }

        if !seen.insert(id) {
            errors.add("ingredients", format!("Ingredient {id} is listed more than once"));
            continue;
        }

        match entry.amount.as_ref().and_then(get_number::<i32>) {
            Some(amount) if amount >= 1 => lines.push(IngredientAmount { id, amount }),
            _ => errors.add(
                "ingredients",
                format!("Amount of ingredient {id} must be a whole number of at least 1"),
            ),
        }
    }

    lines
}

fn validate_cooking_time(value: Option<&Value>, errors: &mut ValidationError) -> Option<i32> {
    match value.and_then(get_number::<i32>) {
        Some(minutes) if minutes >= 1 => Some(minutes),
        _ => {
            errors.add("cooking_time", "Cooking time must be a whole number of at least 1 minute");
            None
        }
    }
}

/// Scalar recipe fields; `required` is false on update where absent fields keep their value.
pub fn validate_recipe_fields(form: &RecipeForm, required: bool, errors: &mut ValidationError) {
    for (field, value) in [
        ("name", &form.name),
        ("image", &form.image),
        ("text", &form.text),
    ] {
        match value {
            None if required => errors.add(field, "This field is required"),
            Some(v) if v.trim().is_empty() => errors.add(field, "This field may not be blank"),
            _ => {}
        }
    }

    if let Some(image) = &form.image {
        if image.len() > RECIPE_IMAGE_MAX_LENGTH {
            errors.add(
                "image",
                format!("Ensure this field has no more than {RECIPE_IMAGE_MAX_LENGTH} bytes"),
            );
        }
    }
    if let Some(name) = &form.name {
        if name.chars().count() > RECIPE_NAME_MAX_LENGTH {
            errors.add(
                "name",
                format!("Ensure this field has no more than {RECIPE_NAME_MAX_LENGTH} characters"),
            );
        }
    }
}

pub fn validate_username(value: &str) -> Result<(), String> {
    if value == RESERVED_USERNAME {
        return Err(format!("Username can't be \"{RESERVED_USERNAME}\""));
    }
    if !matches(&NAME_PATTERN, value) {
        return Err(String::from("Username contains invalid characters"));
    }
    Ok(())
}

pub fn validate_real_name(value: &str) -> Result<(), String> {
    if !matches(&NAME_PATTERN, value) {
        return Err(String::from("Name contains invalid characters"));
    }
    Ok(())
}

pub fn validate_hex(value: &str) -> Result<(), String> {
    if !matches(&HEX_COLOR_PATTERN, value) {
        return Err(format!("{value} is not a valid hex color"));
    }
    Ok(())
}

pub fn validate_registration(form: &RegisterForm) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();

    if let Err(e) = validate_username(&form.username) {
        errors.add("username", e);
    }
    for (field, value) in [("first_name", &form.first_name), ("last_name", &form.last_name)] {
        if let Err(e) = validate_real_name(value) {
            errors.add(field, e);
        }
    }
    for (field, value) in [
        ("username", &form.username),
        ("first_name", &form.first_name),
        ("last_name", &form.last_name),
    ] {
        if value.chars().count() > USER_MAX_LENGTH {
            errors.add(
                field,
                format!("Ensure this field has no more than {USER_MAX_LENGTH} characters"),
            );
        }
    }

    let email = form.email.trim();
    if email.len() > EMAIL_MAX_LENGTH || !email.contains('@') || email.starts_with('@') {
        errors.add("email", "Enter a valid email address");
    }
    if form.password.is_empty() {
        errors.add("password", "This field may not be blank");
    }

    errors.into_result(())
}

pub fn validate_tag(name: &str, slug: &str, color: Option<&str>) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();

    if name.trim().is_empty() || name.chars().count() > TAG_MAX_LENGTH {
        errors.add("name", "Tag name must be between 1 and 200 characters");
    }
    if slug.is_empty() || slug.chars().count() > TAG_MAX_LENGTH || !matches(&NAME_PATTERN, slug) {
        errors.add("slug", "Enter a valid slug");
    }
    if let Some(color) = color {
        if let Err(e) = validate_hex(color) {
            errors.add("color", e);
        }
    }

    errors.into_result(())
}
