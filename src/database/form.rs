use serde::Deserialize;
use serde_json::Value;

use super::schema::Uuid;

/// Recipe payload for both create and update.
///
/// `tags`, `ingredients` and `cooking_time` are always required; the scalar
/// fields are required on create and fall back to the stored value on update.
/// Numeric fields stay as raw JSON so that the validator can report a field
/// error instead of the whole body being rejected.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecipeForm {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<Value>,
    pub tags: Option<Vec<Value>>,
    pub ingredients: Option<Vec<IngredientEntry>>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct IngredientEntry {
    pub id: Option<Value>,
    pub amount: Option<Value>,
}

/// Validated recipe composition: tag set, ingredient lines and cooking time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeComposition {
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<IngredientAmount>,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Uuid,
    pub amount: i32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PasswordForm {
    pub new_password: String,
    pub current_password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TagForm {
    pub name: String,
    pub slug: String,
    pub color: Option<String>,
}

/// Reads an integer from a JSON number or a numeric string.
pub fn get_number<T>(value: &Value) -> Option<T>
where
    T: TryFrom<i64>,
{
    let number = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;

    T::try_from(number).ok()
}
