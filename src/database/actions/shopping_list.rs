use std::collections::BTreeMap;

use sqlx::{Pool, Postgres};

use crate::{
    constants::SHOPPING_LIST_HEADER,
    error::ApiError,
    schema::{ShoppingListItem, ShoppingListPart, Uuid},
};

/// Sums amounts per exact `(name, measurement_unit)`, ordered by name then unit.
pub fn aggregate_parts(parts: Vec<ShoppingListPart>) -> Vec<ShoppingListItem> {
    let mut groups: BTreeMap<(String, String), i64> = BTreeMap::new();

    for part in parts {
        *groups.entry((part.name, part.measurement_unit)).or_insert(0) += i64::from(part.amount);
    }

    groups
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingListItem {
            name,
            measurement_unit,
            amount,
        })
        .collect()
}

pub fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    let mut text = format!("{SHOPPING_LIST_HEADER}\n\n");

    for item in items {
        text.push_str(&format!(
            "{}: {} {}\n",
            item.name, item.amount, item.measurement_unit
        ));
    }

    text
}

/// Every ingredient needed for the recipes in `owner_id`'s cart.
pub async fn aggregate_shopping_list(
    owner_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListItem>, ApiError> {
    let in_cart: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shopping_cart WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

    if in_cart.0 == 0 {
        return Err(ApiError::EmptyCart);
    }

    let parts: Vec<ShoppingListPart> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.owner_id = $1
    ",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(aggregate_parts(parts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(name: &str, unit: &str, amount: i32) -> ShoppingListPart {
        ShoppingListPart {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
            amount,
        }
    }

    fn item(name: &str, unit: &str, amount: i64) -> ShoppingListItem {
        ShoppingListItem {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
            amount,
        }
    }

    #[test]
    fn amounts_are_summed_across_recipes() {
        // Recipe A: flour 200 g, sugar 50 g. Recipe B: flour 300 g.
        let items = aggregate_parts(vec![
            part("flour", "g", 200),
            part("sugar", "g", 50),
            part("flour", "g", 300),
        ]);

        assert_eq!(items, vec![item("flour", "g", 500), item("sugar", "g", 50)]);
    }

    #[test]
    fn groups_are_split_by_unit_and_case() {
        let items = aggregate_parts(vec![
            part("milk", "ml", 100),
            part("milk", "l", 1),
            part("Milk", "ml", 5),
            part("milk", "ml", 50),
        ]);

        assert_eq!(
            items,
            vec![
                item("Milk", "ml", 5),
                item("milk", "l", 1),
                item("milk", "ml", 150),
            ]
        );
    }

    #[test]
    fn sums_do_not_overflow_i32() {
        let items = aggregate_parts(vec![part("salt", "g", i32::MAX), part("salt", "g", 1)]);

        assert_eq!(items[0].amount, i64::from(i32::MAX) + 1);
    }

    #[test]
    fn rendered_list_has_header_and_one_line_per_group() {
        let text = render_shopping_list(&[item("flour", "g", 500), item("sugar", "g", 50)]);

        assert_eq!(text, "Shopping list:\n\nflour: 500 g\nsugar: 50 g\n");
        assert_eq!(render_shopping_list(&[]), "Shopping list:\n\n");
    }
}
