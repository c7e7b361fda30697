use std::collections::HashSet;

use redis::aio::MultiplexedConnection;
use sqlx::{Executor, Pool, Postgres, QueryBuilder};

use crate::{
    cache::cache::{cached, CacheKeyType, CacheLifetime},
    error::{ApiError, TypeError},
    schema::{Ingredient, Uuid},
};

// Two binds per row
const INSERT_CHUNK_SIZE: usize = 65535 / 2;

/// `LIKE` pattern matching everything that starts with `prefix`, case folded.
pub fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.trim().to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub async fn search_ingredients(
    prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ApiError> {
    let rows: Vec<Ingredient> = match prefix {
        Some(prefix) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE LOWER(name) LIKE $1 ORDER BY name, id")
                .bind(like_prefix(prefix))
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows)
}

/// Prefix search, cached per lower-cased prefix until the next import.
pub async fn search_ingredients_cached(
    prefix: Option<String>,
    pool: &Pool<Postgres>,
    cache: Option<MultiplexedConnection>,
) -> Result<Vec<Ingredient>, ApiError> {
    let prefix = prefix.map(|p| p.trim().to_lowercase());
    let key = CacheKeyType::Ingredients.new(match &prefix {
        Some(prefix) => format!("={prefix}"),
        None => String::from("*"),
    });
    let pool = pool.clone();

    cached(cache, key, move || {
        let pool = pool.clone();
        let prefix = prefix.clone();
        async move { search_ingredients(prefix.as_deref(), &pool).await }
    })
    .await
}

pub async fn get_ingredient(id: Uuid, pool: &Pool<Postgres>) -> Result<Ingredient, ApiError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.ok_or(ApiError::Missing("No ingredient exists with specified id"))
}

/// The subset of `ids` that refer to existing ingredients.
pub async fn existing_ingredient_ids<'e, E>(
    ids: &[Uuid],
    executor: E,
) -> Result<HashSet<Uuid>, ApiError>
where
    E: Executor<'e, Database = Postgres>,
{
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(executor)
        .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

fn malformed_line(line: Option<u64>) -> TypeError {
    TypeError::new(&format!(
        "Line {}: expected \"name,measurement_unit\"",
        line.unwrap_or_default()
    ))
}

/// Parses headerless `name,measurement_unit` CSV records. Fields may be quoted.
/// Duplicate pairs are dropped, first one wins.
pub fn parse_ingredient_csv(content: &str) -> Result<Vec<(String, String)>, TypeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| malformed_line(e.position().map(|p| p.line())))?;
        let line = record.position().map(|p| p.line());
        if record.len() != 2 {
            return Err(malformed_line(line));
        }

        let row: (String, String) = record
            .deserialize(None)
            .map_err(|_| malformed_line(line))?;
        if row.0.is_empty() || row.1.is_empty() {
            return Err(malformed_line(line));
        }

        if seen.insert(row.clone()) {
            rows.push(row);
        }
    }

    Ok(rows)
}

/// Bulk-inserts ingredients, skipping pairs that already exist. Returns the number of
/// new rows.
pub async fn import_ingredients(
    rows: &[(String, String)],
    pool: &Pool<Postgres>,
    cache: Option<MultiplexedConnection>,
) -> Result<u64, ApiError> {
    let mut inserted = 0;
    let mut tr = pool.begin().await?;

    for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");

        query_builder.push_values(chunk, |mut b, (name, unit)| {
            b.push_bind(name).push_bind(unit);
        });
        query_builder.push(" ON CONFLICT DO NOTHING");

        inserted += query_builder
            .build()
            .execute(&mut *tr)
            .await?
            .rows_affected();
    }

    tr.commit().await?;

    if let Some(mut cache) = cache {
        if let Err(e) = CacheLifetime::BindIngredientCache.invalidate(&mut cache).await {
            log::warn!("Failed to invalidate ingredient cache: {e}");
        }
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_quoted_records_are_read() {
        let rows = parse_ingredient_csv("flour,g\n\"salt, sea\",g\nmilk , ml\n").unwrap();

        assert_eq!(
            rows,
            vec![
                (String::from("flour"), String::from("g")),
                (String::from("salt, sea"), String::from("g")),
                (String::from("milk"), String::from("ml")),
            ]
        );
    }

    #[test]
    fn quoted_units_and_escaped_quotes_are_unwrapped() {
        let rows =
            parse_ingredient_csv("\"salt\",\"pinch, small\"\n\"say \"\"cheese\"\"\",g\n").unwrap();

        assert_eq!(
            rows,
            vec![
                (String::from("salt"), String::from("pinch, small")),
                (String::from("say \"cheese\""), String::from("g")),
            ]
        );
    }

    #[test]
    fn duplicate_pairs_are_dropped() {
        let rows = parse_ingredient_csv("flour,g\n\nflour,g\nflour,kg\n").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], (String::from("flour"), String::from("kg")));
    }

    #[test]
    fn malformed_line_is_reported_with_its_number() {
        let error = parse_ingredient_csv("flour,g\nsugar\n").unwrap_err();

        assert!(error.to_string().starts_with("Line 2"));
        assert!(parse_ingredient_csv("flour,\n").is_err());
        assert!(parse_ingredient_csv("salt, sea,g\n").is_err());
    }

    #[test]
    fn like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("Sug"), "sug%");
        assert_eq!(like_prefix("50%_"), "50\\%\\_%");
    }
}
