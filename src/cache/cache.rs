use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, Cmd, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{CACHE_TTL_SECONDS, INGREDIENT_CACHE_KEY, TAG_CACHE_KEY},
    error::{ApiError, CacheError},
};

// Caching - keys

#[derive(Serialize, Clone, Debug)]
pub struct CacheKey<T: ToString + Serialize> {
    _value: T,
    _type: CacheKeyType,
}

impl<T: ToString + Serialize> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self {
            _value: key,
            _type: r#type,
        }
    }

    pub fn redis_key(&self) -> String {
        match self._type {
            CacheKeyType::Tags => format!("tags-{}", self._value.to_string()),
            CacheKeyType::Ingredients => format!("ingredients-{}", self._value.to_string()),
        }
    }

    fn lifetime(&self) -> CacheLifetime {
        match self._type {
            CacheKeyType::Tags => CacheLifetime::BindTagCache,
            CacheKeyType::Ingredients => CacheLifetime::BindIngredientCache,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheKeyType {
    Tags,
    Ingredients,
}

impl CacheKeyType {
    pub fn new<T: ToString + Serialize>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

// Cache - wrappers

/// Which bind key versions a cached value. Rewriting the bind key invalidates every
/// value stored under its previous contents.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheLifetime {
    BindTagCache,
    BindIngredientCache,
}

impl CacheLifetime {
    fn bind_key(&self) -> &'static str {
        match self {
            CacheLifetime::BindTagCache => TAG_CACHE_KEY,
            CacheLifetime::BindIngredientCache => INGREDIENT_CACHE_KEY,
        }
    }

    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, ApiError> {
        get_cache_value::<&str, String>(self.bind_key(), cache).await
    }

    pub async fn validate_cache_bind(
        &self,
        bind: &Option<String>,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, ApiError> {
        Ok(bind == &self.get_cache_bind(cache).await?)
    }

    /// Drops every value bound to this lifetime.
    pub async fn invalidate(&self, cache: &mut MultiplexedConnection) -> Result<(), ApiError> {
        let bind = uuid::Uuid::new_v4().to_string();
        log::trace!("> Rebinding {} to {}", self.bind_key(), &bind);

        set_cache_value(self.bind_key(), bind, cache).await
    }
}

#[derive(Serialize, serde::Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct RedisValue<T: serde::Serialize + Send + Sync + Clone> {
    pub value: T,
    _lifetime: CacheLifetime,
    _bind: Option<String>,
}

impl<T: serde::Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>> RedisValue<T> {
    async fn new(
        value: T,
        lifetime: CacheLifetime,
        cache: &mut MultiplexedConnection,
    ) -> Result<Self, ApiError> {
        let bind = lifetime.get_cache_bind(cache).await?;

        Ok(Self {
            value,
            _lifetime: lifetime,
            _bind: bind,
        })
    }

    async fn validate(&self, cache: &mut MultiplexedConnection) -> Result<bool, ApiError> {
        self._lifetime.validate_cache_bind(&self._bind, cache).await
    }

    /// Returns the cached value for `key`, or runs `callback` and caches what it returns.
    pub async fn get_or<'a, F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<RedisValue<T>, ApiError>
    where
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'a,
    {
        let value = get_cache_value::<String, RedisValue<T>>(key.redis_key(), cache)
            .await
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.redis_key();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e}");
                    }
                });
                None
            });
        // * Cannot use .map(|| {...}) due to async closures
        let value = match value {
            Some(value) => {
                log::trace!("> Found {:?}", key.redis_key());
                match value.validate(cache).await? {
                    true => Some(value),
                    false => {
                        log::trace!("> Invalidated {:?}", key.redis_key());
                        None
                    }
                }
            }
            None => None,
        };

        match value {
            Some(value) => Ok(value),
            None => {
                log::trace!("> Fetching {:?}", key.redis_key());
                let value = callback().await?;
                let value = RedisValue::new(value, key.lifetime(), cache).await?;

                if let Err(e) = set_expiring_cache_value::<String, RedisValue<T>>(
                    key.redis_key(),
                    value.clone(),
                    CACHE_TTL_SECONDS,
                    cache,
                )
                .await
                {
                    log::error!("{e:?}");
                }

                Ok(value)
            }
        }
    }
}

/// Runs `callback` through the cache when one is configured. Cache failures are logged
/// and the value is fetched directly.
pub async fn cached<T, F, Fut, K>(
    cache: Option<MultiplexedConnection>,
    key: CacheKey<K>,
    callback: F,
) -> Result<T, ApiError>
where
    T: serde::Serialize + Send + Sync + Clone + for<'a> Deserialize<'a>,
    K: ToString + Serialize + Clone + Send + Sync,
    F: Fn() -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    match cache {
        Some(mut cache) => {
            let fallback = callback.clone();
            match RedisValue::get_or(key, &mut cache, callback).await {
                Ok(value) => Ok(value.value),
                Err(ApiError::Cache(e)) => {
                    log::warn!("Cache unavailable, reading from the database: {e}");
                    fallback().await
                }
                Err(e) => Err(e),
            }
        }
        None => callback().await,
    }
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), ApiError> {
    let _: () = cache
        .set(key, value)
        .await
        .map_err(CacheError::from)?;

    Ok(())
}

fn expiring_set_command<K: ToRedisArgs, V: ToRedisArgs>(key: K, value: V, seconds: u64) -> Cmd {
    let mut command = redis::cmd("SET");
    command.arg(key).arg(value).arg("EX").arg(seconds);
    command
}

/// Cached values expire so that keys orphaned by a rebind do not pile up.
pub async fn set_expiring_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    seconds: u64,
    cache: &mut MultiplexedConnection,
) -> Result<(), ApiError> {
    let _: () = expiring_set_command(key, value, seconds)
        .query_async(cache)
        .await
        .map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), ApiError> {
    let _: () = cache.del(key).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, ApiError> {
    let value: Option<V> = cache.get(key).await.map_err(CacheError::from)?;

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_by_type() {
        assert_eq!(CacheKeyType::Tags.new("all").redis_key(), "tags-all");
        assert_eq!(
            CacheKeyType::Ingredients.new(String::from("sug")).redis_key(),
            "ingredients-sug"
        );
    }

    #[test]
    fn keys_bind_to_their_family() {
        assert_eq!(
            CacheKeyType::Tags.new("all").lifetime(),
            CacheLifetime::BindTagCache
        );
        assert_eq!(
            CacheKeyType::Ingredients.new("x").lifetime().bind_key(),
            INGREDIENT_CACHE_KEY
        );
    }

    #[test]
    fn cached_values_are_written_with_an_expiry() {
        let command = expiring_set_command("tags-all", "[]", 3600);

        assert_eq!(
            command.get_packed_command(),
            b"*5\r\n$3\r\nSET\r\n$8\r\ntags-all\r\n$2\r\n[]\r\n$2\r\nEX\r\n$4\r\n3600\r\n"
        );
    }
}
