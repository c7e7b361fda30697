pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const USER_COUNT_PER_PAGE: i64 = 6;
pub const SUBSCRIPTION_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const USER_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const TAG_MAX_LENGTH: usize = 200;
pub const RECIPE_IMAGE_MAX_LENGTH: usize = 2 * 1024 * 1024;

pub const RESERVED_USERNAME: &str = "me";
pub const DEFAULT_TAG_COLOR: &str = "#C71585";

pub const SHOPPING_LIST_HEADER: &str = "Shopping list:";
pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

pub const TAG_CACHE_KEY: &str = "tag-cache-key";
pub const INGREDIENT_CACHE_KEY: &str = "ingredient-cache-key";
pub const CACHE_TTL_SECONDS: u64 = 60 * 60;
