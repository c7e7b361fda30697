//! Enables the store-backed tests in `tests/` when a database is configured.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=DATABASE_URL");
    println!("cargo:rustc-check-cfg=cfg(database_tests)");

    if env::var_os("DATABASE_URL").is_some_and(|url| !url.is_empty()) {
        println!("cargo:rustc-cfg=database_tests");
    }
}
