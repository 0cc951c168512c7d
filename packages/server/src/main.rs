#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Forest watch API server binary.
//!
//! Configured through `BIND_ADDR`, `PORT`, `FOREST_WATCH_CONFIG` and the
//! `AI_*` provider variables. Pass `--interactive` to be prompted for the
//! bind address, port and configuration file instead.

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if std::env::args().skip(1).any(|arg| arg == "--interactive" || arg == "-i") {
        forest_watch_server::interactive::run().await
    } else {
        forest_watch_server::run_server().await
    }
}
