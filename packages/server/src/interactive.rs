//! Interactive mode for the server.
//!
//! Prompts for bind address, port and configuration file before starting
//! the server.

use dialoguer::{Confirm, Input};

use crate::config::{CONFIG_ENV, DEFAULT_PORT};

/// Runs the server in interactive mode, prompting for configuration.
///
/// Asks the user for a bind address, port and optional configuration
/// file, sets the corresponding environment variables (`BIND_ADDR`,
/// `PORT`, `FOREST_WATCH_CONFIG`), and delegates to
/// [`super::run_server`].
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("Forest Watch Server");
    println!();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default("127.0.0.1".to_string())
        .interact_text()
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port_str: String = Input::new()
        .with_prompt("Port")
        .default(DEFAULT_PORT.to_string())
        .validate_with(|input: &String| -> Result<(), &'static str> {
            input
                .parse::<u16>()
                .map(|_| ())
                .map_err(|_| "Port must be a number between 0 and 65535")
        })
        .interact_text()
        .unwrap_or_else(|_| DEFAULT_PORT.to_string());

    let config_path: String = Input::new()
        .with_prompt("Configuration file (blank for built-in defaults)")
        .allow_empty(true)
        .default(std::env::var(CONFIG_ENV).unwrap_or_default())
        .interact_text()
        .unwrap_or_default();

    // SAFETY: We are single-threaded at this point (before server starts) and
    // these variables are only read once during server initialisation.
    unsafe {
        std::env::set_var("BIND_ADDR", &bind_addr);
        std::env::set_var("PORT", &port_str);
        if !config_path.trim().is_empty() {
            std::env::set_var(CONFIG_ENV, config_path.trim());
        }
    }

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port_str}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server().await
}
