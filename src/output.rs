//! JSON output for CLI commands.

use serde::Serialize;
use serde_json::json;

use tokenward_core::error::AuthError;

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(item: &T) -> Result<(), AuthError> {
    let json = serde_json::to_string_pretty(item)?;
    println!("{}", json);
    Ok(())
}

/// Print an error as JSON on stdout, keyed by its kind
pub fn print_error(err: &AuthError) {
    let body = json!({
        "error": err.kind.to_string(),
        "message": err.message,
    });
    println!("{}", serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string()));
}
