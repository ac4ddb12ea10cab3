//! Result rendering for the terminal.

use anyhow::Result;
use flurry_sql::ExecutionResult;
use serde_json::json;

/// Print a result as pretty JSON or as the text table.
pub fn print_result(result: &ExecutionResult, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        println!("{}", result.to_string().trim_end());
    }
    Ok(())
}

/// Print a one-line acknowledgement.
pub fn print_ack(handle: &str, message: &str, as_json: bool) -> Result<()> {
    if as_json {
        let value = json!({ "statementHandle": handle, "message": message });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{handle}: {message}");
    }
    Ok(())
}
