use std::path::PathBuf;

use cliclack::{confirm, input};

const DEFAULT_JSON_FILENAME: &str = "conversation.json";

pub fn get_confirm(message: &str) -> std::io::Result<bool> {
    confirm(message).initial_value(false).interact()
}

pub fn get_user_input(message: &str, default_value: &str) -> std::io::Result<String> {
    input(message)
        .placeholder(default_value)
        .default_input(default_value)
        .interact()
}

/// Ask whether to keep the transcript, and where. `None` when the user declines.
pub fn ask_json_save_path() -> std::io::Result<Option<PathBuf>> {
    if !get_confirm("Save conversation as JSON?")? {
        return Ok(None);
    }
    let filename = get_user_input("Enter JSON filename", DEFAULT_JSON_FILENAME)?;
    let filename = filename.trim();
    if filename.is_empty() {
        return Ok(Some(PathBuf::from(DEFAULT_JSON_FILENAME)));
    }
    Ok(Some(PathBuf::from(filename)))
}
