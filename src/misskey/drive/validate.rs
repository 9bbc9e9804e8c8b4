use std::sync::LazyLock;

use regex::Regex;

use super::interface::ItemKind;
use crate::error::{DriveError, Result};

const MIN_USER_ID_LEN: usize = 3;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_\-. ]+$").expect("name pattern compiles"));

/// Treats absent and empty strings alike.
pub fn required(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// `subject` starts the message, e.g. "Invalid folder name".
pub fn check_name(name: &str, subject: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(DriveError::BadRequest(format!(
            "{subject}. Use only letters, numbers, spaces, and the following characters: _ - ."
        )))
    }
}

pub fn check_user_id(user_id: &str) -> Result<()> {
    if user_id.chars().count() < MIN_USER_ID_LEN {
        Err(DriveError::BadRequest(format!(
            "Username must be at least {MIN_USER_ID_LEN} characters long"
        )))
    } else {
        Ok(())
    }
}

pub fn item_kind(item_type: &str) -> Result<ItemKind> {
    ItemKind::from_str(item_type)
        .ok_or_else(|| DriveError::BadRequest("Invalid item type".to_owned()))
}
