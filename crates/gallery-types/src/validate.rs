use std::borrow::Cow;

use validator::ValidationError;

/// Longest file name accepted for an uploaded image.
pub const MAX_FILE_NAME_LEN: usize = 255;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Usernames are ASCII letters and digits only.
pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(error(
            "username",
            "Username must only contain letters and numbers",
        ))
    }
}

/// File names may only use letters, digits, `.`, `_` and `-`.
///
/// This runs before any store or blob interaction, so it is the only thing
/// standing between a request and the blob key space.
pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > MAX_FILE_NAME_LEN {
        return Err(error(
            "file_name",
            "File name must be between 1 and 255 characters long",
        ));
    }
    if name == "." || name == ".." {
        return Err(error("file_name", "Invalid file name"));
    }
    let allowed = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !allowed {
        return Err(error(
            "file_name",
            "File name may only contain letters, numbers, '.', '_' and '-'",
        ));
    }
    Ok(())
}
