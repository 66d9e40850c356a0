use crate::models::FileMapping;
use std::path::{Path, PathBuf};

/// Container names follow the common object-store rules: 3-63 characters of
/// lowercase letters, digits, '-' and '.', starting and ending alphanumeric.
pub const MIN_CONTAINER_NAME_LEN: usize = 3;
pub const MAX_CONTAINER_NAME_LEN: usize = 63;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// A file mapping that has passed pre-flight checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMapping {
    pub source: PathBuf,
    pub destination_key: String,
}

pub fn validate_container_name(name: &str) -> Result<(), ValidationError> {
    let len = name.len();
    if !(MIN_CONTAINER_NAME_LEN..=MAX_CONTAINER_NAME_LEN).contains(&len) {
        return Err(ValidationError {
            code: "INVALID_CONTAINER_NAME",
            message: format!(
                "Container name '{}' must be between {} and {} characters",
                name, MIN_CONTAINER_NAME_LEN, MAX_CONTAINER_NAME_LEN
            ),
        });
    }

    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.';
    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());

    if !name.chars().all(allowed) || !edge_ok(name.chars().next()) || !edge_ok(name.chars().last())
    {
        return Err(ValidationError {
            code: "INVALID_CONTAINER_NAME",
            message: format!(
                "Container name '{}' may only contain lowercase letters, digits, '-' and '.'",
                name
            ),
        });
    }

    Ok(())
}

/// Checks a single mapping: exactly one source, one destination, and the
/// source must be an existing regular file.
pub fn validate_mapping(mapping: &FileMapping) -> Result<ValidatedMapping, ValidationError> {
    let source = match mapping.src.as_slice() {
        [single] => single,
        sources => {
            return Err(ValidationError {
                code: "INVALID_MAPPING",
                message: format!(
                    "File mapping must contain exactly one source to one destination (got {} sources for '{}')",
                    sources.len(),
                    mapping.dest
                ),
            });
        }
    };

    let destination_key = mapping.dest.trim();
    if destination_key.is_empty() {
        return Err(ValidationError {
            code: "MISSING_DESTINATION",
            message: format!("File mapping for {} has no destination", source.display()),
        });
    }

    ensure_regular_file(source)?;

    Ok(ValidatedMapping {
        source: source.clone(),
        destination_key: destination_key.to_string(),
    })
}

/// Validates every mapping in order; the first violation aborts.
pub fn validate_mappings(mappings: &[FileMapping]) -> Result<Vec<ValidatedMapping>, ValidationError> {
    mappings.iter().map(validate_mapping).collect()
}

fn ensure_regular_file(path: &Path) -> Result<(), ValidationError> {
    let metadata = std::fs::metadata(path).map_err(|e| ValidationError {
        code: "SOURCE_NOT_FOUND",
        message: format!("Source {} is not accessible: {}", path.display(), e),
    })?;

    if !metadata.is_file() {
        return Err(ValidationError {
            code: "SOURCE_NOT_A_FILE",
            message: format!("Source {} is not a regular file", path.display()),
        });
    }

    Ok(())
}
