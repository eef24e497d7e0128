//! Product categories.

use serde::Serialize;

use bazaar_core::CategoryId;

/// Longest accepted category name, in characters.
pub const MAX_CATEGORY_NAME_LENGTH: usize = 32;

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Trim and check a category name.
///
/// # Errors
///
/// Returns a message suitable for a 400 response if the name is blank or
/// longer than [`MAX_CATEGORY_NAME_LENGTH`].
pub fn normalize_category_name(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("Name is required".to_owned());
    }
    if name.chars().count() > MAX_CATEGORY_NAME_LENGTH {
        return Err(format!(
            "Name must be at most {MAX_CATEGORY_NAME_LENGTH} characters"
        ));
    }
    Ok(name.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_trimmed() {
        assert_eq!(normalize_category_name("  Shoes ").unwrap(), "Shoes");
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(normalize_category_name("   ").is_err());
    }

    #[test]
    fn test_length_counts_characters() {
        assert!(normalize_category_name(&"é".repeat(32)).is_ok());
        assert!(normalize_category_name(&"a".repeat(33)).is_err());
    }
}
