//! Blog post invariants.

use crate::domain::error::DomainError;

pub const EXCERPT_MAX_CHARS: usize = 300;

pub fn ensure_title(title: &str) -> Result<(), DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::validation("title must not be empty"));
    }
    Ok(())
}

pub fn ensure_excerpt(excerpt: &str) -> Result<(), DomainError> {
    let len = excerpt.chars().count();
    if len > EXCERPT_MAX_CHARS {
        return Err(DomainError::validation(format!(
            "excerpt is {len} characters, at most {EXCERPT_MAX_CHARS} allowed"
        )));
    }
    Ok(())
}
