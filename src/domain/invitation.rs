use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: i64,
    pub slug: String,
    pub wedding_name: String,
    pub groom_name: String,
    pub bride_name: String,
    pub wedding_date: NaiveDate,
    pub wedding_time_start: String,
    pub wedding_time_end: String,
    pub wedding_venue: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvitationRequest {
    pub wedding_name: String,
    /// Derived from the wedding name when absent.
    pub slug: Option<String>,
    pub groom_name: String,
    pub bride_name: String,
    pub wedding_date: NaiveDate,
    pub wedding_time_start: String,
    pub wedding_time_end: String,
    pub wedding_venue: String,
    pub user_id: i64,
}

/// URL-safe slug for an invitation: lowercase, alphanumerics kept,
/// everything else collapsed to single hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_and_lowercases() {
        assert_eq!(slugify("Rina & Bayu Wedding"), "rina-bayu-wedding");
        assert_eq!(slugify("  spaced   out  "), "spaced-out");
        assert_eq!(slugify("Already-Fine"), "already-fine");
    }
}
