//! CLI Output Formatting Module
//! Provides consistent, colorized output for terminal UX

use colored::Colorize;

use crate::engine::model::Entity;

pub struct CliFormatter;

impl CliFormatter {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green().bold(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue().bold(), message);
    }

    /// Print a section header
    pub fn header(title: &str) {
        println!("\n{}", title.bright_cyan().bold());
        println!("{}", "─".repeat(title.len()).bright_black());
    }

    /// Print a key-value pair
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", key.bright_white().bold(), value);
    }

    /// Print a table header
    pub fn table_header(columns: &[&str]) {
        let header = columns
            .iter()
            .map(|c| c.bright_white().bold().to_string())
            .collect::<Vec<_>>()
            .join(" │ ");
        println!("  {}", header);
        println!("  {}", "─".repeat(header.len()).bright_black());
    }

    /// Print a table row
    pub fn table_row(values: &[&str]) {
        println!("  {}", values.join(" │ "));
    }

    /// Print entities as an id/details table
    pub fn entities(entities: &[Entity]) {
        if entities.is_empty() {
            Self::info("No records found");
            return;
        }
        Self::table_header(&["id", "details"]);
        for entity in entities {
            let id = entity.id();
            let details = entity_details(entity);
            Self::table_row(&[id.as_str(), details.as_str()]);
        }
    }
}

/// One-line summary of an entity's non-id fields
pub fn entity_details(entity: &Entity) -> String {
    match entity {
        Entity::User(user) => match &user.special_action_id {
            Some(action) => format!("{} (special action {})", user.name, action),
            None => user.name.clone(),
        },
        Entity::Action(action) => action.description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::model::{Action, User};

    #[test]
    fn test_entity_details() {
        assert_eq!(entity_details(&Action::new("r1", "buy milk").into()), "buy milk");
        assert_eq!(
            entity_details(&User::new(1, "alice").with_special_action("r2").into()),
            "alice (special action r2)"
        );
    }
}
