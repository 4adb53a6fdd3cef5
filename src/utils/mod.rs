//! Request validation helpers shared by module handlers.

use std::fmt::Display;

/// Collects field violations so a handler can report all of them at once.
#[derive(Debug, Default)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length is counted in characters, not bytes.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.chars().count();
        if len < min || len > max {
            self.0
                .push(format!("{field} must be between {min} and {max} characters"));
        }
        self
    }

    pub fn range<T>(&mut self, field: &str, value: T, min: T, max: T) -> &mut Self
    where
        T: PartialOrd + Display,
    {
        if value < min || value > max {
            self.0.push(format!("{field} must be between {min} and {max}"));
        }
        self
    }

    pub fn at_least<T>(&mut self, field: &str, value: T, min: T) -> &mut Self
    where
        T: PartialOrd + Display,
    {
        if value < min {
            self.0.push(format!("{field} must be at least {min}"));
        }
        self
    }

    /// `Ok(())` when nothing was recorded, otherwise every message in order.
    pub fn finish(&mut self) -> Result<(), Vec<String>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_violation_in_order() {
        let errors = Violations::new()
            .length("title", "", 1, 255)
            .range("published_year", 999, 1000, 2100)
            .at_least("available_copies", -1, 0)
            .finish()
            .unwrap_err();

        assert_eq!(
            errors,
            vec![
                "title must be between 1 and 255 characters",
                "published_year must be between 1000 and 2100",
                "available_copies must be at least 0",
            ]
        );
    }

    #[test]
    fn counts_characters_not_bytes() {
        let title = "é".repeat(255);
        assert!(Violations::new()
            .length("title", &title, 1, 255)
            .finish()
            .is_ok());
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(Violations::new()
            .range("published_year", 1000, 1000, 2100)
            .range("published_year", 2100, 1000, 2100)
            .at_least("available_copies", 0, 0)
            .finish()
            .is_ok());
    }
}
