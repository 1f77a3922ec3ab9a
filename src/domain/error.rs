use std::fmt;

use thiserror::Error;

/// Level of the menu hierarchy an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityLevel {
    Menu,
    Submenu,
    Dish,
}

impl EntityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityLevel::Menu => "menu",
            EntityLevel::Submenu => "submenu",
            EntityLevel::Dish => "dish",
        }
    }
}

impl fmt::Display for EntityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{level} not found")]
    NotFound { level: EntityLevel },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn not_found(level: EntityLevel) -> Self {
        Self::NotFound { level }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
