//! Cache-aside catalog services.
//!
//! Reads check the cache first and fall back to the store of record,
//! validating the ancestor chain (menu, then submenu, then dish) before any
//! row is trusted. Writes validate the same chain, commit, then publish the
//! mutation so the invalidation fan-out runs after the commit.

mod ancestry;
mod discounts;
mod dishes;
mod error;
mod menus;
mod submenus;

pub use ancestry::Ancestry;
pub use discounts::Discounts;
pub use dishes::{CreateDishCommand, DishService, UpdateDishCommand};
pub use error::CatalogError;
pub use menus::{CreateMenuCommand, MenuService, UpdateMenuCommand};
pub use submenus::{CreateSubmenuCommand, SubmenuService, UpdateSubmenuCommand};

use crate::cache::SEPARATOR;
use crate::domain::error::DomainError;

/// Client-supplied ids become cache key segments, so they must be non-empty
/// and free of the key separator.
pub(crate) fn ensure_valid_id(id: &str, field: &'static str) -> Result<(), DomainError> {
    if id.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    if id.contains(SEPARATOR) {
        return Err(DomainError::validation(format!(
            "{field} must not contain `{SEPARATOR}`"
        )));
    }
    Ok(())
}
