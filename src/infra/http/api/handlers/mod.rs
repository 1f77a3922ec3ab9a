//! API handlers organized by hierarchy level.

mod dishes;
mod menus;
mod submenus;

pub use dishes::*;
pub use menus::*;
pub use submenus::*;
