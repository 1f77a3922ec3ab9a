//! Cache key derivation.
//!
//! Keys are the ancestor chain of an entity joined with `/`, followed by an
//! optional type discriminator. Identifiers never contain `/`; the write
//! services reject such ids before they reach the store.

use std::fmt;

use crate::domain::types::{DishId, MenuId, SubmenuId};

pub const SEPARATOR: char = '/';

const ALL_MENUS: &str = "all_menus";
const WHOLE_TREE: &str = "all_menus_whole";
const SUBMENUS_SUFFIX: &str = "submenus";
const DISHES_SUFFIX: &str = "dishes";
pub(crate) const DISCOUNT_SUFFIX: &str = "discount";

/// A single cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    /// `{menu_id}`
    Menu(MenuId),
    /// `all_menus`
    AllMenus,
    /// `all_menus_whole`
    WholeTree,
    /// `{menu_id}/{submenu_id}`
    Submenu(MenuId, SubmenuId),
    /// `{menu_id}/submenus`
    SubmenuList(MenuId),
    /// `{menu_id}/{submenu_id}/{dish_id}`
    Dish(MenuId, SubmenuId, DishId),
    /// `{menu_id}/{submenu_id}/dishes`
    DishList(MenuId, SubmenuId),
    /// `{dish_id}/discount`
    Discount(DishId),
}

impl CacheKey {
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheKey::Menu(_) => "menu",
            CacheKey::AllMenus => "all_menus",
            CacheKey::WholeTree => "whole_tree",
            CacheKey::Submenu(..) => "submenu",
            CacheKey::SubmenuList(_) => "submenu_list",
            CacheKey::Dish(..) => "dish",
            CacheKey::DishList(..) => "dish_list",
            CacheKey::Discount(_) => "discount",
        }
    }

    /// True when the rendered key lies inside `prefix`'s namespace.
    pub fn is_covered_by(&self, prefix: &KeyPrefix) -> bool {
        match (self, prefix) {
            (CacheKey::Menu(m), KeyPrefix::Menu(pm)) => m == pm,
            (CacheKey::Submenu(m, _), KeyPrefix::Menu(pm))
            | (CacheKey::SubmenuList(m), KeyPrefix::Menu(pm))
            | (CacheKey::Dish(m, _, _), KeyPrefix::Menu(pm))
            | (CacheKey::DishList(m, _), KeyPrefix::Menu(pm)) => m == pm,
            (CacheKey::Submenu(m, s), KeyPrefix::Submenu(pm, ps))
            | (CacheKey::Dish(m, s, _), KeyPrefix::Submenu(pm, ps))
            | (CacheKey::DishList(m, s), KeyPrefix::Submenu(pm, ps)) => m == pm && s == ps,
            _ => false,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Menu(m) => write!(f, "{m}"),
            CacheKey::AllMenus => f.write_str(ALL_MENUS),
            CacheKey::WholeTree => f.write_str(WHOLE_TREE),
            CacheKey::Submenu(m, s) => write!(f, "{m}{SEPARATOR}{s}"),
            CacheKey::SubmenuList(m) => write!(f, "{m}{SEPARATOR}{SUBMENUS_SUFFIX}"),
            CacheKey::Dish(m, s, d) => write!(f, "{m}{SEPARATOR}{s}{SEPARATOR}{d}"),
            CacheKey::DishList(m, s) => write!(f, "{m}{SEPARATOR}{s}{SEPARATOR}{DISHES_SUFFIX}"),
            CacheKey::Discount(d) => write!(f, "{d}{SEPARATOR}{DISCOUNT_SUFFIX}"),
        }
    }
}

/// The namespace owned by a menu or submenu.
///
/// Clearing a namespace removes the root key itself plus every key that
/// starts with the rendered prefix (which ends in the separator).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPrefix {
    Menu(MenuId),
    Submenu(MenuId, SubmenuId),
}

impl KeyPrefix {
    /// Exact key of the namespace owner.
    pub fn root(&self) -> CacheKey {
        match self {
            KeyPrefix::Menu(m) => CacheKey::Menu(m.clone()),
            KeyPrefix::Submenu(m, s) => CacheKey::Submenu(m.clone(), s.clone()),
        }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }

    /// True when every key under `other` is also under `self`.
    pub fn contains(&self, other: &KeyPrefix) -> bool {
        match (self, other) {
            (KeyPrefix::Menu(a), KeyPrefix::Menu(b)) => a == b,
            (KeyPrefix::Menu(a), KeyPrefix::Submenu(b, _)) => a == b,
            (KeyPrefix::Submenu(am, asub), KeyPrefix::Submenu(bm, bsub)) => {
                am == bm && asub == bsub
            }
            (KeyPrefix::Submenu(..), KeyPrefix::Menu(_)) => false,
        }
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPrefix::Menu(m) => write!(f, "{m}{SEPARATOR}"),
            KeyPrefix::Submenu(m, s) => write!(f, "{m}{SEPARATOR}{s}{SEPARATOR}"),
        }
    }
}
