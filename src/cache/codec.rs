//! Serialization of cached values.
//!
//! Every payload is one variant of a closed, tagged enum so readers can
//! match exhaustively. Prices and discounts travel as decimal strings.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{DishRecord, MenuAggregate, SubmenuAggregate, WholeTree};
use crate::domain::types::Discount;

use super::store::CacheError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CachedList {
    Menus(Vec<MenuAggregate>),
    Submenus(Vec<SubmenuAggregate>),
    Dishes(Vec<DishRecord>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CachedValue {
    MenuAggregate(MenuAggregate),
    SubmenuAggregate(SubmenuAggregate),
    DishRecord(DishRecord),
    ListOf(CachedList),
    WholeTree(WholeTree),
    Discount(Discount),
}

impl CachedValue {
    pub fn kind(&self) -> &'static str {
        match self {
            CachedValue::MenuAggregate(_) => "menu_aggregate",
            CachedValue::SubmenuAggregate(_) => "submenu_aggregate",
            CachedValue::DishRecord(_) => "dish_record",
            CachedValue::ListOf(CachedList::Menus(_)) => "menu_list",
            CachedValue::ListOf(CachedList::Submenus(_)) => "submenu_list",
            CachedValue::ListOf(CachedList::Dishes(_)) => "dish_list",
            CachedValue::WholeTree(_) => "whole_tree",
            CachedValue::Discount(_) => "discount",
        }
    }
}

pub fn encode(value: &CachedValue) -> Result<Bytes, CacheError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|err| CacheError::Codec(err.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<CachedValue, CacheError> {
    serde_json::from_slice(bytes).map_err(|err| CacheError::Codec(err.to_string()))
}

/// Conversion from a decoded payload back to the shape a reader expects.
///
/// Returns `None` when the payload holds a different variant.
pub trait FromCached: Sized {
    fn from_cached(value: CachedValue) -> Option<Self>;

    fn into_cached(self) -> CachedValue;
}

impl FromCached for MenuAggregate {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::MenuAggregate(inner) => Some(inner),
            _ => None,
        }
    }

    fn into_cached(self) -> CachedValue {
        CachedValue::MenuAggregate(self)
    }
}

impl FromCached for SubmenuAggregate {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::SubmenuAggregate(inner) => Some(inner),
            _ => None,
        }
    }

    fn into_cached(self) -> CachedValue {
        CachedValue::SubmenuAggregate(self)
    }
}

impl FromCached for DishRecord {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::DishRecord(inner) => Some(inner),
            _ => None,
        }
    }

    fn into_cached(self) -> CachedValue {
        CachedValue::DishRecord(self)
    }
}

impl FromCached for Vec<MenuAggregate> {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::ListOf(CachedList::Menus(inner)) => Some(inner),
            _ => None,
        }
    }

    fn into_cached(self) -> CachedValue {
        CachedValue::ListOf(CachedList::Menus(self))
    }
}

impl FromCached for Vec<SubmenuAggregate> {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::ListOf(CachedList::Submenus(inner)) => Some(inner),
            _ => None,
        }
    }

    fn into_cached(self) -> CachedValue {
        CachedValue::ListOf(CachedList::Submenus(self))
    }
}

impl FromCached for Vec<DishRecord> {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::ListOf(CachedList::Dishes(inner)) => Some(inner),
            _ => None,
        }
    }

    fn into_cached(self) -> CachedValue {
        CachedValue::ListOf(CachedList::Dishes(self))
    }
}

impl FromCached for WholeTree {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::WholeTree(inner) => Some(inner),
            _ => None,
        }
    }

    fn into_cached(self) -> CachedValue {
        CachedValue::WholeTree(self)
    }
}

impl FromCached for Discount {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Discount(inner) => Some(inner),
            _ => None,
        }
    }

    fn into_cached(self) -> CachedValue {
        CachedValue::Discount(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{MenuTree, SubmenuTree};
    use crate::domain::types::{DishId, MenuId, SubmenuId};

    fn dish(id: &str, price: &str) -> DishRecord {
        DishRecord {
            id: DishId::from(id),
            title: format!("Dish {id}"),
            description: String::new(),
            price: price.parse().expect("price"),
        }
    }

    #[test]
    fn tree_survives_encoding_with_exact_prices() {
        let tree = WholeTree {
            menus: vec![MenuTree {
                id: MenuId::from("m1"),
                title: "My menu 1".to_string(),
                description: "desc".to_string(),
                submenus: vec![SubmenuTree {
                    id: SubmenuId::from("s1"),
                    title: "Sub".to_string(),
                    description: String::new(),
                    dishes: vec![dish("d1", "13.50"), dish("d2", "15.50343")],
                }],
            }],
        };

        let bytes = encode(&tree.clone().into_cached()).expect("encode");
        let decoded = WholeTree::from_cached(decode(&bytes).expect("decode")).expect("variant");
        assert_eq!(decoded, tree);
        assert_eq!(decoded.menus[0].submenus[0].dishes[1].price.to_string(), "15.50");
    }

    #[test]
    fn payload_is_tagged_and_prices_are_strings() {
        let bytes = encode(&dish("d1", "12.5").into_cached()).expect("encode");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(json["kind"], "dish_record");
        assert_eq!(json["value"]["price"], "12.50");
    }

    #[test]
    fn lists_carry_their_element_kind() {
        let value = vec![dish("d1", "1.00")].into_cached();
        assert_eq!(value.kind(), "dish_list");
        let bytes = encode(&value).expect("encode");
        let decoded = decode(&bytes).expect("decode");
        assert!(Vec::<SubmenuAggregate>::from_cached(decoded.clone()).is_none());
        assert_eq!(Vec::<DishRecord>::from_cached(decoded).map(|v| v.len()), Some(1));
    }

    #[test]
    fn garbage_is_a_codec_error() {
        assert!(matches!(decode(b"not json"), Err(CacheError::Codec(_))));
        assert!(matches!(
            decode(br#"{"kind":"unknown","value":1}"#),
            Err(CacheError::Codec(_))
        ));
    }
}
