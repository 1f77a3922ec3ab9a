use serde::{Deserialize, Serialize};

use crate::application::catalog::{
    CreateDishCommand, CreateMenuCommand, CreateSubmenuCommand, UpdateDishCommand,
    UpdateMenuCommand, UpdateSubmenuCommand,
};
use crate::domain::types::{Discount, DishId, MenuId, Price, SubmenuId};

#[derive(Debug, Deserialize)]
pub struct MenuCreateRequest {
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl From<MenuCreateRequest> for CreateMenuCommand {
    fn from(request: MenuCreateRequest) -> Self {
        Self {
            id: request.id.map(MenuId::new),
            title: request.title,
            description: request.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MenuUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl From<MenuUpdateRequest> for UpdateMenuCommand {
    fn from(request: MenuUpdateRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmenuCreateRequest {
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl From<SubmenuCreateRequest> for CreateSubmenuCommand {
    fn from(request: SubmenuCreateRequest) -> Self {
        Self {
            id: request.id.map(SubmenuId::new),
            title: request.title,
            description: request.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmenuUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl From<SubmenuUpdateRequest> for UpdateSubmenuCommand {
    fn from(request: SubmenuUpdateRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
        }
    }
}

/// Prices arrive as decimal strings (`"12.50"`) and are rounded to cents on parse.
#[derive(Debug, Deserialize)]
pub struct DishCreateRequest {
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
}

impl From<DishCreateRequest> for CreateDishCommand {
    fn from(request: DishCreateRequest) -> Self {
        Self {
            id: request.id.map(DishId::new),
            title: request.title,
            description: request.description,
            price: request.price,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DishUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
}

impl From<DishUpdateRequest> for UpdateDishCommand {
    fn from(request: DishUpdateRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            price: request.price,
        }
    }
}

/// Accepts either `"15"` or `15`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DecimalInput {
    Text(String),
    Number(serde_json::Number),
}

impl DecimalInput {
    pub fn as_text(&self) -> String {
        match self {
            DecimalInput::Text(text) => text.clone(),
            DecimalInput::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DiscountRequest {
    pub discount: DecimalInput,
}

impl DiscountRequest {
    pub fn parse(&self) -> Result<Discount, String> {
        self.discount
            .as_text()
            .parse()
            .map_err(|err| format!("discount must be a percentage between 0 and 100: {err}"))
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub status: bool,
    pub message: String,
}

impl DeleteResponse {
    pub fn deleted(entity: &str) -> Self {
        Self {
            status: true,
            message: format!("The {entity} has been deleted"),
        }
    }
}
