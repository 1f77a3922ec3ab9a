use std::sync::Arc;

use crate::application::catalog::{DishService, MenuService, SubmenuService};
use crate::application::repos::HealthRepo;

#[derive(Clone)]
pub struct ApiState {
    pub menus: Arc<MenuService>,
    pub submenus: Arc<SubmenuService>,
    pub dishes: Arc<DishService>,
    pub health: Arc<dyn HealthRepo>,
}
