//! Shared fixtures: an in-memory store of record and a wired-up catalog.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use menu_cache::application::catalog::{Ancestry, DishService, MenuService, SubmenuService};
use menu_cache::application::repos::{
    CreateDishParams, CreateMenuParams, CreateSubmenuParams, DishesRepo, DishesWriteRepo,
    HealthRepo, MenusRepo, MenusWriteRepo, RepoError, SubmenusRepo, SubmenusWriteRepo,
    UpdateDishParams, UpdateMenuParams, UpdateSubmenuParams,
};
use menu_cache::cache::{
    CacheAside, CacheConfig, CacheError, CacheStore, CacheTrigger, DeadLetterLog,
    InvalidationConsumer, InvalidationQueue, MemoryCacheStore,
};
use menu_cache::domain::entities::{
    DishRecord, MenuAggregate, MenuRecord, MenuTree, SubmenuAggregate, SubmenuRecord,
    SubmenuTree, WholeTree,
};
use menu_cache::domain::types::{DishId, MenuId, SubmenuId};
use menu_cache::infra::http::ApiState;
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    menus: BTreeMap<MenuId, MenuRecord>,
    submenus: BTreeMap<SubmenuId, SubmenuRecord>,
    dishes: BTreeMap<DishId, (SubmenuId, DishRecord)>,
}

impl Tables {
    fn submenus_of<'a>(&'a self, menu_id: &'a MenuId) -> impl Iterator<Item = &'a SubmenuRecord> {
        self.submenus
            .values()
            .filter(move |submenu| &submenu.menu_id == menu_id)
    }

    fn dishes_of<'a>(&'a self, submenu_id: &'a SubmenuId) -> impl Iterator<Item = &'a DishRecord> {
        self.dishes
            .values()
            .filter(move |(owner, _)| owner == submenu_id)
            .map(|(_, dish)| dish)
    }

    fn menu_aggregate(&self, menu: &MenuRecord) -> MenuAggregate {
        let submenus: Vec<&SubmenuRecord> = self.submenus_of(&menu.id).collect();
        let dishes = submenus
            .iter()
            .map(|submenu| self.dishes_of(&submenu.id).count() as u64)
            .sum();
        MenuAggregate {
            id: menu.id.clone(),
            title: menu.title.clone(),
            description: menu.description.clone(),
            submenus_count: submenus.len() as u64,
            dishes_count: dishes,
        }
    }

    fn submenu_aggregate(&self, submenu: &SubmenuRecord) -> SubmenuAggregate {
        SubmenuAggregate {
            id: submenu.id.clone(),
            title: submenu.title.clone(),
            description: submenu.description.clone(),
            dishes_count: self.dishes_of(&submenu.id).count() as u64,
        }
    }
}

/// Store of record held in memory, with cascading deletes and a switch to
/// simulate an outage.
#[derive(Default)]
pub struct InMemoryCatalog {
    tables: Mutex<Tables>,
    down: AtomicBool,
    reads: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of read queries served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    async fn read(&self) -> Result<tokio::sync::MutexGuard<'_, Tables>, RepoError> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables.lock().await)
    }

    async fn write(&self) -> Result<tokio::sync::MutexGuard<'_, Tables>, RepoError> {
        self.check()?;
        Ok(self.tables.lock().await)
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        Ok(())
    }
}

fn duplicate(table: &str) -> RepoError {
    RepoError::Duplicate {
        constraint: format!("{table}_pkey"),
    }
}

#[async_trait]
impl MenusRepo for InMemoryCatalog {
    async fn find_menu(&self, id: &MenuId) -> Result<Option<MenuRecord>, RepoError> {
        Ok(self.read().await?.menus.get(id).cloned())
    }

    async fn find_menu_aggregate(&self, id: &MenuId) -> Result<Option<MenuAggregate>, RepoError> {
        let tables = self.read().await?;
        Ok(tables.menus.get(id).map(|menu| tables.menu_aggregate(menu)))
    }

    async fn list_menu_aggregates(&self) -> Result<Vec<MenuAggregate>, RepoError> {
        let tables = self.read().await?;
        Ok(tables
            .menus
            .values()
            .map(|menu| tables.menu_aggregate(menu))
            .collect())
    }

    async fn load_whole_tree(&self) -> Result<WholeTree, RepoError> {
        let tables = self.read().await?;
        let menus = tables
            .menus
            .values()
            .map(|menu| MenuTree {
                id: menu.id.clone(),
                title: menu.title.clone(),
                description: menu.description.clone(),
                submenus: tables
                    .submenus_of(&menu.id)
                    .map(|submenu| SubmenuTree {
                        id: submenu.id.clone(),
                        title: submenu.title.clone(),
                        description: submenu.description.clone(),
                        dishes: tables.dishes_of(&submenu.id).cloned().collect(),
                    })
                    .collect(),
            })
            .collect();
        Ok(WholeTree { menus })
    }
}

#[async_trait]
impl MenusWriteRepo for InMemoryCatalog {
    async fn create_menu(&self, params: CreateMenuParams) -> Result<MenuRecord, RepoError> {
        let mut tables = self.write().await?;
        if tables.menus.contains_key(&params.id) {
            return Err(duplicate("menus"));
        }
        let record = MenuRecord {
            id: params.id,
            title: params.title,
            description: params.description,
        };
        tables.menus.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_menu(
        &self,
        params: UpdateMenuParams,
    ) -> Result<Option<MenuRecord>, RepoError> {
        let mut tables = self.write().await?;
        Ok(tables.menus.get_mut(&params.id).map(|menu| {
            menu.title = params.title;
            menu.description = params.description;
            menu.clone()
        }))
    }

    async fn delete_menu(&self, id: &MenuId) -> Result<bool, RepoError> {
        let mut tables = self.write().await?;
        if tables.menus.remove(id).is_none() {
            return Ok(false);
        }
        let owned: Vec<SubmenuId> = tables.submenus_of(id).map(|s| s.id.clone()).collect();
        tables.submenus.retain(|_, submenu| &submenu.menu_id != id);
        tables
            .dishes
            .retain(|_, (submenu_id, _)| !owned.contains(submenu_id));
        Ok(true)
    }
}

#[async_trait]
impl SubmenusRepo for InMemoryCatalog {
    async fn find_submenu(
        &self,
        menu_id: &MenuId,
        id: &SubmenuId,
    ) -> Result<Option<SubmenuRecord>, RepoError> {
        Ok(self
            .read()
            .await?
            .submenus
            .get(id)
            .filter(|submenu| &submenu.menu_id == menu_id)
            .cloned())
    }

    async fn find_submenu_aggregate(
        &self,
        menu_id: &MenuId,
        id: &SubmenuId,
    ) -> Result<Option<SubmenuAggregate>, RepoError> {
        let tables = self.read().await?;
        Ok(tables
            .submenus
            .get(id)
            .filter(|submenu| &submenu.menu_id == menu_id)
            .map(|submenu| tables.submenu_aggregate(submenu)))
    }

    async fn list_submenu_aggregates(
        &self,
        menu_id: &MenuId,
    ) -> Result<Vec<SubmenuAggregate>, RepoError> {
        let tables = self.read().await?;
        Ok(tables
            .submenus_of(menu_id)
            .map(|submenu| tables.submenu_aggregate(submenu))
            .collect())
    }
}

#[async_trait]
impl SubmenusWriteRepo for InMemoryCatalog {
    async fn create_submenu(
        &self,
        params: CreateSubmenuParams,
    ) -> Result<SubmenuRecord, RepoError> {
        let mut tables = self.write().await?;
        if tables.submenus.contains_key(&params.id) {
            return Err(duplicate("submenus"));
        }
        let record = SubmenuRecord {
            id: params.id,
            menu_id: params.menu_id,
            title: params.title,
            description: params.description,
        };
        tables.submenus.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_submenu(
        &self,
        params: UpdateSubmenuParams,
    ) -> Result<Option<SubmenuRecord>, RepoError> {
        let mut tables = self.write().await?;
        Ok(tables
            .submenus
            .get_mut(&params.id)
            .filter(|submenu| submenu.menu_id == params.menu_id)
            .map(|submenu| {
                submenu.title = params.title;
                submenu.description = params.description;
                submenu.clone()
            }))
    }

    async fn delete_submenu(&self, menu_id: &MenuId, id: &SubmenuId) -> Result<bool, RepoError> {
        let mut tables = self.write().await?;
        let owned = tables
            .submenus
            .get(id)
            .is_some_and(|submenu| &submenu.menu_id == menu_id);
        if !owned {
            return Ok(false);
        }
        tables.submenus.remove(id);
        tables.dishes.retain(|_, (submenu_id, _)| submenu_id != id);
        Ok(true)
    }
}

#[async_trait]
impl DishesRepo for InMemoryCatalog {
    async fn find_dish(
        &self,
        submenu_id: &SubmenuId,
        id: &DishId,
    ) -> Result<Option<DishRecord>, RepoError> {
        Ok(self
            .read()
            .await?
            .dishes
            .get(id)
            .filter(|(owner, _)| owner == submenu_id)
            .map(|(_, dish)| dish.clone()))
    }

    async fn list_dishes(&self, submenu_id: &SubmenuId) -> Result<Vec<DishRecord>, RepoError> {
        Ok(self.read().await?.dishes_of(submenu_id).cloned().collect())
    }
}

#[async_trait]
impl DishesWriteRepo for InMemoryCatalog {
    async fn create_dish(&self, params: CreateDishParams) -> Result<DishRecord, RepoError> {
        let mut tables = self.write().await?;
        if tables.dishes.contains_key(&params.id) {
            return Err(duplicate("dishes"));
        }
        let record = DishRecord {
            id: params.id,
            title: params.title,
            description: params.description,
            price: params.price,
        };
        tables
            .dishes
            .insert(record.id.clone(), (params.submenu_id, record.clone()));
        Ok(record)
    }

    async fn update_dish(
        &self,
        params: UpdateDishParams,
    ) -> Result<Option<DishRecord>, RepoError> {
        let mut tables = self.write().await?;
        Ok(tables
            .dishes
            .get_mut(&params.id)
            .filter(|(owner, _)| owner == &params.submenu_id)
            .map(|(_, dish)| {
                dish.title = params.title;
                dish.description = params.description;
                dish.price = params.price;
                dish.clone()
            }))
    }

    async fn delete_dish(&self, submenu_id: &SubmenuId, id: &DishId) -> Result<bool, RepoError> {
        let mut tables = self.write().await?;
        let owned = tables
            .dishes
            .get(id)
            .is_some_and(|(owner, _)| owner == submenu_id);
        if owned {
            tables.dishes.remove(id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl HealthRepo for InMemoryCatalog {
    async fn ping(&self) -> Result<(), RepoError> {
        self.check()
    }
}

/// Cache backend that fails every call.
pub struct UnreachableStore;

#[async_trait]
impl CacheStore for UnreachableStore {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn set(&self, _key: &str, _value: Bytes) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete(&self, _keys: &[String]) -> Result<usize, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<usize, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn flush(&self) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }
}

/// Services wired the same way the server wires them.
pub struct Harness {
    pub catalog: Arc<InMemoryCatalog>,
    pub memory: Arc<MemoryCacheStore>,
    pub trigger: Option<Arc<CacheTrigger>>,
    pub menus: Arc<MenuService>,
    pub submenus: Arc<SubmenuService>,
    pub dishes: Arc<DishService>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        let memory = Arc::new(MemoryCacheStore::new(config.memory_capacity_non_zero()));
        Self::build(config, memory.clone(), memory)
    }

    /// Catalog whose cache backend is down.
    pub fn unreachable_cache() -> Self {
        let memory = Arc::new(MemoryCacheStore::new(
            NonZeroUsize::new(16).expect("non-zero capacity"),
        ));
        Self::build(CacheConfig::default(), memory, Arc::new(UnreachableStore))
    }

    fn build(
        config: CacheConfig,
        memory: Arc<MemoryCacheStore>,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        let catalog = InMemoryCatalog::new();

        let (aside, trigger) = if config.is_enabled() {
            let queue = Arc::new(InvalidationQueue::new(config.queue_limit));
            let consumer = Arc::new(InvalidationConsumer::new(
                config.clone(),
                store.clone(),
                queue.clone(),
                Arc::new(DeadLetterLog::new(config.dead_letter_capacity)),
            ));
            let trigger = Arc::new(CacheTrigger::new(config.clone(), queue, consumer));
            (CacheAside::new(store, &config), Some(trigger))
        } else {
            (CacheAside::disabled(), None)
        };

        let ancestry = Ancestry::new(catalog.clone(), catalog.clone(), catalog.clone());
        let menus = Arc::new(
            MenuService::new(catalog.clone(), catalog.clone(), aside.clone())
                .with_cache_trigger_opt(trigger.clone()),
        );
        let submenus = Arc::new(
            SubmenuService::new(
                ancestry.clone(),
                catalog.clone(),
                catalog.clone(),
                aside.clone(),
            )
            .with_cache_trigger_opt(trigger.clone()),
        );
        let dishes = Arc::new(
            DishService::new(ancestry, catalog.clone(), catalog.clone(), aside)
                .with_cache_trigger_opt(trigger.clone()),
        );

        Self {
            catalog,
            memory,
            trigger,
            menus,
            submenus,
            dishes,
        }
    }

    pub fn api_state(&self) -> ApiState {
        ApiState {
            menus: self.menus.clone(),
            submenus: self.submenus.clone(),
            dishes: self.dishes.clone(),
            health: self.catalog.clone(),
        }
    }

    pub fn cached(&self, key: &str) -> bool {
        self.memory.contains(key)
    }
}
