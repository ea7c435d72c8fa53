use async_trait::async_trait;

use super::domain::{Coffee, CoffeePatch, Event, Flavour, NewEvent};
use crate::errors::ServiceError;

/// Persistent collection of coffees. Reads always return flavours loaded.
#[async_trait]
pub trait CoffeeRepository: Send + Sync {
    /// Page through coffees; `None` bounds are not applied.
    async fn find_many(&self, skip: Option<u64>, take: Option<u64>) -> Result<Vec<Coffee>, ServiceError>;
    async fn find_by_id(&self, id: i32) -> Result<Option<Coffee>, ServiceError>;

    /// Load the stored coffee and merge `patch` onto it without saving.
    async fn preload(&self, id: i32, patch: CoffeePatch) -> Result<Option<Coffee>, ServiceError> {
        Ok(self.find_by_id(id).await?.map(|mut coffee| {
            coffee.apply(patch);
            coffee
        }))
    }

    /// Insert or update, inserting pending flavours first. One logical write.
    async fn save(&self, coffee: Coffee) -> Result<Coffee, ServiceError>;
    /// Delete and hand back the snapshot that was removed.
    async fn remove(&self, coffee: Coffee) -> Result<Coffee, ServiceError>;
}

#[async_trait]
pub trait FlavourRepository: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Flavour>, ServiceError>;
}

/// Source of scoped transactional handles.
#[async_trait]
pub trait TransactionRunner: Send + Sync {
    type Runner: QueryRunner;

    async fn open(&self) -> Result<Self::Runner, ServiceError>;
}

/// One scoped connection. Writes go through the handle so they join its
/// transaction. `rollback` without an open transaction and a second
/// `release` are no-ops.
#[async_trait]
pub trait QueryRunner: Send {
    async fn begin(&mut self) -> Result<(), ServiceError>;
    async fn save_coffee(&mut self, coffee: &Coffee) -> Result<Coffee, ServiceError>;
    async fn save_event(&mut self, event: &NewEvent) -> Result<Event, ServiceError>;
    async fn commit(&mut self) -> Result<(), ServiceError>;
    async fn rollback(&mut self) -> Result<(), ServiceError>;
    async fn release(&mut self);
}

/// In-memory catalog implementing every store, for tests and doc examples.
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Debug)]
    struct CoffeeRow {
        name: String,
        brand: String,
        recommendations: i32,
        flavour_ids: Vec<i32>,
    }

    #[derive(Clone, Debug, Default)]
    struct CatalogState {
        coffees: BTreeMap<i32, CoffeeRow>,
        flavours: BTreeMap<i32, String>,
        events: Vec<Event>,
        last_coffee_id: i32,
        last_flavour_id: i32,
        last_event_id: i32,
    }

    impl CatalogState {
        fn load(&self, id: i32) -> Option<Coffee> {
            let row = self.coffees.get(&id)?;
            let flavours = row
                .flavour_ids
                .iter()
                .filter_map(|fid| self.flavours.get(fid).map(|name| Flavour { id: Some(*fid), name: name.clone() }))
                .collect();
            Some(Coffee {
                id: Some(id),
                name: row.name.clone(),
                brand: row.brand.clone(),
                recommendations: row.recommendations,
                flavours,
            })
        }

        fn insert_flavour(&mut self, name: &str) -> Flavour {
            self.last_flavour_id += 1;
            self.flavours.insert(self.last_flavour_id, name.to_string());
            Flavour { id: Some(self.last_flavour_id), name: name.to_string() }
        }

        fn persist(&mut self, coffee: &Coffee) -> Result<Coffee, ServiceError> {
            let id = match coffee.id {
                Some(id) if self.coffees.contains_key(&id) => id,
                Some(id) => return Err(ServiceError::Db(format!("coffee #{id} was not updated"))),
                None => {
                    self.last_coffee_id += 1;
                    self.last_coffee_id
                }
            };
            let mut flavours = Vec::with_capacity(coffee.flavours.len());
            for flavour in &coffee.flavours {
                match flavour.id {
                    Some(_) => flavours.push(flavour.clone()),
                    None => flavours.push(self.insert_flavour(&flavour.name)),
                }
            }
            let mut flavour_ids: Vec<i32> = Vec::with_capacity(flavours.len());
            for fid in flavours.iter().filter_map(|f| f.id) {
                if !flavour_ids.contains(&fid) { flavour_ids.push(fid); }
            }
            self.coffees.insert(id, CoffeeRow {
                name: coffee.name.clone(),
                brand: coffee.brand.clone(),
                recommendations: coffee.recommendations,
                flavour_ids,
            });
            Ok(Coffee { id: Some(id), flavours, ..coffee.clone() })
        }

        fn append_event(&mut self, event: &NewEvent) -> Event {
            self.last_event_id += 1;
            let stored = Event {
                id: self.last_event_id,
                name: event.name.clone(),
                event_type: event.event_type.clone(),
                payload: event.payload.clone(),
            };
            self.events.push(stored.clone());
            stored
        }
    }

    /// Shared handle; clones see the same rows.
    #[derive(Clone, Default)]
    pub struct InMemoryCatalog {
        state: Arc<Mutex<CatalogState>>,
        fail_begin: Arc<AtomicBool>,
        fail_event_writes: Arc<AtomicBool>,
        releases: Arc<AtomicUsize>,
    }

    impl InMemoryCatalog {
        pub fn new() -> Self { Self::default() }

        pub async fn seed_flavour(&self, name: &str) -> Flavour {
            self.state.lock().await.insert_flavour(name)
        }

        pub async fn flavours(&self) -> Vec<Flavour> {
            let state = self.state.lock().await;
            state.flavours.iter().map(|(id, name)| Flavour { id: Some(*id), name: name.clone() }).collect()
        }

        pub async fn events(&self) -> Vec<Event> { self.state.lock().await.events.clone() }

        pub async fn coffee_count(&self) -> usize { self.state.lock().await.coffees.len() }

        /// Make the next `begin` calls fail.
        pub fn fail_begin(&self, on: bool) { self.fail_begin.store(on, Ordering::SeqCst); }

        /// Make transactional event writes fail.
        pub fn fail_event_writes(&self, on: bool) { self.fail_event_writes.store(on, Ordering::SeqCst); }

        /// Number of query runners released so far.
        pub fn releases(&self) -> usize { self.releases.load(Ordering::SeqCst) }
    }

    #[async_trait]
    impl CoffeeRepository for InMemoryCatalog {
        async fn find_many(&self, skip: Option<u64>, take: Option<u64>) -> Result<Vec<Coffee>, ServiceError> {
            let state = self.state.lock().await;
            let skip = skip.unwrap_or(0) as usize;
            let take = take.map_or(usize::MAX, |t| t as usize);
            Ok(state.coffees.keys().skip(skip).take(take).filter_map(|id| state.load(*id)).collect())
        }

        async fn find_by_id(&self, id: i32) -> Result<Option<Coffee>, ServiceError> {
            Ok(self.state.lock().await.load(id))
        }

        async fn save(&self, coffee: Coffee) -> Result<Coffee, ServiceError> {
            self.state.lock().await.persist(&coffee)
        }

        async fn remove(&self, coffee: Coffee) -> Result<Coffee, ServiceError> {
            if let Some(id) = coffee.id {
                self.state.lock().await.coffees.remove(&id);
            }
            Ok(coffee)
        }
    }

    #[async_trait]
    impl FlavourRepository for InMemoryCatalog {
        async fn find_by_name(&self, name: &str) -> Result<Option<Flavour>, ServiceError> {
            let state = self.state.lock().await;
            Ok(state
                .flavours
                .iter()
                .find(|(_, n)| n.as_str() == name)
                .map(|(id, n)| Flavour { id: Some(*id), name: n.clone() }))
        }
    }

    #[async_trait]
    impl TransactionRunner for InMemoryCatalog {
        type Runner = InMemoryQueryRunner;

        async fn open(&self) -> Result<Self::Runner, ServiceError> {
            Ok(InMemoryQueryRunner { catalog: self.clone(), staged: None, released: false })
        }
    }

    enum StagedWrite {
        Coffee(Coffee),
        Event(NewEvent),
    }

    /// Writes made inside one transaction. `view` answers the handle's own
    /// reads; `writes` is replayed onto the live state on commit.
    struct Staged {
        view: CatalogState,
        writes: Vec<StagedWrite>,
    }

    /// Transaction handle over the shared catalog.
    pub struct InMemoryQueryRunner {
        catalog: InMemoryCatalog,
        staged: Option<Staged>,
        released: bool,
    }

    impl InMemoryQueryRunner {
        fn staged(&mut self) -> Result<&mut Staged, ServiceError> {
            self.staged.as_mut().ok_or_else(|| ServiceError::Db("no active transaction".into()))
        }
    }

    #[async_trait]
    impl QueryRunner for InMemoryQueryRunner {
        async fn begin(&mut self) -> Result<(), ServiceError> {
            if self.released {
                return Err(ServiceError::Db("query runner already released".into()));
            }
            if self.catalog.fail_begin.load(Ordering::SeqCst) {
                return Err(ServiceError::Db("injected begin failure".into()));
            }
            if self.staged.is_some() {
                return Err(ServiceError::Db("transaction already started".into()));
            }
            let view = self.catalog.state.lock().await.clone();
            self.staged = Some(Staged { view, writes: Vec::new() });
            Ok(())
        }

        async fn save_coffee(&mut self, coffee: &Coffee) -> Result<Coffee, ServiceError> {
            let staged = self.staged()?;
            let saved = staged.view.persist(coffee)?;
            staged.writes.push(StagedWrite::Coffee(coffee.clone()));
            Ok(saved)
        }

        async fn save_event(&mut self, event: &NewEvent) -> Result<Event, ServiceError> {
            if self.catalog.fail_event_writes.load(Ordering::SeqCst) {
                return Err(ServiceError::Db("injected event write failure".into()));
            }
            let staged = self.staged()?;
            let stored = staged.view.append_event(event);
            staged.writes.push(StagedWrite::Event(event.clone()));
            Ok(stored)
        }

        async fn commit(&mut self) -> Result<(), ServiceError> {
            let staged = self.staged.take().ok_or_else(|| ServiceError::Db("no active transaction".into()))?;
            let mut live = self.catalog.state.lock().await;
            // all writes land or none do
            let mut next = live.clone();
            for write in &staged.writes {
                match write {
                    StagedWrite::Coffee(coffee) => {
                        next.persist(coffee)?;
                    }
                    StagedWrite::Event(event) => {
                        next.append_event(event);
                    }
                }
            }
            *live = next;
            Ok(())
        }

        async fn rollback(&mut self) -> Result<(), ServiceError> {
            self.staged = None;
            Ok(())
        }

        async fn release(&mut self) {
            if self.released { return; }
            self.staged = None;
            self.released = true;
            self.catalog.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::InMemoryCatalog;
    use super::*;

    #[tokio::test]
    async fn commit_keeps_writes_made_outside_the_transaction() {
        let catalog = InMemoryCatalog::new();
        let first = catalog.save(Coffee::new("Roast", "Buddy Brew", Vec::new())).await.unwrap();

        let mut runner = catalog.open().await.unwrap();
        runner.begin().await.unwrap();
        let mut bumped = first.clone();
        bumped.recommendations = 1;
        runner.save_coffee(&bumped).await.unwrap();
        runner.save_event(&NewEvent::recommend_coffee(first.id)).await.unwrap();

        let second = catalog.save(Coffee::new("Mocha", "Nesti", Vec::new())).await.unwrap();
        runner.commit().await.unwrap();
        runner.release().await;

        assert_eq!(catalog.coffee_count().await, 2);
        assert!(catalog.find_by_id(second.id.unwrap()).await.unwrap().is_some());
        let stored = catalog.find_by_id(first.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.recommendations, 1);
        assert_eq!(catalog.events().await.len(), 1);
    }

    #[tokio::test]
    async fn commit_fails_whole_when_coffee_removed_meanwhile() {
        let catalog = InMemoryCatalog::new();
        let coffee = catalog.save(Coffee::new("Roast", "Buddy Brew", Vec::new())).await.unwrap();

        let mut runner = catalog.open().await.unwrap();
        runner.begin().await.unwrap();
        runner.save_coffee(&coffee).await.unwrap();
        runner.save_event(&NewEvent::recommend_coffee(coffee.id)).await.unwrap();

        catalog.remove(coffee.clone()).await.unwrap();
        assert!(runner.commit().await.is_err());
        runner.release().await;

        assert_eq!(catalog.coffee_count().await, 0);
        assert!(catalog.events().await.is_empty());
    }

    #[tokio::test]
    async fn uncommitted_writes_stay_invisible() {
        let catalog = InMemoryCatalog::new();
        let coffee = catalog.save(Coffee::new("Roast", "Buddy Brew", vec![Flavour::pending("dark")])).await.unwrap();

        let mut runner = catalog.open().await.unwrap();
        runner.begin().await.unwrap();
        let mut bumped = coffee.clone();
        bumped.recommendations = 5;
        runner.save_coffee(&bumped).await.unwrap();
        runner.rollback().await.unwrap();
        runner.release().await;

        let stored = catalog.find_by_id(coffee.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.recommendations, 0);
        assert_eq!(catalog.releases(), 1);
    }
}
