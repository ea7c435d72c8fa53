use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use super::domain::{Coffee, CoffeePatch, Flavour, NewEvent};
use super::dto::{CreateCoffeeDto, PaginationQueryDto, UpdateCoffeeDto};
use super::repository::{CoffeeRepository, FlavourRepository, QueryRunner, TransactionRunner};
use crate::errors::ServiceError;

/// Catalog operations over explicitly injected stores.
pub struct CoffeesService<C, F, T>
where
    C: CoffeeRepository,
    F: FlavourRepository,
    T: TransactionRunner,
{
    coffees: Arc<C>,
    flavours: Arc<F>,
    transactions: Arc<T>,
}

/// Ids arrive as text; anything that is not an integer matches no row.
fn parse_id(id: &str) -> Option<i32> { id.trim().parse().ok() }

impl<C, F, T> CoffeesService<C, F, T>
where
    C: CoffeeRepository,
    F: FlavourRepository,
    T: TransactionRunner,
{
    pub fn new(coffees: Arc<C>, flavours: Arc<F>, transactions: Arc<T>) -> Self {
        Self { coffees, flavours, transactions }
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self, query: &PaginationQueryDto) -> Result<Vec<Coffee>, ServiceError> {
        let (skip, take) = query.skip_take();
        self.coffees.find_many(skip, take).await
    }

    #[instrument(skip(self))]
    pub async fn find_one(&self, id: &str) -> Result<Coffee, ServiceError> {
        let found = match parse_id(id) {
            Some(key) => self.coffees.find_by_id(key).await?,
            None => None,
        };
        found.ok_or_else(|| ServiceError::not_found(format!("Coffee #{id} not found")))
    }

    /// Create a coffee, reusing stored flavours by name.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::coffees::{CoffeesService, dto::CreateCoffeeDto, repository::mock::InMemoryCatalog};
    /// let catalog = Arc::new(InMemoryCatalog::new());
    /// let svc = CoffeesService::new(catalog.clone(), catalog.clone(), catalog.clone());
    /// let dto = CreateCoffeeDto { name: "Roast".into(), brand: "Buddy Brew".into(), flavours: vec!["chocolate".into()] };
    /// let coffee = tokio_test::block_on(svc.create(dto)).unwrap();
    /// assert_eq!(coffee.recommendations, 0);
    /// assert!(coffee.flavours[0].id.is_some());
    /// ```
    #[instrument(skip(self, dto), fields(name = %dto.name, brand = %dto.brand))]
    pub async fn create(&self, dto: CreateCoffeeDto) -> Result<Coffee, ServiceError> {
        let flavours = self.resolve_flavours(&dto.flavours).await?;
        let saved = self.coffees.save(Coffee::new(dto.name, dto.brand, flavours)).await?;
        info!(coffee_id = ?saved.id, flavours = saved.flavours.len(), "coffee_created");
        Ok(saved)
    }

    #[instrument(skip(self, dto))]
    pub async fn update(&self, id: &str, dto: UpdateCoffeeDto) -> Result<Coffee, ServiceError> {
        let flavours = match &dto.flavours {
            Some(names) => Some(self.resolve_flavours(names).await?),
            None => None,
        };
        let patch = CoffeePatch { name: dto.name, brand: dto.brand, flavours };
        let preloaded = match parse_id(id) {
            Some(key) => self.coffees.preload(key, patch).await?,
            None => None,
        };
        let coffee = preloaded.ok_or_else(|| ServiceError::not_found(format!("coffee with #{id} not found")))?;
        let saved = self.coffees.save(coffee).await?;
        info!(coffee_id = ?saved.id, "coffee_updated");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, id: &str) -> Result<Coffee, ServiceError> {
        let coffee = self.find_one(id).await?;
        let removed = self.coffees.remove(coffee).await?;
        info!(coffee_id = ?removed.id, "coffee_removed");
        Ok(removed)
    }

    /// Bump the counter and record a `recommend_coffee` event in one
    /// transaction. A failure inside the transaction is rolled back, logged
    /// and not returned; only failing to open or begin it is an error.
    #[instrument(skip(self, coffee), fields(coffee_id = ?coffee.id))]
    pub async fn recommend_coffee(&self, coffee: &Coffee) -> Result<(), ServiceError> {
        if let Err(e) = self.recommend_in_transaction(coffee).await? {
            warn!(error = %e, "recommendation_rolled_back");
        }
        Ok(())
    }

    /// Like [`Self::recommend_coffee`] but returns the transaction outcome.
    #[instrument(skip(self, coffee), fields(coffee_id = ?coffee.id))]
    pub async fn try_recommend_coffee(&self, coffee: &Coffee) -> Result<Coffee, ServiceError> {
        self.recommend_in_transaction(coffee).await?
    }

    /// Outer error: the transaction never started. Inner: it was rolled back.
    async fn recommend_in_transaction(&self, coffee: &Coffee) -> Result<Result<Coffee, ServiceError>, ServiceError> {
        let mut runner = self.transactions.open().await?;
        if let Err(e) = runner.begin().await {
            runner.release().await;
            return Err(e);
        }

        let outcome = match Self::record_recommendation(&mut runner, coffee).await {
            Ok(saved) => {
                info!(coffee_id = ?saved.id, recommendations = saved.recommendations, "coffee_recommended");
                Ok(saved)
            }
            Err(e) => {
                if let Err(rollback_err) = runner.rollback().await {
                    error!(error = %rollback_err, "rollback_failed");
                }
                Err(e)
            }
        };
        runner.release().await;
        Ok(outcome)
    }

    async fn record_recommendation(runner: &mut T::Runner, coffee: &Coffee) -> Result<Coffee, ServiceError> {
        let mut recommended = coffee.clone();
        recommended.recommendations = recommended.recommendations.saturating_add(1);
        let event = NewEvent::recommend_coffee(recommended.id);

        let saved = runner.save_coffee(&recommended).await?;
        runner.save_event(&event).await?;
        runner.commit().await?;
        Ok(saved)
    }

    /// Resolve each distinct name once, keeping first-seen order.
    async fn resolve_flavours(&self, names: &[String]) -> Result<Vec<Flavour>, ServiceError> {
        let mut resolved: Vec<Flavour> = Vec::with_capacity(names.len());
        for name in names {
            if resolved.iter().any(|f| &f.name == name) { continue; }
            resolved.push(self.preload_flavour_by_name(name).await?);
        }
        Ok(resolved)
    }

    async fn preload_flavour_by_name(&self, name: &str) -> Result<Flavour, ServiceError> {
        if let Some(existing) = self.flavours.find_by_name(name).await? {
            return Ok(existing);
        }
        debug!(flavour = name, "flavour_pending_insert");
        Ok(Flavour::pending(name))
    }
}
