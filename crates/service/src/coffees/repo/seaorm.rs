use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    LoaderTrait, ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, Unchanged,
};
use tracing::warn;

use models::{coffee, coffee_flavour, event, flavour};

use crate::coffees::domain::{Coffee, Event, Flavour, NewEvent};
use crate::coffees::repository::{CoffeeRepository, FlavourRepository, QueryRunner, TransactionRunner};
use crate::coffees::service::CoffeesService;
use crate::errors::ServiceError;

pub type SeaOrmCoffeesService = CoffeesService<SeaOrmCoffeeRepository, SeaOrmFlavourRepository, SeaOrmTransactionRunner>;

/// Wire the service with all three stores sharing one pool.
pub fn coffees_service(db: DatabaseConnection) -> SeaOrmCoffeesService {
    let db = Arc::new(db);
    CoffeesService::new(
        Arc::new(SeaOrmCoffeeRepository { db: Arc::clone(&db) }),
        Arc::new(SeaOrmFlavourRepository { db: Arc::clone(&db) }),
        Arc::new(SeaOrmTransactionRunner { db }),
    )
}

fn db_err(e: sea_orm::DbErr) -> ServiceError { ServiceError::Db(e.to_string()) }

/// Write `coffee` on `conn`: pending flavours first, then the coffee row,
/// then the junction rows are replaced with the current flavour set.
async fn persist_coffee<C: ConnectionTrait>(conn: &C, coffee: &Coffee) -> Result<Coffee, ServiceError> {
    let mut flavours = Vec::with_capacity(coffee.flavours.len());
    for f in &coffee.flavours {
        if f.is_pending() {
            let am = flavour::ActiveModel { name: Set(f.name.clone()), ..Default::default() };
            flavours.push(Flavour::from(am.insert(conn).await.map_err(db_err)?));
        } else {
            flavours.push(f.clone());
        }
    }

    let row = match coffee.id {
        Some(id) => coffee::ActiveModel {
            id: Unchanged(id),
            name: Set(coffee.name.clone()),
            brand: Set(coffee.brand.clone()),
            recommendations: Set(coffee.recommendations),
        }
        .update(conn)
        .await
        .map_err(db_err)?,
        None => coffee::ActiveModel {
            name: Set(coffee.name.clone()),
            brand: Set(coffee.brand.clone()),
            recommendations: Set(coffee.recommendations),
            ..Default::default()
        }
        .insert(conn)
        .await
        .map_err(db_err)?,
    };

    coffee_flavour::Entity::delete_many()
        .filter(coffee_flavour::Column::CoffeeId.eq(row.id))
        .exec(conn)
        .await
        .map_err(db_err)?;
    let mut linked: Vec<i32> = Vec::with_capacity(flavours.len());
    for fid in flavours.iter().filter_map(|f| f.id) {
        if !linked.contains(&fid) { linked.push(fid); }
    }
    if !linked.is_empty() {
        let links = linked
            .into_iter()
            .map(|fid| coffee_flavour::ActiveModel { coffee_id: Set(row.id), flavour_id: Set(fid) });
        coffee_flavour::Entity::insert_many(links).exec(conn).await.map_err(db_err)?;
    }

    Ok(Coffee {
        id: Some(row.id),
        name: row.name,
        brand: row.brand,
        recommendations: row.recommendations,
        flavours,
    })
}

/// SeaORM-backed coffee store.
pub struct SeaOrmCoffeeRepository {
    pub db: Arc<DatabaseConnection>,
}

#[async_trait::async_trait]
impl CoffeeRepository for SeaOrmCoffeeRepository {
    async fn find_many(&self, skip: Option<u64>, take: Option<u64>) -> Result<Vec<Coffee>, ServiceError> {
        let mut query = coffee::Entity::find().order_by_asc(coffee::Column::Id);
        if let Some(skip) = skip { query = query.offset(skip); }
        if let Some(take) = take { query = query.limit(take); }
        let rows = query.all(&*self.db).await.map_err(db_err)?;
        let flavours = rows
            .load_many_to_many(flavour::Entity, coffee_flavour::Entity, &*self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().zip(flavours).map(|(c, f)| Coffee::from_parts(c, f)).collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Coffee>, ServiceError> {
        let Some(row) = coffee::Entity::find_by_id(id).one(&*self.db).await.map_err(db_err)? else {
            return Ok(None);
        };
        let flavours = row.find_related(flavour::Entity).all(&*self.db).await.map_err(db_err)?;
        Ok(Some(Coffee::from_parts(row, flavours)))
    }

    async fn save(&self, coffee: Coffee) -> Result<Coffee, ServiceError> {
        // pending flavours, the row and its links commit together
        let txn = self.db.begin().await.map_err(db_err)?;
        let saved = persist_coffee(&txn, &coffee).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(saved)
    }

    async fn remove(&self, coffee: Coffee) -> Result<Coffee, ServiceError> {
        let Some(id) = coffee.id else { return Ok(coffee) };
        let txn = self.db.begin().await.map_err(db_err)?;
        coffee_flavour::Entity::delete_many()
            .filter(coffee_flavour::Column::CoffeeId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        coffee::Entity::delete_by_id(id).exec(&txn).await.map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(coffee)
    }
}

pub struct SeaOrmFlavourRepository {
    pub db: Arc<DatabaseConnection>,
}

#[async_trait::async_trait]
impl FlavourRepository for SeaOrmFlavourRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<Flavour>, ServiceError> {
        Ok(flavour::find_by_name(&*self.db, name).await?.map(Flavour::from))
    }
}

pub struct SeaOrmTransactionRunner {
    pub db: Arc<DatabaseConnection>,
}

#[async_trait::async_trait]
impl TransactionRunner for SeaOrmTransactionRunner {
    type Runner = SeaOrmQueryRunner;

    async fn open(&self) -> Result<Self::Runner, ServiceError> {
        Ok(SeaOrmQueryRunner { db: Arc::clone(&self.db), txn: None, released: false })
    }
}

/// Holds at most one `DatabaseTransaction`; its pooled connection is the
/// scoped connection. Dropping an uncommitted transaction rolls it back.
pub struct SeaOrmQueryRunner {
    db: Arc<DatabaseConnection>,
    txn: Option<DatabaseTransaction>,
    released: bool,
}

impl SeaOrmQueryRunner {
    fn active(&self) -> Result<&DatabaseTransaction, ServiceError> {
        self.txn.as_ref().ok_or_else(|| ServiceError::Db("no active transaction".into()))
    }
}

#[async_trait::async_trait]
impl QueryRunner for SeaOrmQueryRunner {
    async fn begin(&mut self) -> Result<(), ServiceError> {
        if self.released {
            return Err(ServiceError::Db("query runner already released".into()));
        }
        if self.txn.is_some() {
            return Err(ServiceError::Db("transaction already started".into()));
        }
        self.txn = Some(self.db.begin().await.map_err(db_err)?);
        Ok(())
    }

    async fn save_coffee(&mut self, coffee: &Coffee) -> Result<Coffee, ServiceError> {
        persist_coffee(self.active()?, coffee).await
    }

    async fn save_event(&mut self, new_event: &NewEvent) -> Result<Event, ServiceError> {
        let stored = event::record(self.active()?, &new_event.name, &new_event.event_type, new_event.payload.clone()).await?;
        Ok(Event::from(stored))
    }

    async fn commit(&mut self) -> Result<(), ServiceError> {
        let txn = self.txn.take().ok_or_else(|| ServiceError::Db("no active transaction".into()))?;
        txn.commit().await.map_err(db_err)
    }

    async fn rollback(&mut self) -> Result<(), ServiceError> {
        match self.txn.take() {
            Some(txn) => txn.rollback().await.map_err(db_err),
            None => Ok(()),
        }
    }

    async fn release(&mut self) {
        if let Some(txn) = self.txn.take() {
            if let Err(e) = txn.rollback().await {
                warn!(error = %e, "rollback_on_release_failed");
            }
        }
        self.released = true;
    }
}
