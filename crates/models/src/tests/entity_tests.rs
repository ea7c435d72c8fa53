use sea_orm::{DatabaseBackend, MockDatabase, EntityTrait, ActiveModelTrait, Set};
use serde_json::json;

use crate::{coffee, coffee_flavour, event, flavour};

#[tokio::test]
async fn find_by_name_returns_existing_flavour() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![flavour::Model { id: 7, name: "sweet".into() }]])
        .into_connection();

    let found = flavour::find_by_name(&db, "sweet").await.unwrap();
    assert_eq!(found.map(|f| f.id), Some(7));
}

#[tokio::test]
async fn find_by_name_returns_none_for_unknown_name() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<flavour::Model>::new()])
        .into_connection();

    let found = flavour::find_by_name(&db, "smoky").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn record_event_inserts_payload() {
    let stored = event::Model {
        id: 1,
        name: "recommend_coffee".into(),
        event_type: "coffee".into(),
        payload: json!({ "coffeeId": 3 }),
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![stored.clone()]])
        .into_connection();

    let saved = event::record(&db, "recommend_coffee", "coffee", json!({ "coffeeId": 3 })).await.unwrap();
    assert_eq!(saved, stored);
}

#[tokio::test]
async fn record_event_rejects_blank_name() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let err = event::record(&db, "  ", "coffee", json!({})).await.unwrap_err();
    assert!(err.to_string().contains("event name required"));
}

#[tokio::test]
async fn coffee_flavours_resolve_through_junction() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![coffee::Model { id: 1, name: "Roast".into(), brand: "Buddy Brew".into(), recommendations: 0 }]])
        .append_query_results([vec![
            flavour::Model { id: 1, name: "chocolate".into() },
            flavour::Model { id: 2, name: "vanilla".into() },
        ]])
        .into_connection();

    let found = coffee::Entity::find_by_id(1).one(&db).await.unwrap().unwrap();
    let flavours = sea_orm::ModelTrait::find_related(&found, flavour::Entity).all(&db).await.unwrap();
    assert_eq!(flavours.len(), 2);
    assert_eq!(flavours[1].name, "vanilla");
}

#[tokio::test]
async fn junction_row_insert_uses_composite_key() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![coffee_flavour::Model { coffee_id: 1, flavour_id: 2 }]])
        .into_connection();

    let link = coffee_flavour::ActiveModel { coffee_id: Set(1), flavour_id: Set(2) }
        .insert(&db)
        .await
        .unwrap();
    assert_eq!(link.flavour_id, 2);
}
