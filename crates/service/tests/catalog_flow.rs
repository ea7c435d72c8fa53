use std::sync::Arc;

use service::coffees::dto::{CreateCoffeeDto, PaginationQueryDto, UpdateCoffeeDto};
use service::coffees::repository::mock::InMemoryCatalog;
use service::coffees::CoffeesService;

/// create -> list -> update -> recommend twice -> remove
#[tokio::test]
async fn coffee_lifecycle_through_service() -> Result<(), anyhow::Error> {
    let catalog = Arc::new(InMemoryCatalog::new());
    let svc = CoffeesService::new(catalog.clone(), catalog.clone(), catalog.clone());

    let shipwreck = svc
        .create(CreateCoffeeDto { name: "Shipwreck Roast".into(), brand: "Buddy Brew".into(), flavours: vec!["chocolate".into(), "vanilla".into()] })
        .await?;
    let salemo = svc
        .create(CreateCoffeeDto { name: "Salemo".into(), brand: "Nesti".into(), flavours: vec!["vanilla".into()] })
        .await?;
    assert_eq!(salemo.flavours[0], shipwreck.flavours[1]);
    assert_eq!(catalog.flavours().await.len(), 2);

    let all = svc.find_all(&PaginationQueryDto::default()).await?;
    assert_eq!(all.len(), 2);

    let id = shipwreck.id.expect("saved coffee has id").to_string();
    let renamed = svc.update(&id, UpdateCoffeeDto { brand: Some("Buddy Brew Co".into()), ..Default::default() }).await?;
    assert_eq!(renamed.name, "Shipwreck Roast");
    assert_eq!(renamed.flavours.len(), 2);

    svc.recommend_coffee(&renamed).await?;
    let once = svc.find_one(&id).await?;
    svc.recommend_coffee(&once).await?;
    let twice = svc.find_one(&id).await?;
    assert_eq!(twice.recommendations, 2);
    assert_eq!(twice.brand, "Buddy Brew Co");
    assert_eq!(catalog.events().await.len(), 2);
    assert_eq!(catalog.releases(), 2);

    svc.remove(&id).await?;
    assert!(svc.find_one(&id).await.is_err());
    let remaining = svc.find_all(&PaginationQueryDto::new(Some(10), None)).await?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "Salemo");
    // flavours outlive the coffees that referenced them
    assert_eq!(catalog.flavours().await.len(), 2);
    Ok(())
}

#[tokio::test]
async fn try_recommend_returns_saved_copy_and_leaves_input_untouched() -> Result<(), anyhow::Error> {
    let catalog = Arc::new(InMemoryCatalog::new());
    let svc = CoffeesService::new(catalog.clone(), catalog.clone(), catalog.clone());
    let coffee = svc
        .create(CreateCoffeeDto { name: "Roast".into(), brand: "Buddy Brew".into(), flavours: vec![] })
        .await?;

    let saved = svc.try_recommend_coffee(&coffee).await?;
    assert_eq!(saved.recommendations, 1);
    // caller's copy is untouched
    assert_eq!(coffee.recommendations, 0);
    assert_eq!(catalog.events().await[0].payload["coffeeId"], coffee.id.unwrap());
    Ok(())
}
