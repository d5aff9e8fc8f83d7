use super::*;
use pricewise::cache::CacheState;
use pricewise::{Item, names_match, normalize_store_name};

#[tokio::test]
async fn test_milk_listings_combine_across_spellings() -> anyhow::Result<()> {
    let (_source, service) = create_test_service(
        vec![
            listing("1", "Milk", "Winners", 45),
            listing("2", "Fresh Milk 1L", "winners", 42),
        ],
        vec![],
    );

    let groups = service.get_combined_products(None).await?;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].lowest_price, Decimal::from(42));
    assert_eq!(groups[0].highest_price, Decimal::from(45));
    assert_eq!(groups[0].constituents.len(), 2);
    assert_eq!(groups[0].cheapest().id, "2");

    Ok(())
}

#[tokio::test]
async fn test_concurrent_reads_share_one_fetch() -> anyhow::Result<()> {
    let (source, service) = create_test_service(
        vec![
            listing("1", "Milk", "Winners", 45),
            listing("2", "Rice", "Super U", 60),
        ],
        vec![],
    );

    let reads = (0..8).map(|_| {
        let service = service.clone();
        async move { service.get_combined_products(None).await }
    });
    let results = futures::future::try_join_all(reads).await?;

    assert!(results.iter().all(|groups| groups.len() == 2));
    assert_eq!(source.product_fetches(), 1);
    assert_eq!(source.promotion_fetches(), 1);

    // Served from memory while valid.
    service.categories().await?;
    assert_eq!(source.product_fetches(), 1);

    Ok(())
}

#[tokio::test]
async fn test_refresh_fetches_both_resources_again() -> anyhow::Result<()> {
    let (source, service) = create_test_service(
        vec![listing("1", "Milk", "Winners", 45)],
        vec![promotion("p1", "Milk", "Winners", 50, 40)],
    );

    service.get_combined_products(None).await?;
    service.refresh().await?;

    assert_eq!(source.product_fetches(), 2);
    assert_eq!(source.promotion_fetches(), 2);

    let status = service.cache_status().await;
    assert_eq!(status.products, CacheState::Valid);
    assert_eq!(status.promotions, CacheState::Valid);

    Ok(())
}

#[tokio::test]
async fn test_added_product_is_visible_on_next_read() -> anyhow::Result<()> {
    let (source, service) = create_test_service(vec![listing("1", "Milk", "Winners", 45)], vec![]);

    let before = service.get_combined_products(None).await?;
    assert_eq!(before[0].constituents.len(), 1);

    let added = service.add_product(new_product("Fresh Milk 1L", "Super U", 39)).await?;
    assert_eq!(service.cache_status().await.products, CacheState::Empty);

    let after = service.get_combined_products(None).await?;
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].constituents.len(), 2);
    assert_eq!(after[0].cheapest().id, added.id);
    assert_eq!(source.product_fetches(), 2);

    Ok(())
}

#[tokio::test]
async fn test_updated_price_moves_the_cheapest_store() -> anyhow::Result<()> {
    let (_source, service) = create_test_service(
        vec![
            listing("1", "Milk", "Winners", 45),
            listing("2", "Milk 1L", "Super U", 42),
        ],
        vec![],
    );
    assert_eq!(service.get_combined_products(None).await?[0].cheapest().id, "2");

    service
        .update_product(
            "1",
            UpdateProduct {
                price: Some(Decimal::from(38)),
                ..Default::default()
            },
        )
        .await?;

    let groups = service.get_combined_products(None).await?;
    assert_eq!(groups[0].cheapest().id, "1");
    assert_eq!(groups[0].lowest_price, Decimal::from(38));

    Ok(())
}

#[tokio::test]
async fn test_groups_carry_matching_promotions() -> anyhow::Result<()> {
    let (_source, service) = create_test_service(
        vec![
            listing("1", "Fresh Milk", "Winners", 45),
            listing("2", "Fresh Milk 1L", "King Saver", 44),
        ],
        vec![
            promotion("p1", "Fresh Milk", "WINNER'S", 48, 40),
            promotion("p2", "Fresh Milk", "Super U", 48, 30),
        ],
    );

    let groups = service.get_combined_products(None).await?;
    assert_eq!(groups.len(), 1);
    // Only the Winners promotion matches a constituent's store.
    assert_eq!(groups[0].promotions.len(), 1);
    let best = groups[0].best_promotion().expect("promotion attached");
    assert_eq!(best.promotion.id, "p1");
    assert_eq!(best.savings, Decimal::from(8));

    Ok(())
}

#[tokio::test]
async fn test_expired_snapshot_still_shown_while_source_is_down() -> anyhow::Result<()> {
    let clock = ManualClock::new();
    let (source, service) = create_clocked_service(
        vec![
            listing("1", "Milk", "Winners", 45),
            listing("2", "Fresh Milk 1L", "Super U", 42),
        ],
        vec![promotion("p1", "Milk", "Winners", 50, 40)],
        clock.clone(),
    );
    service.get_combined_products(None).await?;

    clock.advance(chrono::Duration::seconds(601));
    source.set_offline(true);

    let groups = service.get_combined_products(None).await?;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].lowest_price, Decimal::from(42));
    assert_eq!(groups[0].promotions.len(), 1);
    assert_eq!(service.search("milk").await?.len(), 3);

    let status = service.cache_status().await;
    assert!(status.is_degraded());
    assert!(status.products_error.is_some());
    assert!(status.promotions_error.is_some());

    // Back online: the next read refreshes and clears the error.
    source.set_offline(false);
    service.get_combined_products(None).await?;
    assert!(!service.cache_status().await.is_degraded());

    Ok(())
}

#[tokio::test]
async fn test_refresh_during_read_never_overlaps_fetches() -> anyhow::Result<()> {
    let (source, service) = create_test_service(vec![listing("1", "Milk", "Winners", 45)], vec![]);

    let reader = tokio::spawn({
        let service = service.clone();
        async move { service.get_combined_products(None).await }
    });
    while source.product_fetches() == 0 {
        tokio::task::yield_now().await;
    }

    service.refresh().await?;
    reader.await??;

    assert_eq!(source.product_fetches(), 2);
    assert_eq!(source.max_concurrent_product_fetches(), 1);

    Ok(())
}

#[tokio::test]
async fn test_offline_source_surfaces_transport_error() -> anyhow::Result<()> {
    let (source, service) = create_test_service(vec![listing("1", "Milk", "Winners", 45)], vec![]);
    source.set_offline(true);

    let err = service.get_combined_products(None).await.unwrap_err();
    assert!(err.is_transport());

    let err = service.add_product(new_product("Tea", "Winners", 30)).await.unwrap_err();
    assert!(err.is_transport());

    Ok(())
}

#[tokio::test]
async fn test_search_returns_products_and_promotions() -> anyhow::Result<()> {
    let (_source, service) = create_test_service(
        vec![listing("1", "Basmati Rice", "Winners", 90)],
        vec![promotion("p1", "Rice 5kg", "Super U", 300, 250)],
    );

    let found = service.search("RICE").await?;
    assert_eq!(found.len(), 2);
    assert!(matches!(found[0], Item::Product(_)));
    assert!(matches!(found[1], Item::Promotion(_)));

    Ok(())
}

#[test]
fn test_store_and_name_matching_properties() {
    for raw in ["Winner's", "WINNERS", "King Saver", "Super U", "Dream Price"] {
        let once = normalize_store_name(raw);
        assert_eq!(normalize_store_name(&once), once);
    }

    let pairs = [("Milk", "Fresh Milk 1L"), ("Rice", "Flour"), ("  ", "Milk"), ("tea", "TEA")];
    for (a, b) in pairs {
        assert_eq!(names_match(a, b), names_match(b, a));
    }
    assert!(!names_match("", ""));
}
