use super::*;
use futures::FutureExt;
use pricewise::cache::{CacheState, Loader, ResourceCache};

fn product_cache(source: Arc<CountingSource>, clock: Arc<ManualClock>) -> ResourceCache<ProductRecord> {
    let loader: Loader<ProductRecord> = Arc::new(move || {
        let source = source.clone();
        async move { source.fetch_products().await }.boxed()
    });
    ResourceCache::with_clock("products", chrono::Duration::seconds(300), loader, clock)
}

#[tokio::test]
async fn test_stale_fetch_failure_keeps_last_good_value() -> anyhow::Result<()> {
    let source = Arc::new(CountingSource::new(vec![listing("1", "Milk", "Winners", 45)], vec![]));
    let clock = ManualClock::new();
    let cache = product_cache(source.clone(), clock.clone());

    assert_eq!(cache.get().await?.len(), 1);
    clock.advance(chrono::Duration::seconds(301));
    assert_eq!(cache.state().await, CacheState::Stale);

    source.set_offline(true);
    let err = cache.get().await.unwrap_err();
    assert!(err.is_transport());

    let kept = cache.peek().await.expect("last good value kept");
    assert_eq!(kept.value[0].id, "1");
    assert_eq!(cache.state().await, CacheState::Stale);

    // The failed fetch is not memoized.
    source.set_offline(false);
    assert_eq!(cache.get().await?.len(), 1);
    assert_eq!(source.product_fetches(), 3);
    assert_eq!(cache.state().await, CacheState::Valid);

    Ok(())
}

#[tokio::test]
async fn test_revalidate_serves_stale_value_immediately() -> anyhow::Result<()> {
    let source = Arc::new(CountingSource::new(vec![listing("1", "Milk", "Winners", 45)], vec![]));
    let clock = ManualClock::new();
    let cache = product_cache(source.clone(), clock.clone());

    cache.get().await?;
    clock.advance(chrono::Duration::seconds(600));

    let stale = cache.get_or_revalidate().await?;
    assert_eq!(stale.len(), 1);
    assert_eq!(cache.state().await, CacheState::Fetching);

    // Joining the background refresh rather than starting another.
    cache.get().await?;
    assert_eq!(source.product_fetches(), 2);
    assert_eq!(cache.state().await, CacheState::Valid);

    Ok(())
}
