use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};

use pricewise::{AppConfig, ComparisonService, Item, JsonFileSource, format_price};

#[derive(Parser)]
#[command(name = "pricewise", about = "Compare grocery prices across stores")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cross-store price comparison, cheapest store first
    Compare {
        #[arg(long)]
        category: Option<String>,
    },
    /// Current promotions on tracked staples
    Promotions {
        #[arg(long)]
        store: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Categories present in the product list
    Categories,
    /// Products and promotions matching a name
    Search { query: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pricewise=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let source = Arc::new(JsonFileSource::new(
        &config.data.products_path,
        &config.data.promotions_path,
    ));
    let service = ComparisonService::new(source, &config);
    info!("Starting pricewise...");

    match cli.command {
        Command::Compare { category } => {
            for group in service.get_combined_products(category.as_deref()).await? {
                let cheapest = group.cheapest();
                println!(
                    "{:<32} {:>10} at {:<20} ({} stores, save {})",
                    group.name,
                    format_price(group.lowest_price),
                    cheapest.store,
                    group.constituents.len(),
                    format_price(group.store_savings()),
                );
                if let Some(best) = group.best_promotion() {
                    println!(
                        "    promotion at {}: {} (save {})",
                        best.promotion.store,
                        format_price(best.promotion.new_price),
                        format_price(best.savings),
                    );
                }
            }
        }
        Command::Promotions { store, category } => {
            for promo in service
                .get_promotions(store.as_deref(), category.as_deref())
                .await?
            {
                let previous = promo
                    .previous_price
                    .map(|p| format_price(p))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<32} {:<20} {:>10} (was {}) {}",
                    promo.name,
                    promo.store,
                    format_price(promo.new_price),
                    previous,
                    promo.display_date(),
                );
            }
        }
        Command::Categories => {
            for category in service.categories().await? {
                println!("{}", category);
            }
        }
        Command::Search { query } => {
            for item in service.search(&query).await? {
                let kind = match &item {
                    Item::Product(_) => "product",
                    Item::Promotion(_) => "promotion",
                };
                println!(
                    "{:<10} {:<32} {:<20} {:>10}",
                    kind,
                    item.name(),
                    item.store(),
                    format_price(item.price()),
                );
            }
        }
    }

    let status = service.cache_status().await;
    for error in [&status.products_error, &status.promotions_error].into_iter().flatten() {
        warn!("showing cached data; refresh failed: {}", error);
    }

    Ok(())
}
