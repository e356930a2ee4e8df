use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use laundry_cart::{
    init_observability,
    models::{CartSnapshot, NewCartItem, OrderRecord},
    repositories::{FileStorage, KeyValueStorage, OrderHistory, StorageOrderHistory},
    services::{ChangeNotifier, HydrationOutcome, OrderEditHydrator, OrderService},
    CartStore, Config,
};

/// Inspect and edit the shared laundry cart
#[derive(Parser, Debug)]
#[command(name = "laundry-cart", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the cart and its summary
    Show {
        /// Only count services from this studio
        #[arg(long)]
        studio: Option<String>,
    },
    /// Add a service to the cart
    Add {
        #[arg(long)]
        service_id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        studio: String,
        #[arg(long)]
        price: Option<Decimal>,
        #[arg(long)]
        quantity: Option<Decimal>,
    },
    /// Remove every line for a service
    Remove {
        service_id: String,
        #[arg(long)]
        studio: Option<String>,
    },
    /// Empty the cart
    Clear,
    /// Replace the cart with the items of a previous order
    EditOrder {
        order_id: String,
        /// Studio the edited order is placed with
        #[arg(long)]
        studio: String,
    },
    /// List orders, optionally filtered by studio name
    Orders {
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Cancel an order
    CancelOrder { order_id: String },
}

struct App {
    store: Arc<CartStore>,
    order_history: Arc<dyn OrderHistory>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_environment().context("Failed to load configuration")?;
    init_observability(
        &config.observability.service_name,
        &config.observability.service_version,
        &config.observability.log_level,
        config.observability.enable_json_logging,
    )
    .context("Failed to initialize observability")?;

    let storage: Arc<dyn KeyValueStorage> = Arc::new(
        FileStorage::open(&config.storage.storage_dir).with_context(|| {
            format!(
                "Failed to open storage at {}",
                config.storage.storage_dir.display()
            )
        })?,
    );
    info!(storage_dir = %config.storage.storage_dir.display(), "Storage opened");

    let store = Arc::new(
        CartStore::from_storage(
            storage.clone(),
            config.storage.cart_key.clone(),
            ChangeNotifier::new(),
        )
        .with_merge_policy(config.cart.merge_policy),
    );
    let order_history: Arc<dyn OrderHistory> = Arc::new(StorageOrderHistory::new(
        storage,
        config.storage.orders_key.clone(),
    ));

    let app = App {
        store,
        order_history,
    };
    app.run(cli.command)
}

impl App {
    fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Show { studio } => self.cmd_show(studio.as_deref()),
            Commands::Add {
                service_id,
                name,
                studio,
                price,
                quantity,
            } => self.cmd_add(NewCartItem {
                service_id,
                service_name: name,
                studio_id: studio,
                price,
                quantity,
            }),
            Commands::Remove { service_id, studio } => {
                self.cmd_remove(&service_id, studio.as_deref())
            }
            Commands::Clear => {
                self.store.clear();
                println!("Cart cleared");
                Ok(())
            }
            Commands::EditOrder { order_id, studio } => self.cmd_edit_order(&order_id, &studio),
            Commands::Orders { search } => self.cmd_orders(&search),
            Commands::CancelOrder { order_id } => {
                OrderService::new(self.order_history.clone())
                    .cancel(&order_id)
                    .with_context(|| format!("Failed to cancel order {}", order_id))?;
                println!("Order {} cancelled", order_id);
                Ok(())
            }
        }
    }

    fn cmd_show(&self, studio: Option<&str>) -> Result<()> {
        let snapshot = self.store.load();
        print_snapshot(&snapshot);

        let summary = snapshot.summary(studio);
        println!(
            "{} | {} line(s) | subtotal {}",
            summary.label(),
            summary.line_count,
            summary.subtotal
        );
        Ok(())
    }

    fn cmd_add(&self, request: NewCartItem) -> Result<()> {
        let studio = request.studio_id.clone();
        let snapshot = self.store.add_item(request);
        println!(
            "{} in cart for studio {}",
            snapshot.summary(Some(&studio)).label(),
            studio
        );
        Ok(())
    }

    fn cmd_remove(&self, service_id: &str, studio: Option<&str>) -> Result<()> {
        match self.store.remove_service(service_id, studio) {
            0 => println!("Service {} is not in the cart", service_id),
            removed => println!("Removed {} line(s) for service {}", removed, service_id),
        }
        Ok(())
    }

    fn cmd_edit_order(&self, order_id: &str, studio: &str) -> Result<()> {
        let hydrator = OrderEditHydrator::new(self.store.clone(), self.order_history.clone());

        match hydrator.hydrate(order_id, studio) {
            HydrationOutcome::Hydrated {
                short_id,
                item_count,
                ..
            } => {
                println!("Editing order #{} ({} item(s) loaded)", short_id, item_count);
                print_snapshot(&self.store.load());
            }
            HydrationOutcome::OrderNotFound { order_id } => {
                println!("Order {} not found; cart unchanged", order_id);
            }
        }
        Ok(())
    }

    fn cmd_orders(&self, search: &str) -> Result<()> {
        let view = OrderService::new(self.order_history.clone())
            .search(search)
            .context("Failed to list orders")?;

        if view.is_empty() {
            println!("No orders found");
            return Ok(());
        }

        println!("Ongoing:");
        view.ongoing.iter().for_each(print_order);
        println!("History:");
        view.completed.iter().for_each(print_order);
        Ok(())
    }
}

fn print_snapshot(snapshot: &CartSnapshot) {
    if snapshot.is_empty() {
        println!("Cart is empty");
        return;
    }

    for item in snapshot.iter() {
        println!(
            "  {:<34} {:<20} studio={:<12} price={:<8} qty={}",
            item.service_id.as_deref().unwrap_or("-"),
            item.service_name.as_deref().unwrap_or("-"),
            item.studio_id.as_deref().unwrap_or("-"),
            item.price.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            item.quantity
                .map(|q| q.to_string())
                .unwrap_or_else(|| "-".into()),
        );
    }
}

fn print_order(order: &OrderRecord) {
    println!(
        "  #{} {} {} item(s) amount={}",
        order.short_id(),
        order.studio_name.as_deref().unwrap_or("-"),
        order.items.len(),
        order
            .amount
            .map(|amount| amount.to_string())
            .unwrap_or_else(|| "-".into()),
    );
}
