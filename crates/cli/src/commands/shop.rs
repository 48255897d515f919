//! Catalogue, cart and checkout commands.

use dwa_client::checkout::{self, CheckoutError};
use dwa_core::pricing::format_amount;
use dwa_core::{Cart, Item, ItemId, VendorId};

use super::{CommandError, Context};

#[allow(clippy::print_stdout)]
fn print_item(item: &Item) {
    let category = item.category.map_or("-", |c| c.as_str());
    println!(
        "{}  {:<30} {:>10}  {:>4} left  [{}]  vendor {}",
        item.iid,
        item.name,
        format_amount(item.cost),
        item.quantity,
        category,
        item.vid
    );
}

#[allow(clippy::print_stdout)]
fn print_cart(cart: &Cart, ctx: &Context) {
    if cart.is_empty() {
        println!("Cart is empty");
        return;
    }
    for line in cart {
        println!(
            "{} x {:<30} {:>10}  (item {}, vendor {})",
            line.quantity,
            line.name,
            format_amount(line.line_total()),
            line.iid,
            line.vid
        );
    }
    let quote = ctx.config.pricing.quote(cart);
    println!("Subtotal:  {:>10}", format_amount(quote.subtotal));
    println!("Delivery:  {:>10}", format_amount(quote.delivery_fee));
    println!("Tax:       {:>10}", format_amount(quote.tax));
    println!("Total:     {:>10}", format_amount(quote.total));
}

#[allow(clippy::print_stdout)]
pub async fn items(ctx: &Context, vendor: Option<&str>) -> Result<(), CommandError> {
    let api = ctx.client.api();
    let items = match vendor {
        Some(vid) => api.vendor_items(&VendorId::new(vid)).await?,
        None => api.all_items().await?,
    };
    if items.is_empty() {
        println!("No items listed");
    }
    items.iter().for_each(print_item);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn item(ctx: &Context, iid: &str) -> Result<(), CommandError> {
    let item = ctx.client.api().item(&ItemId::new(iid)).await?;
    print_item(&item);
    if let Some(description) = item.description.as_deref().filter(|d| !d.is_empty()) {
        println!("\n{description}");
    }
    Ok(())
}

pub fn show_cart(ctx: &Context) {
    print_cart(&ctx.store.cart(), ctx);
}

pub async fn add_to_cart(ctx: &Context, iid: &str) -> Result<(), CommandError> {
    ctx.require_user()?;
    let item = ctx.client.api().item(&ItemId::new(iid)).await?;
    let cart = ctx.cart_service().add_item(&item).await?;
    print_cart(&cart, ctx);
    Ok(())
}

pub async fn set_quantity(
    ctx: &Context,
    iid: &str,
    vid: &str,
    quantity: u32,
) -> Result<(), CommandError> {
    ctx.require_user()?;
    let cart = ctx
        .cart_service()
        .set_quantity(&ItemId::new(iid), &VendorId::new(vid), quantity)
        .await?;
    print_cart(&cart, ctx);
    Ok(())
}

pub async fn remove_from_cart(ctx: &Context, iid: &str, vid: &str) -> Result<(), CommandError> {
    ctx.require_user()?;
    let cart = ctx
        .cart_service()
        .remove_item(&ItemId::new(iid), &VendorId::new(vid))
        .await?;
    print_cart(&cart, ctx);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn clear_cart(ctx: &Context) -> Result<(), CommandError> {
    ctx.require_user()?;
    ctx.cart_service().clear().await?;
    println!("Cart cleared");
    Ok(())
}

pub async fn refresh_cart(ctx: &Context) -> Result<(), CommandError> {
    ctx.require_user()?;
    let cart = ctx.cart_service().refresh().await?;
    print_cart(&cart, ctx);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn checkout(ctx: &Context) -> Result<(), CommandError> {
    match checkout::place_order(&ctx.client, &ctx.store, &ctx.config.pricing).await {
        Ok(receipt) => {
            println!(
                "Order placed: {} line(s), total {}",
                receipt.lines.len(),
                format_amount(receipt.breakdown.total)
            );
            Ok(())
        }
        Err(CheckoutError::PaymentsFailed { succeeded, failed }) => {
            for line in &succeeded {
                println!("  paid    {} x {}", line.quantity, line.name);
            }
            for failure in &failed {
                println!(
                    "  FAILED  {} x {}: {}",
                    failure.line.quantity,
                    failure.line.name,
                    failure.error.user_message()
                );
            }
            println!("Your cart was kept. Paid lines were not refunded.");
            Err(CheckoutError::PaymentsFailed { succeeded, failed }.into())
        }
        Err(CheckoutError::NotAuthenticated) => Err(CommandError::NotSignedIn),
        Err(e) => Err(e.into()),
    }
}
