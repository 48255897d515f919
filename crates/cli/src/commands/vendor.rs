//! Vendor listing and sales commands.

use rust_decimal::Decimal;

use dwa_core::pricing::format_amount;
use dwa_core::validation::{validate_item_update, validate_new_item};
use dwa_core::{Category, ItemId, ItemUpdate, NewItem, User, UserType, VendorId, total_earnings};

use super::{CommandError, Context};

/// A new listing as entered on the command line.
pub struct Listing {
    pub name: String,
    pub category: Category,
    pub quantity: i32,
    pub cost: Decimal,
    pub description: Option<String>,
    pub picture: Option<String>,
}

/// Listing fields to change.
pub struct Changes {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub quantity: Option<i32>,
    pub cost: Option<Decimal>,
    pub description: Option<String>,
    pub picture: Option<String>,
}

fn require_vendor(ctx: &Context) -> Result<User, CommandError> {
    let user = ctx.require_user()?;
    if user.user_type == UserType::Vendor {
        Ok(user)
    } else {
        Err(CommandError::NotVendor)
    }
}

#[allow(clippy::print_stdout)]
pub async fn add(ctx: &Context, listing: Listing) -> Result<(), CommandError> {
    let vendor = require_vendor(ctx)?;
    let item = NewItem {
        vid: VendorId::from(&vendor.uid),
        name: listing.name,
        pictureurl: listing.picture,
        description: listing.description,
        category: listing.category,
        quantity: listing.quantity,
        cost: listing.cost,
    };
    validate_new_item(&item)?;

    let iid = ctx.client.api().add_item(&item).await?;
    println!("Listed {} as {iid}", item.name);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn update(ctx: &Context, iid: &str, changes: Changes) -> Result<(), CommandError> {
    require_vendor(ctx)?;
    let update = ItemUpdate {
        iid: ItemId::new(iid),
        name: changes.name,
        pictureurl: changes.picture,
        description: changes.description,
        category: changes.category,
        quantity: changes.quantity,
        cost: changes.cost,
    };
    validate_item_update(&update)?;

    let message = ctx.client.api().update_item(&update).await?;
    println!("{}", if message.is_empty() { "Listing updated" } else { message.as_str() });
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn delete(ctx: &Context, iid: &str) -> Result<(), CommandError> {
    require_vendor(ctx)?;
    let message = ctx.client.api().delete_item(&ItemId::new(iid)).await?;
    println!("{}", if message.is_empty() { "Listing removed" } else { message.as_str() });
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn sales(ctx: &Context) -> Result<(), CommandError> {
    let vendor = require_vendor(ctx)?;
    let transactions = ctx
        .client
        .api()
        .transactions(&VendorId::from(&vendor.uid))
        .await?;

    if transactions.is_empty() {
        println!("No sales yet");
        return Ok(());
    }
    for t in &transactions {
        println!(
            "{}  {:<30} {:>10}",
            t.t_time.format("%Y-%m-%d %H:%M"),
            t.name,
            format_amount(t.amt)
        );
    }
    println!("Total earnings: {}", format_amount(total_earnings(&transactions)));
    Ok(())
}
