//! Plain-text rendering of cart views.

use std::io::{self, Write};

use craftcart_cart::view::{CartView, Notification, NotificationLevel};
use craftcart_cart::Coupon;
use craftcart_core::CurrencyCode;

pub fn cart(out: &mut impl Write, view: &CartView) -> io::Result<()> {
    if view.is_empty() {
        writeln!(out, "Your cart is empty")?;
    }
    for item in &view.items {
        writeln!(
            out,
            "#{} {} ({}) x{} @ {} = {}",
            item.id, item.name, item.category, item.quantity, item.price, item.line_price
        )?;
    }

    let summary = &view.summary;
    writeln!(out)?;
    writeln!(out, "Items:    {}", view.item_count)?;
    writeln!(out, "Subtotal: {}", summary.subtotal)?;
    writeln!(out, "Shipping: {}", summary.shipping)?;
    if let Some(discount) = &summary.discount {
        writeln!(out, "Discount: {discount}")?;
    }
    writeln!(out, "Total:    {}", summary.total)?;
    if let Some(coupon) = &view.coupon {
        writeln!(out, "Coupon:   {} ({})", coupon.code, coupon.description)?;
    }
    if let Some(hint) = &summary.free_shipping_hint {
        writeln!(out, "{hint}")?;
    }
    Ok(())
}

pub fn notification(out: &mut impl Write, notification: &Notification) -> io::Result<()> {
    let marker = match notification.level {
        NotificationLevel::Success => "+",
        NotificationLevel::Info => "*",
        NotificationLevel::Error => "!",
    };
    writeln!(out, "{marker} {}", notification.message)
}

pub fn coupons<'a>(
    out: &mut impl Write,
    coupons: impl IntoIterator<Item = &'a Coupon>,
    currency: CurrencyCode,
) -> io::Result<()> {
    for coupon in coupons {
        writeln!(
            out,
            "{:<10} min {:<8} {}",
            coupon.code,
            coupon.min_order.display_in(currency),
            coupon.description
        )?;
    }
    Ok(())
}
