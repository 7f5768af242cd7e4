//! Outbound notifications for order updates.
//!
//! Email and SMS are independent best-effort side channels. The dispatcher
//! persists the order first; each channel then runs on its own task and a
//! failure is logged, never propagated and never blocking the sibling
//! channel.

pub mod email;
pub mod sms;

pub use email::EmailService;
pub use sms::SmsClient;

use tracing::warn;

use shipline_core::OrderStatus;

use crate::models::Order;

/// Customer-facing label for a status, used in notification copy.
fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::OrderPlaced => "placed",
        OrderStatus::PendingAssignment => "handed to the courier",
        OrderStatus::Shipped => "shipped",
        OrderStatus::InTransit => "in transit",
        OrderStatus::OutForDelivery => "out for delivery",
        OrderStatus::Delivered => "delivered",
        OrderStatus::Returned => "returned",
        OrderStatus::Cancelled => "cancelled",
    }
}

/// Fan-out point for order update notifications.
///
/// Channels are optional; an unconfigured channel is skipped silently.
/// [`Notifier::disabled`] gives tests a notifier with no channels at all.
#[derive(Clone, Default)]
pub struct Notifier {
    email: Option<EmailService>,
    sms: Option<SmsClient>,
}

impl Notifier {
    #[must_use]
    pub fn new(email: Option<EmailService>, sms: Option<SmsClient>) -> Self {
        Self { email, sms }
    }

    /// A notifier with every channel disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Announce an order update on every configured channel.
    ///
    /// `status` of `None` means a tracking-only update; the copy then talks
    /// about tracking details instead of claiming a status change. Each
    /// channel runs on its own task, fire-and-forget.
    pub fn dispatch_order_update(&self, order: &Order, status: Option<OrderStatus>) {
        let order_ref = order
            .short_code
            .map_or_else(|| order.id.to_string(), |code| code.to_string());
        let name = order.contact.display_name().to_string();
        let tracking_id = order.tracking_id.clone();
        let tracking_url = order.tracking_url.clone();

        if let (Some(email), Some(to)) = (self.email.clone(), order.contact.email()) {
            let to = to.to_string();
            let order_id = order.id;
            let order_ref = order_ref.clone();
            let name = name.clone();
            let tracking_id = tracking_id.clone();
            let tracking_url = tracking_url.clone();
            tokio::spawn(async move {
                let result = match status {
                    Some(status) => {
                        email
                            .send_status_update(
                                &to,
                                &name,
                                &order_ref,
                                status_label(status),
                                tracking_id.as_deref(),
                                tracking_url.as_deref(),
                            )
                            .await
                    }
                    None => {
                        email
                            .send_tracking_update(
                                &to,
                                &name,
                                &order_ref,
                                tracking_id.as_deref(),
                                tracking_url.as_deref(),
                            )
                            .await
                    }
                };
                if let Err(err) = result {
                    warn!(order_id = %order_id, error = %err, "order update email failed");
                }
            });
        }

        if let (Some(sms), Some(phone)) = (self.sms.clone(), order.contact.phone()) {
            let phone = phone.to_string();
            let order_id = order.id;
            let message = match status {
                Some(status) => format!(
                    "Your order {order_ref} is now {}.{}",
                    status_label(status),
                    tracking_url
                        .as_deref()
                        .map(|url| format!(" Track it: {url}"))
                        .unwrap_or_default()
                ),
                None => format!(
                    "Tracking updated for order {order_ref}.{}",
                    tracking_url
                        .as_deref()
                        .map(|url| format!(" Track it: {url}"))
                        .unwrap_or_default()
                ),
            };
            tokio::spawn(async move {
                if let Err(err) = sms.send(&phone, &message).await {
                    warn!(order_id = %order_id, error = %err, "order update SMS failed");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_are_customer_readable() {
        assert_eq!(status_label(OrderStatus::OutForDelivery), "out for delivery");
        assert_eq!(status_label(OrderStatus::PendingAssignment), "handed to the courier");
    }
}
