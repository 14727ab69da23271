use crate::application::verification::{PaymentVerifier, VerificationReport};
use crate::domain::cart::CartStore;
use crate::domain::order::{OrderInitializationRequest, OrderInitializationResult};
use crate::domain::payment::{WidgetConfig, WidgetOutcome};
use crate::domain::ports::{OrderApiRef, PaymentWidgetRef};
use crate::error::{CheckoutError, Result};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};

/// Where a checkout session currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutPhase {
    Idle,
    Initializing,
    AwaitingPayment { reference: String, amount: u64 },
    Verifying { reference: String },
    /// The widget was closed; the cart is intact and the user may retry.
    Ready,
}

/// Static settings for the payment widget.
#[derive(Debug, Clone)]
pub struct WidgetSettings {
    pub public_key: String,
    pub currency: String,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            currency: "NGN".to_string(),
        }
    }
}

/// Result of a full `checkout` run.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// The user closed the widget. Nothing was charged as far as we know.
    Cancelled { reference: String },
    /// The widget reported success and verification ran.
    Verified(VerificationReport),
}

struct InFlight {
    generation: u64,
    abort: AbortHandle,
}

/// Drives one user's checkout: server-authoritative initialization,
/// hand-off to the payment widget, and verification.
///
/// At most one initialization is live at a time. Starting a new one aborts
/// the previous request, and a result that arrives after being superseded is
/// discarded. Dropping the session aborts whatever is still in flight.
pub struct CheckoutSession {
    orders: OrderApiRef,
    widget: PaymentWidgetRef,
    verifier: PaymentVerifier,
    cart: CartStore,
    settings: WidgetSettings,
    generation: AtomicU64,
    in_flight: Mutex<Option<InFlight>>,
    phase: RwLock<CheckoutPhase>,
}

impl CheckoutSession {
    pub fn new(
        orders: OrderApiRef,
        widget: PaymentWidgetRef,
        verifier: PaymentVerifier,
        cart: CartStore,
        settings: WidgetSettings,
    ) -> Self {
        Self {
            orders,
            widget,
            verifier,
            cart,
            settings,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            phase: RwLock::new(CheckoutPhase::Idle),
        }
    }

    pub async fn phase(&self) -> CheckoutPhase {
        self.phase.read().await.clone()
    }

    pub fn verifier(&self) -> &PaymentVerifier {
        &self.verifier
    }

    /// Asks the backend to create an order and quote the amount to charge.
    ///
    /// Returns [`CheckoutError::Superseded`] if another call started before
    /// this one finished.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn initialize_order(
        &self,
        request: OrderInitializationRequest,
    ) -> Result<OrderInitializationResult> {
        request.validate()?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let orders = self.orders.clone();
        let task = tokio::spawn(async move { orders.initialize_order(request).await });

        {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(previous) = in_flight.replace(InFlight {
                generation,
                abort: task.abort_handle(),
            }) {
                debug!(superseded = previous.generation, generation, "aborting earlier initialization");
                previous.abort.abort();
            }
        }
        *self.phase.write().await = CheckoutPhase::Initializing;

        let joined = task.await;

        // Held until the phase is written: a newer call or `cancel` bumps the
        // generation first and then waits on this lock.
        let mut in_flight = self.in_flight.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return Err(CheckoutError::Superseded);
        }
        in_flight.take();

        let result = match joined {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => return Err(CheckoutError::Superseded),
            Err(e) => return Err(CheckoutError::InternalError(Box::new(e))),
        };

        let mut phase = self.phase.write().await;
        let outcome = match result {
            Ok(init) => {
                info!(reference = %init.reference, amount = init.amount_minor_units, "order initialized");
                *phase = CheckoutPhase::AwaitingPayment {
                    reference: init.reference.clone(),
                    amount: init.amount_minor_units,
                };
                Ok(init)
            }
            Err(e) => {
                warn!(error = %e, "order initialization failed");
                *phase = CheckoutPhase::Idle;
                Err(e)
            }
        };
        drop(phase);
        drop(in_flight);
        outcome
    }

    /// Opens the payment widget for a server-issued reference and amount.
    #[instrument(skip(self, init, metadata), fields(reference = %init.reference))]
    pub async fn open_payment_widget(
        &self,
        init: &OrderInitializationResult,
        email: &str,
        metadata: serde_json::Value,
    ) -> Result<WidgetOutcome> {
        if self.settings.public_key.is_empty() {
            return Err(CheckoutError::ConfigError(
                "payment public key is not configured".to_string(),
            ));
        }

        let config = WidgetConfig::from_initialization(
            init,
            &self.settings.public_key,
            email,
            &self.settings.currency,
            metadata,
        );
        let outcome = self.widget.open(config).await?;

        let mut phase = self.phase.write().await;
        match &outcome {
            WidgetOutcome::Success { reference } => {
                *phase = CheckoutPhase::Verifying {
                    reference: reference.clone(),
                };
                if self.cart.clear_for_reference(reference).await {
                    info!(reference = %reference, "cart cleared after widget success");
                }
            }
            WidgetOutcome::Closed => {
                info!("payment widget closed by user");
                *phase = CheckoutPhase::Ready;
            }
        }
        Ok(outcome)
    }

    /// Polls the backend for the outcome of `reference`.
    pub async fn verify_payment(&self, reference: &str) -> VerificationReport {
        self.verifier.verify(reference).await
    }

    /// Initialize, pay and verify in one linear call.
    pub async fn checkout(
        &self,
        request: OrderInitializationRequest,
        metadata: serde_json::Value,
    ) -> Result<CheckoutOutcome> {
        let email = request.email.clone();
        let init = self.initialize_order(request).await?;

        match self.open_payment_widget(&init, &email, metadata).await? {
            WidgetOutcome::Success { reference } => {
                if reference != init.reference {
                    warn!(expected = %init.reference, got = %reference, "widget returned a different reference");
                }
                Ok(CheckoutOutcome::Verified(
                    self.verify_payment(&init.reference).await,
                ))
            }
            WidgetOutcome::Closed => Ok(CheckoutOutcome::Cancelled {
                reference: init.reference,
            }),
        }
    }

    /// Aborts any in-flight initialization and forgets a reference the widget
    /// never opened. Call when the user leaves the checkout.
    pub async fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut in_flight = self.in_flight.lock().await;
        if let Some(previous) = in_flight.take() {
            debug!(generation = previous.generation, "aborting initialization on teardown");
            previous.abort.abort();
        }
        let mut phase = self.phase.write().await;
        if matches!(
            *phase,
            CheckoutPhase::Initializing | CheckoutPhase::AwaitingPayment { .. }
        ) {
            *phase = CheckoutPhase::Idle;
        }
    }

    /// Paystack-style metadata describing the cart. Informational only.
    pub async fn cart_metadata(&self) -> serde_json::Value {
        let fields: Vec<serde_json::Value> = self
            .cart
            .items()
            .await
            .iter()
            .map(|item| {
                json!({
                    "display_name": item.event_title,
                    "variable_name": item.tier_name,
                    "value": item.quantity,
                })
            })
            .collect();
        json!({ "custom_fields": fields })
    }
}

impl Drop for CheckoutSession {
    fn drop(&mut self) {
        if let Some(previous) = self.in_flight.get_mut().take() {
            previous.abort.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::CartItem;
    use crate::domain::order::{Customer, OrderItem};
    use crate::domain::payment::VerificationResponse;
    use crate::domain::ports::{OrderApi, PaymentWidget, VerificationApi};
    use crate::error::InitFailure;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    type Scripted = std::result::Result<OrderInitializationResult, InitFailure>;

    struct FixedOrders(Scripted);

    #[async_trait]
    impl OrderApi for FixedOrders {
        async fn initialize_order(
            &self,
            _request: OrderInitializationRequest,
        ) -> Result<OrderInitializationResult> {
            self.0.clone().map_err(CheckoutError::PaymentInitError)
        }
    }

    #[derive(Default)]
    struct RecordingWidget {
        opened: StdMutex<Vec<WidgetConfig>>,
        close: bool,
    }

    #[async_trait]
    impl PaymentWidget for RecordingWidget {
        async fn open(&self, config: WidgetConfig) -> Result<WidgetOutcome> {
            let reference = config.reference.clone();
            self.opened.lock().unwrap().push(config);
            if self.close {
                Ok(WidgetOutcome::Closed)
            } else {
                Ok(WidgetOutcome::Success { reference })
            }
        }
    }

    struct AlwaysPaid;

    #[async_trait]
    impl VerificationApi for AlwaysPaid {
        async fn verify(&self, reference: &str) -> Result<VerificationResponse> {
            Ok(VerificationResponse::Paid(crate::domain::payment::VerifiedPayment {
                reference: reference.to_string(),
                amount_paid: 500_000,
                items: vec![],
                first_name: None,
                last_name: None,
                email: None,
            }))
        }
    }

    async fn two_item_cart() -> CartStore {
        let cart = CartStore::new();
        for (event, price) in [("e1", 100_000), ("e2", 75_000)] {
            cart.add_item(CartItem {
                event_id: event.to_string(),
                tier_id: "regular".to_string(),
                event_title: format!("Event {event}"),
                tier_name: "Regular".to_string(),
                price,
                quantity: 1,
                max_quantity: 10,
                event_image: None,
            })
            .await
            .unwrap();
        }
        cart
    }

    fn session(
        orders: Scripted,
        widget: Arc<RecordingWidget>,
        cart: CartStore,
    ) -> CheckoutSession {
        let verifier = PaymentVerifier::new(Arc::new(AlwaysPaid), cart.clone());
        CheckoutSession::new(
            Arc::new(FixedOrders(orders)),
            widget,
            verifier,
            cart,
            WidgetSettings {
                public_key: "pk_test_123".to_string(),
                currency: "NGN".to_string(),
            },
        )
    }

    async fn request_from(cart: &CartStore) -> OrderInitializationRequest {
        OrderInitializationRequest::new("ada@example.com", cart.order_items().await, Customer::default())
    }

    #[tokio::test]
    async fn test_widget_receives_server_amount() {
        let cart = two_item_cart().await;
        let widget = Arc::new(RecordingWidget::default());
        let session = session(
            Ok(OrderInitializationResult {
                reference: "ref_123".to_string(),
                amount_minor_units: 500_000,
            }),
            widget.clone(),
            cart.clone(),
        );

        let request = request_from(&cart).await;
        let outcome = session.checkout(request, json!({})).await.unwrap();

        let opened = widget.opened.lock().unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].amount, 500_000);
        assert_eq!(opened[0].reference, "ref_123");
        assert!(matches!(outcome, CheckoutOutcome::Verified(ref r) if r.redirect.is_some()));
        assert!(cart.is_empty().await);
    }

    #[tokio::test]
    async fn test_closed_widget_keeps_cart() {
        let cart = two_item_cart().await;
        let widget = Arc::new(RecordingWidget {
            close: true,
            ..Default::default()
        });
        let session = session(
            Ok(OrderInitializationResult {
                reference: "ref_9".to_string(),
                amount_minor_units: 175_000,
            }),
            widget,
            cart.clone(),
        );

        let outcome = session
            .checkout(request_from(&cart).await, json!({}))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CheckoutOutcome::Cancelled {
                reference: "ref_9".to_string()
            }
        );
        assert_eq!(session.phase().await, CheckoutPhase::Ready);
        assert_eq!(cart.items().await.len(), 2);
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        let widget = Arc::new(RecordingWidget::default());
        let session = session(
            Err(InitFailure::Unavailable("should not be called".into())),
            widget,
            CartStore::new(),
        );

        let bad_email = OrderInitializationRequest::new(
            "not-an-email",
            vec![OrderItem {
                event_id: "e1".into(),
                tier_name: "VIP".into(),
                quantity: 1,
            }],
            Customer::default(),
        );
        assert!(matches!(
            session.initialize_order(bad_email).await,
            Err(CheckoutError::ValidationError(_))
        ));
        assert_eq!(session.phase().await, CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_init_failure_is_classified() {
        let cart = two_item_cart().await;
        let session = session(
            Err(InitFailure::OutOfStock("VIP sold out".into())),
            Arc::new(RecordingWidget::default()),
            cart.clone(),
        );

        let err = session
            .initialize_order(request_from(&cart).await)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::PaymentInitError(InitFailure::OutOfStock(_))
        ));
        assert_eq!(session.phase().await, CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_missing_public_key_refuses_widget() {
        let cart = two_item_cart().await;
        let verifier = PaymentVerifier::new(Arc::new(AlwaysPaid), cart.clone());
        let session = CheckoutSession::new(
            Arc::new(FixedOrders(Ok(OrderInitializationResult {
                reference: "ref_1".into(),
                amount_minor_units: 1,
            }))),
            Arc::new(RecordingWidget::default()),
            verifier,
            cart.clone(),
            WidgetSettings::default(),
        );

        let err = session
            .checkout(request_from(&cart).await, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ConfigError(_)));
        assert_eq!(cart.items().await.len(), 2);
    }

    #[tokio::test]
    async fn test_cart_metadata_lists_lines() {
        let cart = two_item_cart().await;
        let session = session(
            Ok(OrderInitializationResult {
                reference: "r".into(),
                amount_minor_units: 1,
            }),
            Arc::new(RecordingWidget::default()),
            cart,
        );

        let metadata = session.cart_metadata().await;
        assert_eq!(metadata["custom_fields"].as_array().unwrap().len(), 2);
        assert_eq!(metadata["custom_fields"][0]["display_name"], "Event e1");
    }
}
