use crate::application::retry::{Attempt, RetryOutcome, RetryPolicy, retry_with_policy};
use crate::domain::cart::CartStore;
use crate::domain::payment::{PaymentVerificationState, Redirect, VerificationResponse, VerifiedPayment};
use crate::domain::ports::VerificationApiRef;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(1500);

/// Final answer of a verification run.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub reference: String,
    pub state: PaymentVerificationState,
    pub payment: Option<VerifiedPayment>,
    /// Set only on success.
    pub redirect: Option<Redirect>,
    /// Network calls made.
    pub attempts: u32,
    pub detail: Option<String>,
}

impl VerificationReport {
    fn new(reference: &str, state: PaymentVerificationState, attempts: u32) -> Self {
        Self {
            reference: reference.to_string(),
            state,
            payment: None,
            redirect: None,
            attempts,
            detail: None,
        }
    }
}

enum Settled {
    Paid(VerifiedPayment),
    Failed(Option<String>),
    NotFound,
    Error(String),
}

/// Polls the backend until a payment settles or the retry policy runs out.
///
/// Every state change is published on a `watch` channel so a caller can
/// render progress while `verify` is running.
pub struct PaymentVerifier {
    api: VerificationApiRef,
    cart: CartStore,
    policy: RetryPolicy,
    redirect_delay: Duration,
    state: watch::Sender<PaymentVerificationState>,
}

impl PaymentVerifier {
    pub fn new(api: VerificationApiRef, cart: CartStore) -> Self {
        let (state, _) = watch::channel(PaymentVerificationState::Verifying);
        Self {
            api,
            cart,
            policy: RetryPolicy::default(),
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            state,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<PaymentVerificationState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> PaymentVerificationState {
        *self.state.borrow()
    }

    #[instrument(skip(self), fields(max_attempts = self.policy.max_attempts))]
    pub async fn verify(&self, reference: &str) -> VerificationReport {
        if reference.trim().is_empty() {
            self.state.send_replace(PaymentVerificationState::NotFound);
            return VerificationReport::new(reference, PaymentVerificationState::NotFound, 0);
        }

        self.state.send_replace(PaymentVerificationState::Verifying);

        let outcome = retry_with_policy(&self.policy, |_| self.poll_once(reference)).await;

        let report = match outcome {
            RetryOutcome::Completed { value, attempts } => {
                self.settle(reference, value, attempts).await
            }
            RetryOutcome::Exhausted { attempts } => {
                warn!(reference, attempts, "payment still pending, giving up");
                VerificationReport::new(reference, PaymentVerificationState::PendingTimeout, attempts)
            }
        };

        self.state.send_replace(report.state);
        info!(reference, state = %report.state, attempts = report.attempts, "verification finished");
        report
    }

    async fn poll_once(&self, reference: &str) -> Attempt<Settled> {
        match self.api.verify(reference).await {
            Ok(VerificationResponse::Paid(payment)) => Attempt::Done(Settled::Paid(payment)),
            Ok(VerificationResponse::Pending) => {
                self.state.send_replace(PaymentVerificationState::Pending);
                Attempt::Retry
            }
            Ok(VerificationResponse::Failed(reason)) => Attempt::Done(Settled::Failed(reason)),
            Ok(VerificationResponse::NotFound) => Attempt::Done(Settled::NotFound),
            Err(e) => {
                warn!(reference, error = %e, "verification request failed");
                Attempt::Done(Settled::Error(e.to_string()))
            }
        }
    }

    async fn settle(&self, reference: &str, settled: Settled, attempts: u32) -> VerificationReport {
        match settled {
            Settled::Paid(payment) => {
                if self.cart.clear_for_reference(reference).await {
                    info!(reference, "cart cleared after confirmed payment");
                }
                let mut report =
                    VerificationReport::new(reference, PaymentVerificationState::Success, attempts);
                report.payment = Some(payment);
                report.redirect = Some(Redirect::to_tickets(reference, self.redirect_delay));
                report
            }
            Settled::Failed(reason) => {
                let mut report =
                    VerificationReport::new(reference, PaymentVerificationState::Failed, attempts);
                report.detail = reason;
                report
            }
            Settled::NotFound => {
                VerificationReport::new(reference, PaymentVerificationState::NotFound, attempts)
            }
            Settled::Error(reason) => {
                let mut report =
                    VerificationReport::new(reference, PaymentVerificationState::Error, attempts);
                report.detail = Some(reason);
                report
            }
        }
    }
}
