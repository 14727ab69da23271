//! Application layer containing the orchestration services.
//!
//! `CheckoutSession` and `PaymentVerifier` drive the payment flow,
//! `AssetSubmitter` runs the upload-then-persist saga, and `OrphanSweeper`
//! cleans up what failed rollbacks leave behind. All of them talk to the
//! outside world only through the ports in `domain::ports`.

pub mod checkout;
pub mod retry;
pub mod submission;
pub mod sweep;
pub mod verification;
