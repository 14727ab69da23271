use crate::application::checkout::{CheckoutOutcome, CheckoutSession, WidgetSettings};
use crate::application::submission::{AssetSubmitter, SubmissionTarget};
use crate::application::sweep::OrphanSweeper;
use crate::application::verification::{PaymentVerifier, VerificationReport};
use crate::config::AppConfig;
use crate::domain::asset::{AssetFile, AssetKind};
use crate::domain::cart::{CartItem, CartStore};
use crate::domain::order::{Customer, OrderInitializationRequest};
use crate::domain::ports::{MediaStoreRef, OrphanRepositoryRef, RecordApiRef};
use crate::domain::records::{AssetPayload, EventPayload, FeedbackPayload, VendorPayload};
use crate::domain::submission::ReplacedAsset;
use crate::error::{CheckoutError, Result};
use crate::infrastructure::http::{BackendClient, BlobProxyClient};
use crate::infrastructure::json_file::JsonFileOrphanRepository;
use crate::interfaces::console::ConsoleWidget;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Eventify checkout and asset submission tools", long_about = None)]
pub struct Cli {
    /// Path to a persistent orphan queue database. Requires the
    /// `storage-rocksdb` feature; otherwise the JSON queue is used.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize an order from a cart, pay, and verify
    Checkout {
        /// Cart items as inline JSON or a path to a JSON file
        #[arg(long)]
        cart: String,
        /// Customer details as inline JSON or a path to a JSON file
        #[arg(long)]
        customer: String,
        /// Confirm the payment prompt without asking
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Poll the backend for the outcome of a payment reference
    Verify { reference: String },
    /// Upload an image and create or update the record that uses it
    Submit {
        /// vendor, event or feedback
        kind: AssetKind,
        /// Record body as inline JSON or a path to a JSON file
        #[arg(long)]
        payload: String,
        #[arg(long)]
        image: Option<PathBuf>,
        /// Update this record instead of creating one
        #[arg(long)]
        update: Option<String>,
        /// Image URL the record currently uses
        #[arg(long, requires = "update")]
        existing_url: Option<String>,
    },
    /// Retry deleting assets whose rollback failed
    SweepOrphans,
}

/// Executes one CLI command, printing its JSON result on stdout.
pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let output = match cli.command {
        Command::Checkout {
            cart,
            customer,
            yes,
        } => checkout(&config, &cart, &customer, yes).await?,
        Command::Verify { reference } => {
            let verifier = verifier(&config, CartStore::new())?;
            report_json(&verifier.verify(&reference).await)
        }
        Command::Submit {
            kind,
            payload,
            image,
            update,
            existing_url,
        } => {
            let target = match update {
                Some(id) => SubmissionTarget::Update {
                    id,
                    existing_asset_url: existing_url,
                },
                None => SubmissionTarget::Create,
            };
            let body: Value = read_json_arg(&payload).await?;
            let file = match image {
                Some(path) => Some(AssetFile::from_path(&path).await?),
                None => None,
            };
            let orphans = open_orphans(cli.db_path.as_deref(), &config)?;
            let submitter = submitter(&config, orphans)?;
            match kind {
                AssetKind::Vendor => submit::<VendorPayload>(&submitter, target, body, file).await?,
                AssetKind::Event => submit::<EventPayload>(&submitter, target, body, file).await?,
                AssetKind::Feedback => {
                    submit::<FeedbackPayload>(&submitter, target, body, file).await?
                }
            }
        }
        Command::SweepOrphans => {
            let orphans = open_orphans(cli.db_path.as_deref(), &config)?;
            let media: MediaStoreRef = Arc::new(BlobProxyClient::new(&config.site_url)?);
            let report = OrphanSweeper::new(media, orphans)
                .with_pause(config.sweep_pause)
                .sweep()
                .await?;
            serde_json::to_value(report)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn checkout(config: &AppConfig, cart: &str, customer: &str, yes: bool) -> Result<Value> {
    let items: Vec<CartItem> = read_json_arg(cart).await?;
    let customer: Customer = read_json_arg(customer).await?;
    let cart = CartStore::with_items(items).await?;

    let backend = Arc::new(BackendClient::new(&config.api_url, config.api_token.clone())?);
    let session = CheckoutSession::new(
        backend,
        Arc::new(ConsoleWidget::stdio().auto_confirm(yes)),
        verifier(config, cart.clone())?,
        cart.clone(),
        WidgetSettings {
            public_key: config.paystack_public_key.clone(),
            currency: config.currency.clone(),
        },
    );

    let request =
        OrderInitializationRequest::new(customer.email.clone(), cart.order_items().await, customer);
    let metadata = session.cart_metadata().await;

    match session.checkout(request, metadata).await {
        Ok(CheckoutOutcome::Cancelled { reference }) => Ok(json!({
            "outcome": "cancelled",
            "reference": reference,
        })),
        Ok(CheckoutOutcome::Verified(report)) => Ok(report_json(&report)),
        Err(e) => {
            warn!(error = %e, "checkout failed");
            Err(e)
        }
    }
}

async fn submit<P: AssetPayload>(
    submitter: &AssetSubmitter,
    target: SubmissionTarget,
    body: Value,
    file: Option<AssetFile>,
) -> Result<Value> {
    let payload: P = serde_json::from_value(body)
        .map_err(|e| CheckoutError::ValidationError(format!("invalid {} payload: {e}", P::KIND)))?;

    match submitter.submit(target, payload, file).await {
        Ok(receipt) => Ok(json!({
            "state": receipt.state,
            "id": receipt.record.id,
            "url": receipt.asset.map(|a| a.url),
            "replaced": receipt.replaced.map(|r| match r {
                ReplacedAsset::Deleted(url) => json!({ "deleted": url }),
                ReplacedAsset::Queued(url) => json!({ "queued": url }),
                ReplacedAsset::Unrecorded(url) => json!({ "unrecorded": url }),
            }),
        })),
        Err(failure) => {
            warn!(state = %failure.state, "submission failed");
            if let Some(url) = &failure.orphan {
                error!(%url, "uploaded asset is live and was not queued for cleanup");
            }
            Err(failure.error)
        }
    }
}

fn verifier(config: &AppConfig, cart: CartStore) -> Result<PaymentVerifier> {
    let api = Arc::new(BackendClient::new(&config.api_url, config.api_token.clone())?);
    Ok(PaymentVerifier::new(api, cart)
        .with_policy(config.verify)
        .with_redirect_delay(config.redirect_delay))
}

fn submitter(config: &AppConfig, orphans: OrphanRepositoryRef) -> Result<AssetSubmitter> {
    let media: MediaStoreRef = Arc::new(BlobProxyClient::new(&config.site_url)?);
    let records: RecordApiRef =
        Arc::new(BackendClient::new(&config.api_url, config.api_token.clone())?);
    Ok(AssetSubmitter::new(media, records, orphans).with_policy(config.upload.clone()))
}

fn report_json(report: &VerificationReport) -> Value {
    json!({
        "reference": report.reference,
        "state": report.state,
        "message": report.state.user_message(),
        "attempts": report.attempts,
        "redirect": report.redirect.as_ref().map(|r| r.path.clone()),
        "amountPaid": report.payment.as_ref().map(|p| p.amount_paid),
        "detail": report.detail,
    })
}

/// Picks the orphan queue backend. `--db-path` selects RocksDB when the
/// feature is compiled in; otherwise it falls back to the JSON file.
pub fn open_orphans(db_path: Option<&Path>, config: &AppConfig) -> Result<OrphanRepositoryRef> {
    match db_path {
        Some(path) => open_persistent(path, config),
        None => Ok(Arc::new(JsonFileOrphanRepository::new(&config.orphan_queue))),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_persistent(path: &Path, _config: &AppConfig) -> Result<OrphanRepositoryRef> {
    let store = crate::infrastructure::rocksdb::RocksDbOrphanRepository::open(path)?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_persistent(_path: &Path, config: &AppConfig) -> Result<OrphanRepositoryRef> {
    eprintln!(
        "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to the JSON orphan queue at {}.",
        config.orphan_queue.display()
    );
    Ok(Arc::new(JsonFileOrphanRepository::new(&config.orphan_queue)))
}

/// Accepts inline JSON, or a path to a file containing it.
async fn read_json_arg<T: DeserializeOwned>(arg: &str) -> Result<T> {
    let trimmed = arg.trim_start();
    let text = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        arg.to_string()
    } else {
        tokio::fs::read_to_string(arg).await?
    };
    serde_json::from_str(&text)
        .map_err(|e| CheckoutError::ValidationError(format!("invalid JSON argument: {e}")))
}
