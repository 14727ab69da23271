use crate::domain::payment::{WidgetConfig, WidgetOutcome};
use crate::domain::ports::PaymentWidget;
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};

type Input = Box<dyn BufRead + Send>;
type Output = Box<dyn Write + Send>;

/// Terminal stand-in for the hosted payment widget.
///
/// Prints the widget configuration and asks the operator to confirm that
/// the charge went through. `y`/`yes` reports success for the configured
/// reference; anything else (including end of input) counts as closing
/// the widget.
#[derive(Clone)]
pub struct ConsoleWidget {
    io: Arc<Mutex<(Input, Output)>>,
    auto_confirm: bool,
}

impl ConsoleWidget {
    pub fn stdio() -> Self {
        Self::with_io(
            std::io::BufReader::new(std::io::stdin()),
            std::io::stderr(),
        )
    }

    pub fn with_io(input: impl BufRead + Send + 'static, output: impl Write + Send + 'static) -> Self {
        Self {
            io: Arc::new(Mutex::new((Box::new(input), Box::new(output)))),
            auto_confirm: false,
        }
    }

    /// Skips the prompt and reports success straight away.
    pub fn auto_confirm(mut self, yes: bool) -> Self {
        self.auto_confirm = yes;
        self
    }
}

#[async_trait]
impl PaymentWidget for ConsoleWidget {
    async fn open(&self, config: WidgetConfig) -> Result<WidgetOutcome> {
        let io = self.io.clone();
        let auto_confirm = self.auto_confirm;

        tokio::task::spawn_blocking(move || -> Result<WidgetOutcome> {
            let mut guard = io
                .lock()
                .map_err(|_| CheckoutError::InternalError("console widget lock poisoned".into()))?;
            let (input, output) = &mut *guard;

            writeln!(output, "{}", serde_json::to_string_pretty(&config)?)?;
            if auto_confirm {
                return Ok(WidgetOutcome::Success {
                    reference: config.reference,
                });
            }

            write!(output, "Complete payment of {} {}? [y/N] ", config.amount, config.currency)?;
            output.flush()?;

            let mut answer = String::new();
            input.read_line(&mut answer)?;
            match answer.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => Ok(WidgetOutcome::Success {
                    reference: config.reference,
                }),
                _ => Ok(WidgetOutcome::Closed),
            }
        })
        .await
        .map_err(|e| CheckoutError::InternalError(Box::new(e)))?
    }
}
