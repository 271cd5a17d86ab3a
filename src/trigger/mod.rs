pub mod gpio_button;
pub mod keyboard;

pub use gpio_button::GpioButton;
pub use keyboard::KeyboardTrigger;

use crate::config::{TriggerConfiguration, TriggerKind};
use crate::error::TriggerError;
use tokio::sync::mpsc::{error::TrySendError, Sender};

/// Edge reported by a trigger line. Only `Pressed` starts a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    Pressed,
    Released,
}

/// An edge-triggered input such as the doorbell-style button.
///
/// `open` hands the source the channel its edges are delivered on and claims
/// the underlying line; `close` gives the line back. Closing an already closed
/// source reports [`TriggerError::AlreadyClosed`].
pub trait TriggerSource: Send {
    fn name(&self) -> &'static str;
    fn open(&mut self, events: Sender<TriggerEvent>) -> Result<(), TriggerError>;
    fn close(&mut self) -> Result<(), TriggerError>;
}

pub fn from_configuration(configuration: &TriggerConfiguration) -> Box<dyn TriggerSource> {
    match configuration.kind {
        TriggerKind::Gpio => Box::new(GpioButton::new(
            configuration.gpio_line,
            configuration.gpio_root.clone(),
            configuration.active_low,
            configuration.poll_interval(),
        )),
        TriggerKind::Keyboard => Box::new(KeyboardTrigger::stdin()),
    }
}

/// Pushes an edge without blocking the reader thread. Returns false once the
/// receiving side is gone.
pub(crate) fn deliver(events: &Sender<TriggerEvent>, event: TriggerEvent) -> bool {
    match events.try_send(event) {
        Ok(_) => true,
        Err(TrySendError::Full(_)) => {
            // Drop the edge rather than stall the line reader
            tracing::warn!("Dropping trigger event {:?}: channel full", event);
            true
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!("Trigger channel closed, stopping line reader");
            false
        }
    }
}
