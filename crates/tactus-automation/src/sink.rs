//! Mirroring automation onto a native renderer.
//!
//! Every write on a [`Param`](crate::Param) is forwarded to its sink as the
//! renderer's own primitive, so the renderer evaluates the exact curves the
//! host evaluates.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AutomationCommand {
    SetValueAtTime {
        value: f64,
        time: f64,
    },
    LinearRampToValueAtTime {
        value: f64,
        time: f64,
    },
    ExponentialRampToValueAtTime {
        value: f64,
        time: f64,
    },
    SetTargetAtTime {
        value: f64,
        time: f64,
        time_constant: f64,
    },
    SetValueCurveAtTime {
        values: Vec<f64>,
        time: f64,
        duration: f64,
    },
    CancelScheduledValues {
        time: f64,
    },
}

/// Receiver of mirrored automation commands.
pub trait AutomationSink: Send {
    fn apply(&mut self, command: &AutomationCommand);
}

impl<F> AutomationSink for F
where
    F: FnMut(&AutomationCommand) + Send,
{
    fn apply(&mut self, command: &AutomationCommand) {
        self(command)
    }
}

/// Forwards commands to another thread over a crossbeam channel.
///
/// Never blocks: commands that don't fit are dropped and logged.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<AutomationCommand>,
}

impl ChannelSink {
    pub fn new(tx: Sender<AutomationCommand>) -> Self {
        Self { tx }
    }

    pub fn bounded(capacity: usize) -> (Self, Receiver<AutomationCommand>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self::new(tx), rx)
    }

    pub fn unbounded() -> (Self, Receiver<AutomationCommand>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }
}

impl AutomationSink for ChannelSink {
    fn apply(&mut self, command: &AutomationCommand) {
        match self.tx.try_send(command.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(cmd)) => {
                tracing::warn!("Automation queue full, dropping {:?}", cmd);
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("Automation renderer disconnected");
            }
        }
    }
}
