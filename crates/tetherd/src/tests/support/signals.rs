//! In-process signal delivery for router and controller tests.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::process::ExitHook;
use crate::{ControlSignal, RouterError, SignalSource, SignalStream, Subscription};

/// Signal source fed through a channel.
///
/// The source may be subscribed to once; the paired [`SignalSender`]
/// injects signals from any thread, including the worker itself.
#[derive(Debug)]
pub struct ChannelSignalSource {
    sender: Sender<Option<ControlSignal>>,
    receiver: Mutex<Option<Receiver<Option<ControlSignal>>>>,
}

/// Injects signals into a [`ChannelSignalSource`].
#[derive(Debug, Clone)]
pub struct SignalSender(Sender<Option<ControlSignal>>);

impl SignalSender {
    /// Queues `signal` for the router. Sends after the router has gone are
    /// ignored.
    pub fn send(&self, signal: ControlSignal) {
        let _ = self.0.send(Some(signal));
    }
}

impl ChannelSignalSource {
    /// Builds the source together with its sender.
    pub fn new() -> (Self, SignalSender) {
        let (sender, receiver) = mpsc::channel();
        let handle = SignalSender(sender.clone());
        (
            Self {
                sender,
                receiver: Mutex::new(Some(receiver)),
            },
            handle,
        )
    }
}

impl SignalSource for ChannelSignalSource {
    fn subscribe(&self) -> Result<Subscription, RouterError> {
        let receiver = self
            .receiver
            .lock()
            .expect("signal source mutex poisoned")
            .take()
            .expect("channel signal source subscribed twice");
        let closer = self.sender.clone();
        Ok(Subscription::new(
            Box::new(ChannelStream(receiver)),
            Box::new(move || {
                let _ = closer.send(None);
            }),
        ))
    }
}

struct ChannelStream(Receiver<Option<ControlSignal>>);

impl SignalStream for ChannelStream {
    fn next_signal(&mut self) -> Option<ControlSignal> {
        self.0.recv().ok().flatten()
    }
}

/// Signal source whose handler installation always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSignalSource;

impl SignalSource for FailingSignalSource {
    fn subscribe(&self) -> Result<Subscription, RouterError> {
        Err(RouterError::Install {
            source: std::io::Error::other("signal handlers unavailable"),
        })
    }
}

/// Records forced exits instead of terminating the test process.
#[derive(Debug, Clone, Default)]
pub struct RecordingExit {
    inner: Arc<(Mutex<Vec<i32>>, Condvar)>,
}

impl RecordingExit {
    /// Hook to hand to the router.
    pub fn hook(&self) -> ExitHook {
        let recorder = self.clone();
        Arc::new(move |code| {
            let (codes, changed) = &*recorder.inner;
            codes.lock().expect("exit mutex poisoned").push(code);
            changed.notify_all();
        })
    }

    /// Exit codes recorded so far.
    pub fn codes(&self) -> Vec<i32> {
        self.inner.0.lock().expect("exit mutex poisoned").clone()
    }

    /// Blocks until a forced exit is recorded or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (codes, changed) = &*self.inner;
        let guard = codes.lock().expect("exit mutex poisoned");
        let (guard, _) = changed
            .wait_timeout_while(guard, timeout, |codes| codes.is_empty())
            .expect("exit mutex poisoned");
        !guard.is_empty()
    }
}
