//! Progress notifications emitted while a run advances.

use crate::state::RunStatus;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Generation,
    Execution,
    Correction,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Generation => "generation",
            Stage::Execution => "execution",
            Stage::Correction => "correction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub content: String,
    pub is_error: bool,
}

/// Receives progress events in emission order. Observers must not assume
/// they can influence the run.
pub trait ProgressObserver {
    fn on_event(&self, event: &ProgressEvent);

    fn on_status(&self, _status: RunStatus, _attempts: u32) {}
}

/// Fans events out to every attached observer. With no observers, emitting
/// is a no-op.
#[derive(Default)]
pub struct Notifier<'a> {
    observers: Vec<Box<dyn ProgressObserver + 'a>>,
}

impl<'a> Notifier<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(mut self, observer: impl ProgressObserver + 'a) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn emit(&self, stage: Stage, content: &str, is_error: bool) {
        let event = ProgressEvent {
            stage,
            content: content.to_string(),
            is_error,
        };
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }

    pub fn status(&self, status: RunStatus, attempts: u32) {
        for observer in &self.observers {
            observer.on_status(status, attempts);
        }
    }
}

impl<T: ProgressObserver + ?Sized> ProgressObserver for &T {
    fn on_event(&self, event: &ProgressEvent) {
        (**self).on_event(event);
    }

    fn on_status(&self, status: RunStatus, attempts: u32) {
        (**self).on_status(status, attempts);
    }
}

/// Forwards events over a channel so another thread can render them.
pub struct ChannelObserver {
    sender: Sender<ProgressEvent>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_event(&self, event: &ProgressEvent) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.sender.send(event.clone());
    }
}

pub fn channel() -> (ChannelObserver, Receiver<ProgressEvent>) {
    let (sender, receiver) = mpsc::channel();
    (ChannelObserver::new(sender), receiver)
}

/// Accumulates every event as a labelled block, for saving a run log.
#[derive(Debug, Default)]
pub struct RunJournal {
    entries: Mutex<Vec<String>>,
}

impl RunJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn render(&self) -> String {
        match self.entries.lock() {
            Ok(entries) => entries.join("\n---\n"),
            Err(poisoned) => poisoned.into_inner().join("\n---\n"),
        }
    }
}

impl ProgressObserver for RunJournal {
    fn on_event(&self, event: &ProgressEvent) {
        let stage = event.stage.as_str().to_uppercase();
        let entry = format!("[{stage}]\n{}\n", event.content);
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Notifier, ProgressEvent, ProgressObserver, RunJournal, Stage, channel};
    use crate::state::RunStatus;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<ProgressEvent>>,
        statuses: RefCell<Vec<(RunStatus, u32)>>,
    }

    impl ProgressObserver for Recorder {
        fn on_event(&self, event: &ProgressEvent) {
            self.events.borrow_mut().push(event.clone());
        }

        fn on_status(&self, status: RunStatus, attempts: u32) {
            self.statuses.borrow_mut().push((status, attempts));
        }
    }

    #[test]
    fn empty_notifier_is_a_no_op() {
        let notifier = Notifier::new();
        assert!(notifier.is_empty());
        notifier.emit(Stage::Generation, "code", false);
        notifier.status(RunStatus::Fixing, 1);
    }

    #[test]
    fn observers_see_events_in_order() {
        let recorder = Recorder::default();
        let notifier = Notifier::new().attach(&recorder);
        notifier.emit(Stage::Generation, "a", false);
        notifier.emit(Stage::Execution, "b", true);
        notifier.status(RunStatus::Fixing, 1);

        let events = recorder.events.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].stage, Stage::Generation);
        assert_eq!(events[1].content, "b");
        assert!(events[1].is_error);
        assert_eq!(*recorder.statuses.borrow(), vec![(RunStatus::Fixing, 1)]);
    }

    #[test]
    fn channel_observer_forwards_events() {
        let (observer, receiver) = channel();
        let notifier = Notifier::new().attach(observer);
        notifier.emit(Stage::Correction, "fixed", false);
        let event = receiver.recv().expect("event should arrive");
        assert_eq!(event.stage, Stage::Correction);
        assert_eq!(event.content, "fixed");
    }

    #[test]
    fn channel_observer_survives_dropped_receiver() {
        let (observer, receiver) = channel();
        drop(receiver);
        Notifier::new()
            .attach(observer)
            .emit(Stage::Execution, "nobody listens", false);
    }

    #[test]
    fn journal_renders_labelled_blocks() {
        let journal = RunJournal::new();
        {
            let notifier = Notifier::new().attach(&journal);
            notifier.emit(Stage::Generation, "console.log(1);", false);
            notifier.emit(Stage::Execution, "1", false);
        }
        assert_eq!(journal.len(), 2);
        insta::assert_snapshot!(journal.render(), @r"
        [GENERATION]
        console.log(1);

        ---
        [EXECUTION]
        1
        ");
    }
}
