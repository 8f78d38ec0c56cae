use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

/// Callback invoked whenever the observable light state changes.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Single-slot change notifier owned by a light session.
///
/// Callbacks run on the notification path and must return promptly; treat
/// them as a signal to schedule a redraw, not as a place to do work.
#[derive(Default)]
pub(crate) struct ChangeNotifier {
    callback: RwLock<Option<ChangeCallback>>,
}

impl ChangeNotifier {
    /// Installs the callback, replacing any previous one.
    pub(crate) fn set(&self, callback: ChangeCallback) {
        match self.callback.write() {
            Ok(mut slot) => *slot = Some(callback),
            Err(poisoned) => *poisoned.into_inner() = Some(callback),
        }
    }

    /// Invokes the callback, if one is installed.
    pub(crate) fn fire(&self) {
        let callback = match self.callback.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        match callback {
            Some(callback) => {
                trace!("dispatching change notification");
                callback();
            }
            None => debug!("state changed but no change callback is installed"),
        }
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let installed = self
            .callback
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false);
        f.debug_struct("ChangeNotifier")
            .field("installed", &installed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fire_without_callback_is_a_no_op() {
        let notifier = ChangeNotifier::default();
        notifier.fire();
    }

    #[test]
    fn fire_invokes_latest_callback() {
        let notifier = ChangeNotifier::default();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first);
        notifier.set(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        notifier.fire();

        let counter = Arc::clone(&second);
        notifier.set(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        notifier.fire();
        notifier.fire();

        assert_eq!(1, first.load(Ordering::SeqCst));
        assert_eq!(2, second.load(Ordering::SeqCst));
    }
}
