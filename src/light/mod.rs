mod notifier;
mod session;
mod state;

pub use self::notifier::ChangeCallback;
pub use self::session::{LightSession, RefreshOutcome, SessionTiming};
pub use self::state::{ColorMode, LightSnapshot};
