pub(crate) mod command;
pub(crate) mod control;
pub(crate) mod offline;
pub(crate) mod ui;
pub(crate) mod watch;

pub use self::command::{Args, Command, DeviceTarget, HexPayload, LogLevel, OutputFormat};
pub use self::control::{ColourArgs, EffectArgs, LevelArgs};
pub use self::offline::DecodeArgs;
pub use self::watch::WatchArgs;
