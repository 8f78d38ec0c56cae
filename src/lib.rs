mod app;
mod cli;
mod effects;
mod error;
mod handlers;
mod hw;
mod light;
mod notification;
mod protocol;
mod telemetry;
mod terminal;
mod utils;

pub use app::{RunOptions, open_session, run, run_with_clients, run_with_options};
pub use cli::{
    Args, ColourArgs, Command, DecodeArgs, DeviceTarget, EffectArgs, HexPayload, LevelArgs,
    LogLevel, OutputFormat, WatchArgs,
};
pub use effects::EffectCatalog;
pub use error::{FixtureError, InteractionError, ProtocolError};
pub use handlers::{Brightness, FrameCodec, FrameCodecError, LightCommand, Rgb};
pub use hw::{
    BleTransport, BtleplugTransport, CharacteristicInfo, ConnectionHandle, DisconnectCallback,
    FakeDevice, FakeTransport, HardwareBackend, NotificationCallback, transport_from_backend,
};
pub use light::{ChangeCallback, ColorMode, LightSession, LightSnapshot, RefreshOutcome, SessionTiming};
pub use notification::{ColorStatus, NotificationHandler, ParsedStatus, WhiteStatus};
pub use protocol::{Channel, EndpointId, NOTIFY_CHARACTERISTIC_UUID, ReplyVersion, WRITE_CHARACTERISTIC_UUID};
pub use terminal::TerminalClient;
