mod btleplug_backend;
mod fake_backend;
mod hardware;
mod model;
mod session;
mod transport;

pub use self::btleplug_backend::BtleplugTransport;
pub use self::fake_backend::{FakeDevice, FakeTransport};
pub use self::hardware::{HardwareBackend, transport_from_backend};
pub use self::model::CharacteristicInfo;
pub use self::session::ConnectionHandle;
pub use self::transport::{BleTransport, DisconnectCallback, NotificationCallback};
