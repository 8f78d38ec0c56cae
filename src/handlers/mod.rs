mod brightness;
mod frame_codec;
mod light_command;

pub use self::brightness::Brightness;
pub use self::frame_codec::{FrameCodec, FrameCodecError};
pub use self::light_command::{LightCommand, Rgb};
