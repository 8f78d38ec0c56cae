mod light_view;
mod offline_view;
mod painter;
mod table;

pub(crate) use self::light_view::{LightView, WatchLineView};
pub(crate) use self::offline_view::{DecodeView, EffectsView};
pub(crate) use self::painter::Painter;
