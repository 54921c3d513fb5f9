//! Lighting engine and device control for K65 Plus keyboards
//!
//! Sits on top of any [`k65_transport::Transport`]: renders or offloads
//! lighting effects, keeps the device in software mode, and reacts to the
//! volume dial.

pub mod color;
pub mod device;
pub mod dial;
pub mod effect;
pub mod engine;
pub mod error;
pub mod layout;
pub mod model;
pub mod profile;
pub mod render;
pub mod scheduler;
pub mod telemetry;
pub mod writer;

pub use color::Color;
pub use device::{Collaborators, DeviceIdentity, Keyboard, KeyboardOptions};
pub use dial::{DialAction, DialListener, DialState, VolumeControl};
pub use effect::{EffectCatalog, EffectDescriptor, EffectKind, EffectSettings};
pub use engine::{AnimationEngine, CancelToken, EngineContext, EngineStatus, StartOutcome};
pub use error::{EngineError, KeyboardError};
pub use layout::{KeyPosition, LayoutCatalog, NoLayouts};
pub use model::{KeyboardModel, OffloadTrigger, Strategy};
pub use profile::{
    BrightnessMode, DeviceProfile, DialBinding, KeyEntry, KeyScope, KeyboardMap, ProfileCell,
    ProfileStore,
};
pub use render::{ChannelBuffer, Renderer};
pub use scheduler::{PeriodicTask, Scheduler};
pub use telemetry::{TemperatureCache, TemperatureSource, Temperatures};
pub use writer::ColorWriter;
