pub mod controller;
pub mod observer;
pub mod state;

pub use controller::{SessionController, SessionOptions};
pub use observer::{ChannelObserver, SessionEvent, SessionObserver, Subscription};
pub use state::{
    SessionConfig, SessionCore, SessionProgress, SessionSnapshot, SessionState, SoundscapeId,
};
