//! Channel layer
//!
//! A channel is one logical link (serial port, UDP peer, radio). Each one
//! keeps its own parser and sequence counter; the registry maps small integer
//! ids to that state.

mod registry;
mod sink;
mod state;
#[cfg(feature = "debug-tools")]
mod tlog;

pub use registry::{ChannelRegistry, RegistryConfig};
pub use sink::{ByteSink, FnSink, WriteSink};
pub use state::{ChannelState, DefaultSink};
#[cfg(feature = "debug-tools")]
pub use tlog::TlogRecorder;
