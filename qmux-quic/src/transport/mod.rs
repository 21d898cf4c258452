//! Transport-level settings consumed by the stream core.

pub mod settings;

pub use settings::TransportSettings;
