//! # qmux: Platform Layer for the Stream Multiplexing Core
//!
//! Everything the pure stream core in [`qmux_quic`] leaves to its
//! environment:
//!
//! - [`event_loop`] - the single-threaded, deadline-driven loop the
//!   transport schedules callbacks and timers on
//! - [`xsk`] - the AF_XDP kernel-bypass send path with batched descriptor
//!   submission and free-frame accounting
//! - [`config`] - TOML configuration mapped onto
//!   [`qmux_quic::TransportSettings`] and the sender knobs

pub mod config;
pub mod event_loop;
pub mod xsk;

pub use config::Config;
pub use event_loop::{EventBase, LoopCallbackHandle, TimerHandle};
