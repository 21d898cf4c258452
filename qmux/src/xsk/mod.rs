//! # Kernel-Bypass UDP Send Path (AF_XDP)
//!
//! Zero-copy datagram transmission through a shared UMEM region. The
//! scaffolding writer is portable and unit-tested everywhere; the socket
//! and ring plumbing is Linux-only.

pub mod packet;

#[cfg(target_os = "linux")]
pub mod sender;

#[cfg(target_os = "linux")]
pub use sender::{FlushResult, SendResult, XskBuffer, XskSender, XskSenderConfig};
