//! # AF_XDP Fast-Path Sender
//!
//! Batched datagram sink over an AF_XDP socket. The transport leases UMEM
//! frames, writes QUIC packets into them past the reserved header area, and
//! hands them back for transmission; this module owns the TX descriptor
//! ring, the completion ring, and the free-frame inventory.
//!
//! Threading: the sender runs beside the event loop on its own terms. One
//! mutex protects the free-frame stack and ring bookkeeping; ring memory
//! shared with the kernel is touched with acquire/release atomics.

use crate::xsk::packet;
use anyhow::{bail, Context, Result};
use bytes::Bytes;
use std::collections::VecDeque;
use std::ffi::CString;
use std::net::SocketAddr;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tracing::{debug, warn};

// AF_XDP uapi surface (linux/if_xdp.h). Defined here so builds do not
// depend on the libc crate's coverage of these additions.
const XDP_UMEM_REG: libc::c_int = 4;
const XDP_UMEM_FILL_RING: libc::c_int = 5;
const XDP_UMEM_COMPLETION_RING: libc::c_int = 6;
const XDP_TX_RING: libc::c_int = 3;
const XDP_MMAP_OFFSETS: libc::c_int = 1;

const XDP_PGOFF_TX_RING: libc::off_t = 0x80000000;
const XDP_UMEM_PGOFF_COMPLETION_RING: libc::off_t = 0x180000000;

const XDP_USE_NEED_WAKEUP: u16 = 1 << 3;
const XDP_RING_NEED_WAKEUP: u32 = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct XdpRingOffset {
    producer: u64,
    consumer: u64,
    desc: u64,
    flags: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct XdpMmapOffsets {
    rx: XdpRingOffset,
    tx: XdpRingOffset,
    fr: XdpRingOffset,
    cr: XdpRingOffset,
}

#[repr(C)]
struct XdpUmemReg {
    addr: u64,
    len: u64,
    chunk_size: u32,
    headroom: u32,
    flags: u32,
}

#[repr(C)]
struct XdpDesc {
    addr: u64,
    len: u32,
    options: u32,
}

#[repr(C)]
struct SockaddrXdp {
    sxdp_family: u16,
    sxdp_flags: u16,
    sxdp_ifindex: u32,
    sxdp_queue_id: u32,
    sxdp_shared_umem_fd: u32,
}

/// Outcome of a direct send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    Success,
    NoFreeDescriptors,
}

/// Outcome of a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushResult {
    Success,
    FailedSendto,
}

/// A leased UMEM frame. `payload_mut` points past the reserved
/// ethernet/IP/UDP header area; fill it, set `payload_len`, and hand the
/// buffer to [`XskSender::write_buffer`] or [`XskSender::return_buffer`].
pub struct XskBuffer {
    pub frame_index: u32,
    pub payload_len: u16,
    payload: NonNull<u8>,
    payload_capacity: usize,
}

impl XskBuffer {
    pub fn payload_mut(&mut self) -> &mut [u8] {
        // SAFETY: the sender leases each frame to at most one holder, and
        // the pointer stays valid for the sender's lifetime.
        unsafe { std::slice::from_raw_parts_mut(self.payload.as_ptr(), self.payload_capacity) }
    }
}

// SAFETY: the payload pointer targets a frame exclusively leased to this
// buffer; nothing else touches it until the buffer is handed back.
unsafe impl Send for XskBuffer {}

/// Sender configuration.
#[derive(Debug, Clone)]
pub struct XskSenderConfig {
    pub interface: String,
    pub queue_id: u32,
    pub num_frames: u32,
    pub frame_size: u32,
    pub batch_size: u32,
    pub local_mac: [u8; 6],
    pub gateway_mac: [u8; 6],
}

struct SenderState {
    free_frames: VecDeque<u32>,
    tx_producer: u32,
    cr_consumer: u32,
    packets_in_batch: u32,
}

pub struct XskSender {
    fd: libc::c_int,
    umem: NonNull<u8>,
    umem_len: usize,
    tx_map: NonNull<u8>,
    tx_map_len: usize,
    cx_map: NonNull<u8>,
    cx_map_len: usize,
    offsets: XdpMmapOffsets,
    num_frames: u32,
    frame_size: u32,
    batch_size: u32,
    local_mac: [u8; 6],
    gateway_mac: [u8; 6],
    state: Mutex<SenderState>,
}

// SAFETY: all shared mutable state is behind `state`; ring memory shared
// with the kernel is only accessed through atomics.
unsafe impl Send for XskSender {}
unsafe impl Sync for XskSender {}

impl XskSender {
    /// Create the AF_XDP socket, register the UMEM, and map the TX and
    /// completion rings. The socket still needs [`XskSender::bind`] before
    /// traffic flows.
    pub fn new(config: XskSenderConfig) -> Result<Self> {
        if !config.num_frames.is_power_of_two() || !config.frame_size.is_power_of_two() {
            bail!("num_frames and frame_size must be powers of two");
        }

        let fd = unsafe { libc::socket(libc::AF_XDP, libc::SOCK_RAW, 0) };
        if fd < 0 {
            return Err(std::io::Error::last_os_error()).context("creating AF_XDP socket");
        }

        // Everything below returns through `init` so the fd and mappings
        // are torn down on failure.
        match Self::init(fd, &config) {
            Ok(sender) => Ok(sender),
            Err(err) => {
                unsafe { libc::close(fd) };
                Err(err)
            }
        }
    }

    fn init(fd: libc::c_int, config: &XskSenderConfig) -> Result<Self> {
        let umem_len = config.num_frames as usize * config.frame_size as usize;
        let umem = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                umem_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_POPULATE,
                -1,
                0,
            )
        };
        if umem == libc::MAP_FAILED {
            return Err(std::io::Error::last_os_error()).context("allocating umem");
        }
        let umem = NonNull::new(umem as *mut u8).expect("mmap returned non-null");

        let reg = XdpUmemReg {
            addr: umem.as_ptr() as u64,
            len: umem_len as u64,
            chunk_size: config.frame_size,
            headroom: 0,
            flags: 0,
        };
        setsockopt(fd, XDP_UMEM_REG, &reg).context("registering umem")?;
        setsockopt(fd, XDP_UMEM_FILL_RING, &config.num_frames).context("sizing fill ring")?;
        setsockopt(fd, XDP_UMEM_COMPLETION_RING, &config.num_frames)
            .context("sizing completion ring")?;
        setsockopt(fd, XDP_TX_RING, &config.num_frames).context("sizing tx ring")?;

        let mut offsets = XdpMmapOffsets::default();
        let mut optlen = std::mem::size_of::<XdpMmapOffsets>() as libc::socklen_t;
        let ret = unsafe {
            libc::getsockopt(
                fd,
                libc::SOL_XDP,
                XDP_MMAP_OFFSETS,
                &mut offsets as *mut _ as *mut libc::c_void,
                &mut optlen,
            )
        };
        if ret < 0 {
            return Err(std::io::Error::last_os_error()).context("reading mmap offsets");
        }

        let tx_map_len =
            offsets.tx.desc as usize + config.num_frames as usize * std::mem::size_of::<XdpDesc>();
        let tx_map = map_ring(fd, tx_map_len, XDP_PGOFF_TX_RING).context("mapping tx ring")?;

        let cx_map_len = offsets.cr.desc as usize + config.num_frames as usize * 8;
        let cx_map = map_ring(fd, cx_map_len, XDP_UMEM_PGOFF_COMPLETION_RING)
            .context("mapping completion ring")?;

        debug!(
            interface = %config.interface,
            frames = config.num_frames,
            frame_size = config.frame_size,
            "xsk sender initialized"
        );

        Ok(Self {
            fd,
            umem,
            umem_len,
            tx_map,
            tx_map_len,
            cx_map,
            cx_map_len,
            offsets,
            num_frames: config.num_frames,
            frame_size: config.frame_size,
            batch_size: config.batch_size.max(1),
            local_mac: config.local_mac,
            gateway_mac: config.gateway_mac,
            state: Mutex::new(SenderState {
                free_frames: (0..config.num_frames).collect(),
                tx_producer: 0,
                cr_consumer: 0,
                packets_in_batch: 0,
            }),
        })
    }

    /// Bind the socket to its interface queue.
    pub fn bind(&self, config: &XskSenderConfig) -> Result<()> {
        let ifname = CString::new(config.interface.as_str()).context("interface name")?;
        let ifindex = unsafe { libc::if_nametoindex(ifname.as_ptr()) };
        if ifindex == 0 {
            return Err(std::io::Error::last_os_error())
                .with_context(|| format!("resolving interface {}", config.interface));
        }
        let addr = SockaddrXdp {
            sxdp_family: libc::AF_XDP as u16,
            sxdp_flags: XDP_USE_NEED_WAKEUP,
            sxdp_ifindex: ifindex,
            sxdp_queue_id: config.queue_id,
            sxdp_shared_umem_fd: 0,
        };
        let ret = unsafe {
            libc::bind(
                self.fd,
                &addr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<SockaddrXdp>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(std::io::Error::last_os_error()).context("binding xdp socket");
        }
        Ok(())
    }

    /// Lease a free UMEM frame, its payload cursor already offset past the
    /// header area for the given family. Returns `None` when no frame is
    /// free even after draining completions.
    pub fn get_buffer(&self, is_ipv6: bool) -> Option<XskBuffer> {
        let mut state = self.state.lock().expect("xsk state poisoned");
        if state.free_frames.len() as u32 <= self.num_frames / 2 {
            self.drain_completions(&mut state);
        }
        let frame_index = state.free_frames.pop_front()?;
        let room = packet::header_room(is_ipv6);
        // SAFETY: frame_index < num_frames, so the offset is inside the
        // umem mapping and the frame is exclusively leased.
        let payload = unsafe {
            NonNull::new_unchecked(
                self.umem
                    .as_ptr()
                    .add(frame_index as usize * self.frame_size as usize + room),
            )
        };
        Some(XskBuffer {
            frame_index,
            payload_len: 0,
            payload,
            payload_capacity: self.frame_size as usize - room,
        })
    }

    /// Write the datagram envelope around the buffer's payload and enqueue
    /// a TX descriptor. Flushes automatically once a batch is full.
    pub fn write_buffer(&self, buffer: XskBuffer, peer: SocketAddr, src: SocketAddr) {
        let frame_start = buffer.frame_index as usize * self.frame_size as usize;
        // SAFETY: the leased frame is exclusively ours until the descriptor
        // is handed to the kernel below.
        let frame = unsafe {
            std::slice::from_raw_parts_mut(
                self.umem.as_ptr().add(frame_start),
                self.frame_size as usize,
            )
        };
        let total_len = packet::write_datagram_headers(
            frame,
            self.local_mac,
            self.gateway_mac,
            src,
            peer,
            buffer.payload_len,
        );

        let mut state = self.state.lock().expect("xsk state poisoned");
        self.push_descriptor(&mut state, frame_start as u64, total_len as u32);
        state.packets_in_batch += 1;
        if state.packets_in_batch >= self.batch_size {
            state.packets_in_batch = 0;
            self.flush_locked(&state);
        }
    }

    /// Release a leased frame without transmitting.
    pub fn return_buffer(&self, buffer: XskBuffer) {
        let mut state = self.state.lock().expect("xsk state poisoned");
        state.free_frames.push_back(buffer.frame_index);
    }

    /// Copy `data` into a frame and transmit it. Convenience path for
    /// callers that do not build packets in place.
    pub fn write_udp_packet(&self, peer: SocketAddr, src: SocketAddr, data: &[u8]) -> SendResult {
        let Some(mut buffer) = self.get_buffer(peer.is_ipv6()) else {
            return SendResult::NoFreeDescriptors;
        };
        if data.len() > buffer.payload_mut().len() {
            self.return_buffer(buffer);
            warn!(len = data.len(), "payload exceeds frame capacity");
            return SendResult::NoFreeDescriptors;
        }
        buffer.payload_mut()[..data.len()].copy_from_slice(data);
        buffer.payload_len = data.len() as u16;
        self.write_buffer(buffer, peer, src);
        SendResult::Success
    }

    /// [`Self::write_udp_packet`] for reference-counted payloads.
    pub fn write_udp_packet_buf(
        &self,
        peer: SocketAddr,
        src: SocketAddr,
        data: &Bytes,
    ) -> SendResult {
        self.write_udp_packet(peer, src, data)
    }

    /// Publish the producer index and wake the kernel if the ring asks for
    /// it.
    pub fn flush(&self) -> FlushResult {
        let state = self.state.lock().expect("xsk state poisoned");
        self.flush_locked(&state)
    }

    fn flush_locked(&self, state: &SenderState) -> FlushResult {
        // SAFETY: offsets.tx.* point inside the tx ring mapping.
        unsafe {
            let producer =
                self.tx_map.as_ptr().add(self.offsets.tx.producer as usize) as *const AtomicU32;
            (*producer).store(state.tx_producer, Ordering::Release);

            let flags = self.tx_map.as_ptr().add(self.offsets.tx.flags as usize) as *const AtomicU32;
            if (*flags).load(Ordering::Acquire) & XDP_RING_NEED_WAKEUP == 0 {
                return FlushResult::Success;
            }
        }

        let ret = unsafe {
            libc::sendto(
                self.fd,
                std::ptr::null(),
                0,
                libc::MSG_DONTWAIT,
                std::ptr::null(),
                0,
            )
        };
        if ret < 0 {
            return FlushResult::FailedSendto;
        }
        FlushResult::Success
    }

    fn push_descriptor(&self, state: &mut SenderState, addr: u64, len: u32) {
        // SAFETY: descriptor slots live inside the tx ring mapping; the
        // producer index is only published in flush_locked.
        unsafe {
            let base = self.tx_map.as_ptr().add(self.offsets.tx.desc as usize) as *mut XdpDesc;
            let slot = base.add((state.tx_producer % self.num_frames) as usize);
            (*slot).addr = addr;
            (*slot).len = len;
            (*slot).options = 0;
        }
        state.tx_producer = state.tx_producer.wrapping_add(1);
    }

    // Reclaim transmitted frames from the completion ring.
    fn drain_completions(&self, state: &mut SenderState) {
        // SAFETY: offsets.cr.* point inside the completion ring mapping.
        unsafe {
            let producer =
                self.cx_map.as_ptr().add(self.offsets.cr.producer as usize) as *const AtomicU32;
            let cr_producer = (*producer).load(Ordering::Acquire);
            let base = self.cx_map.as_ptr().add(self.offsets.cr.desc as usize) as *const u64;

            let entries = cr_producer.wrapping_sub(state.cr_consumer);
            for _ in 0..entries {
                let desc = *base.add((state.cr_consumer % self.num_frames) as usize);
                state
                    .free_frames
                    .push_back((desc / self.frame_size as u64) as u32);
                state.cr_consumer = state.cr_consumer.wrapping_add(1);
            }

            let consumer =
                self.cx_map.as_ptr().add(self.offsets.cr.consumer as usize) as *const AtomicU32;
            (*consumer).store(state.cr_consumer, Ordering::Release);
        }
    }
}

impl Drop for XskSender {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.tx_map.as_ptr() as *mut libc::c_void, self.tx_map_len);
            libc::munmap(self.cx_map.as_ptr() as *mut libc::c_void, self.cx_map_len);
            libc::munmap(self.umem.as_ptr() as *mut libc::c_void, self.umem_len);
            libc::close(self.fd);
        }
    }
}

fn setsockopt<T>(fd: libc::c_int, option: libc::c_int, value: &T) -> Result<()> {
    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_XDP,
            option,
            value as *const _ as *const libc::c_void,
            std::mem::size_of::<T>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

fn map_ring(fd: libc::c_int, len: usize, pgoff: libc::off_t) -> Result<NonNull<u8>> {
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED | libc::MAP_POPULATE,
            fd,
            pgoff,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(NonNull::new(ptr as *mut u8).expect("mmap returned non-null"))
}
