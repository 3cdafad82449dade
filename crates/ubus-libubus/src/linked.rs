//! FFI binding to libubus

use nix::errno::Errno;
use std::cell::Cell;
use std::ffi::{c_char, c_int, c_void, CString};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::ptr::{self, NonNull};
use tracing::{debug, error};
use ubus_blob::{attr_len, BlobBuf, ATTR_HEADER_LEN};
use ubus_bus_api::BusConnection;
use ubus_util::{ServiceId, Status};

#[repr(C)]
struct UbusContext {
    _private: [u8; 0],
}

#[repr(C)]
struct UbusRequest {
    _private: [u8; 0],
}

#[repr(C)]
struct RawBlobAttr {
    _private: [u8; 0],
}

type DataHandler = extern "C" fn(req: *mut UbusRequest, kind: c_int, msg: *mut RawBlobAttr);

#[link(name = "ubus")]
unsafe extern "C" {
    fn ubus_connect(path: *const c_char) -> *mut UbusContext;
    fn ubus_free(ctx: *mut UbusContext);
    fn ubus_lookup_id(ctx: *mut UbusContext, path: *const c_char, id: *mut u32) -> c_int;
    fn ubus_invoke_fd(
        ctx: *mut UbusContext,
        obj: u32,
        method: *const c_char,
        msg: *mut RawBlobAttr,
        cb: Option<DataHandler>,
        private: *mut c_void,
        timeout: c_int,
        fd: c_int,
    ) -> c_int;
}

thread_local! {
    // Points at the `&mut dyn FnMut(&[u8])` of the invoke running on this thread
    static SINK: Cell<*mut c_void> = const { Cell::new(ptr::null_mut()) };
}

struct SinkGuard {
    previous: *mut c_void,
}

impl SinkGuard {
    fn install(slot: *mut c_void) -> Self {
        let previous = SINK.with(|sink| sink.replace(slot));
        Self { previous }
    }
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        SINK.with(|sink| sink.set(self.previous));
    }
}

extern "C" fn on_data(_req: *mut UbusRequest, _kind: c_int, msg: *mut RawBlobAttr) {
    let slot = SINK.with(Cell::get);
    if msg.is_null() || slot.is_null() {
        return;
    }

    // SAFETY: libubus passes a complete attribute whose header carries its
    // length; it stays valid for the duration of this callback.
    let raw = unsafe {
        let base = msg as *const u8;
        let mut header = [0u8; ATTR_HEADER_LEN];
        ptr::copy_nonoverlapping(base, header.as_mut_ptr(), ATTR_HEADER_LEN);
        let len = attr_len(header).max(ATTR_HEADER_LEN);
        std::slice::from_raw_parts(base, len)
    };

    // SAFETY: the slot was installed by `invoke` on this thread and outlives
    // the blocking call that delivers this message.
    let sink = unsafe { &mut *(slot as *mut &mut dyn FnMut(&[u8])) };
    if catch_unwind(AssertUnwindSafe(|| sink(raw))).is_err() {
        error!("Response handler panicked; message discarded");
    }
}

/// Copy into 4-byte aligned storage, as libubus reads the header as a `u32`
fn aligned_copy(bytes: &[u8]) -> Vec<u32> {
    let mut words = vec![0u32; bytes.len().div_ceil(4)];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks(4)) {
        let mut quad = [0u8; 4];
        quad[..chunk.len()].copy_from_slice(chunk);
        *word = u32::from_ne_bytes(quad);
    }
    words
}

/// Open libubus context
#[derive(Debug)]
pub struct LibUbusConnection {
    ctx: NonNull<UbusContext>,
}

impl LibUbusConnection {
    pub(crate) fn open(socket_path: &Path) -> io::Result<Self> {
        let path = CString::new(socket_path.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        Errno::clear();
        // SAFETY: `path` is a valid C string for the duration of the call.
        let ctx = unsafe { ubus_connect(path.as_ptr()) };

        match NonNull::new(ctx) {
            Some(ctx) => {
                debug!(socket = %socket_path.display(), "libubus context created");
                Ok(Self { ctx })
            }
            None => Err(match Errno::last_raw() {
                0 => io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    format!("cannot connect to ubus at {}", socket_path.display()),
                ),
                raw => io::Error::from_raw_os_error(raw),
            }),
        }
    }
}

impl BusConnection for LibUbusConnection {
    fn lookup_id(&mut self, path: &str) -> Result<ServiceId, Status> {
        let path = CString::new(path).map_err(|_| Status::InvalidArgument)?;
        let mut id = 0u32;

        // SAFETY: `ctx` is live until drop; `path` and `id` outlive the call.
        let ret = unsafe { ubus_lookup_id(self.ctx.as_ptr(), path.as_ptr(), &mut id) };

        match Status::from_code(ret) {
            Status::Ok => Ok(ServiceId::new(id)),
            status => Err(status),
        }
    }

    fn invoke(
        &mut self,
        id: ServiceId,
        method: &str,
        msg: &BlobBuf,
        on_message: &mut dyn FnMut(&[u8]),
        timeout_ms: u32,
    ) -> Status {
        let Ok(method) = CString::new(method) else {
            return Status::InvalidArgument;
        };
        let mut words = aligned_copy(msg.as_bytes());
        let timeout = c_int::try_from(timeout_ms).unwrap_or(c_int::MAX);

        let mut sink: &mut dyn FnMut(&[u8]) = on_message;
        let _guard = SinkGuard::install(&mut sink as *mut &mut dyn FnMut(&[u8]) as *mut c_void);

        // SAFETY: every pointer stays valid until the call returns, and
        // libubus only calls `on_data` from inside this call on this thread.
        let ret = unsafe {
            ubus_invoke_fd(
                self.ctx.as_ptr(),
                id.as_u32(),
                method.as_ptr(),
                words.as_mut_ptr().cast(),
                Some(on_data),
                ptr::null_mut(),
                timeout,
                -1,
            )
        };

        Status::from_code(ret)
    }
}

impl Drop for LibUbusConnection {
    fn drop(&mut self) {
        // SAFETY: `ctx` came from ubus_connect and is freed exactly once.
        unsafe { ubus_free(self.ctx.as_ptr()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_copy_preserves_bytes() {
        let bytes = [1u8, 2, 3, 4, 5, 6];
        let words = aligned_copy(&bytes);
        assert_eq!(words.len(), 2);

        let back: Vec<u8> = words.iter().flat_map(|w| w.to_ne_bytes()).collect();
        assert_eq!(&back[..6], &bytes);
        assert_eq!(&back[6..], &[0, 0]);
    }

    #[test]
    fn sink_guard_restores_previous_slot() {
        let mut first = 1u8;
        let outer = SinkGuard::install(&mut first as *mut u8 as *mut c_void);
        {
            let mut second = 2u8;
            let _inner = SinkGuard::install(&mut second as *mut u8 as *mut c_void);
            assert_eq!(SINK.with(Cell::get), &mut second as *mut u8 as *mut c_void);
        }
        assert_eq!(SINK.with(Cell::get), &mut first as *mut u8 as *mut c_void);
        drop(outer);
        assert!(SINK.with(Cell::get).is_null());
    }

    #[test]
    fn on_data_without_sink_is_ignored() {
        let buf = BlobBuf::new();
        let words = aligned_copy(buf.as_bytes());
        on_data(ptr::null_mut(), 0, words.as_ptr() as *mut RawBlobAttr);
    }
}
