// src/display/framebuffer.rs

//! Buffer surface management.
//!
//! Every GBM buffer object must be registered with the display controller
//! as a framebuffer before it can be scanned out. Registration is lazy
//! and cached: the first presentation of a buffer registers it, repeat
//! presentations hit the cache with no driver call. The cache owns the
//! mapping explicitly, keyed by the buffer's kernel handle; entries are
//! deregistered in one sweep when the session tears down. Buffers
//! themselves are never destroyed here; releasing one returns it to the
//! allocation surface's pool.

use log::{debug, trace, warn};
use std::collections::HashMap;
use std::io;

use drm::buffer::Buffer;
use drm::control::{framebuffer, Device as ControlDevice};
use gbm::BufferObject;

/// Explicit mapping from buffer identity to registered framebuffer id.
#[derive(Debug)]
pub struct FramebufferCache {
    depth: u32,
    bpp: u32,
    handles: HashMap<u32, framebuffer::Handle>,
}

impl FramebufferCache {
    pub fn new(depth: u32, bpp: u32) -> Self {
        Self {
            depth,
            bpp,
            handles: HashMap::new(),
        }
    }

    /// Resolves the framebuffer id for `bo`, registering it on first use.
    ///
    /// A cached hit is O(1) and issues no driver call. A rejected
    /// registration caches nothing, so the next attempt retries from
    /// scratch.
    pub fn handle_for<D: ControlDevice>(
        &mut self,
        device: &D,
        bo: &BufferObject<()>,
    ) -> io::Result<framebuffer::Handle> {
        let key: u32 = Buffer::handle(bo).into();
        let (depth, bpp) = (self.depth, self.bpp);
        self.lookup_or_register(key, || device.add_framebuffer(bo, depth, bpp))
    }

    /// Deregisters every cached framebuffer. Best-effort; runs once at
    /// session teardown, which is the explicit end of every buffer's
    /// display lifetime.
    pub fn clear<D: ControlDevice>(&mut self, device: &D) {
        self.evict_all(|handle| device.destroy_framebuffer(handle));
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    fn lookup_or_register(
        &mut self,
        key: u32,
        register: impl FnOnce() -> io::Result<framebuffer::Handle>,
    ) -> io::Result<framebuffer::Handle> {
        if let Some(&handle) = self.handles.get(&key) {
            trace!("framebuffer cache hit for buffer handle {}", key);
            return Ok(handle);
        }

        let handle = register()?;
        debug!("registered framebuffer {:?} for buffer handle {}", handle, key);
        self.handles.insert(key, handle);
        Ok(handle)
    }

    fn evict_all(&mut self, mut deregister: impl FnMut(framebuffer::Handle) -> io::Result<()>) {
        for (key, handle) in self.handles.drain() {
            if let Err(err) = deregister(handle) {
                warn!(
                    "failed to deregister framebuffer for buffer handle {}: {}",
                    key, err
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    fn fb(id: u32) -> framebuffer::Handle {
        framebuffer::Handle::from(NonZeroU32::new(id).unwrap())
    }

    #[test]
    fn second_lookup_returns_cached_handle_without_registering() {
        let mut cache = FramebufferCache::new(24, 32);
        let mut registrations = 0;

        let first = cache
            .lookup_or_register(7, || {
                registrations += 1;
                Ok(fb(100))
            })
            .unwrap();
        let second = cache
            .lookup_or_register(7, || {
                registrations += 1;
                Ok(fb(200))
            })
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(registrations, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_buffers_get_distinct_registrations() {
        let mut cache = FramebufferCache::new(24, 32);
        let a = cache.lookup_or_register(1, || Ok(fb(10))).unwrap();
        let b = cache.lookup_or_register(2, || Ok(fb(20))).unwrap();
        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn rejected_registration_caches_nothing() {
        let mut cache = FramebufferCache::new(24, 32);
        let result = cache.lookup_or_register(3, || {
            Err(io::Error::from_raw_os_error(libc::EINVAL))
        });
        assert!(result.is_err());
        assert!(cache.is_empty());

        // A later retry registers normally.
        let handle = cache.lookup_or_register(3, || Ok(fb(30))).unwrap();
        assert_eq!(handle, fb(30));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_deregisters_each_entry_exactly_once() {
        let mut cache = FramebufferCache::new(24, 32);
        cache.lookup_or_register(1, || Ok(fb(10))).unwrap();
        cache.lookup_or_register(2, || Ok(fb(20))).unwrap();

        let mut deregistered = Vec::new();
        cache.evict_all(|handle| {
            deregistered.push(handle);
            Ok(())
        });

        deregistered.sort_by_key(|h| u32::from(*h));
        assert_eq!(deregistered, vec![fb(10), fb(20)]);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_survives_deregistration_failures() {
        let mut cache = FramebufferCache::new(24, 32);
        cache.lookup_or_register(1, || Ok(fb(10))).unwrap();
        cache.evict_all(|_| Err(io::Error::from_raw_os_error(libc::ENODEV)));
        assert!(cache.is_empty());
    }
}
