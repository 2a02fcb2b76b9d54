//! Deferred deallocation for data replaced on the render thread
//!
//! A loaded `Source` can be hundreds of megabytes and a stretch engine owns
//! FFT buffers. When the renderer swaps either of them, the old value is
//! dropped inside the audio callback. Wrapping them in `basedrop::Shared` /
//! `basedrop::Owned` turns that drop into a pointer enqueue; the memory is
//! released later on the `padchop-gc` thread.
//!
//! ```ignore
//! use basedrop::Shared;
//! use padchop_core::engine::gc_handle;
//!
//! let source = Shared::new(&gc_handle(), source);
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// Interval between collection passes
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    // Collector is !Sync, so it is created on and never leaves its own thread
    thread::Builder::new()
        .name("padchop-gc".to_string())
        .spawn(move || {
            let mut collector = Collector::new();
            tx.send(collector.handle()).expect("GC handle receiver dropped");

            log::debug!("padchop GC thread started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("Failed to spawn padchop GC thread");

    rx.recv().expect("Failed to receive GC handle")
}

/// Handle for creating `Shared<T>` / `Owned<T>` allocations
///
/// The collector thread is started lazily on first use.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::Shared;

    #[test]
    fn test_shared_drop_is_deferred_safely() {
        let data = Shared::new(&gc_handle(), vec![0.0f32; 1024]);
        let clone = data.clone();
        assert_eq!(clone.len(), 1024);
        drop(data);
        drop(clone);
    }
}
