//! Process-wide device and distributed-state accounting
//!
//! The engine owns exclusive hardware-adjacent resources: a device-memory
//! reservation and a distributed process group. Both are process-wide, so
//! acquisition goes through a [`ResourceLease`] backed by process globals.
//! One lease may be live at a time; releasing is explicit and idempotent,
//! with `Drop` as a backstop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use fornax::{Error, Result};

/// Exclusive device slot. Held from successful acquisition to release.
static DEVICE_SLOT_HELD: AtomicBool = AtomicBool::new(false);

/// World size of the initialized process group, when one exists.
static PROCESS_GROUP: Mutex<Option<usize>> = Mutex::new(None);

/// Whether the exclusive device slot is currently held.
#[must_use]
pub fn device_slot_held() -> bool {
    DEVICE_SLOT_HELD.load(Ordering::SeqCst)
}

/// World size of the live process group, if any.
#[must_use]
pub fn process_group_size() -> Option<usize> {
    *PROCESS_GROUP.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Owned reservation of the engine's process-wide resources.
#[derive(Debug)]
pub struct ResourceLease {
    model_id: String,
    memory_fraction: f32,
    world_size: usize,
    released: bool,
}

impl ResourceLease {
    /// Reserve the device slot and initialize the process group.
    ///
    /// Validation runs before anything is claimed, so a failed acquisition
    /// leaves no partial state behind.
    ///
    /// # Errors
    /// Returns [`Error::Initialization`] for an out-of-range memory
    /// fraction, or [`Error::ResourceConflict`] when another lease is live.
    pub fn acquire(model_id: &str, memory_fraction: f32, world_size: usize) -> Result<Self> {
        if !memory_fraction.is_finite() || memory_fraction <= 0.0 || memory_fraction > 1.0 {
            return Err(Error::Initialization(format!(
                "gpu_memory_utilization must be in (0, 1], got {memory_fraction}"
            )));
        }
        if DEVICE_SLOT_HELD
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::ResourceConflict(format!(
                "cannot initialize '{model_id}': another engine holds the device; tear it down first"
            )));
        }

        *PROCESS_GROUP
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(world_size);
        log::info!(
            "reserved {:.0}% of device memory and a process group of size {} for '{}'",
            memory_fraction * 100.0,
            world_size,
            model_id
        );

        Ok(Self {
            model_id: model_id.to_string(),
            memory_fraction,
            world_size,
            released: false,
        })
    }

    /// Fraction of device memory this lease reserves.
    #[must_use]
    pub fn memory_fraction(&self) -> f32 {
        self.memory_fraction
    }

    /// Size of the process group this lease initialized.
    #[must_use]
    pub fn world_size(&self) -> usize {
        self.world_size
    }

    /// Release the device slot and destroy the process group.
    ///
    /// Calling this more than once is a no-op.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        *PROCESS_GROUP
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        DEVICE_SLOT_HELD.store(false, Ordering::SeqCst);
        log::info!("released device memory and process group for '{}'", self.model_id);
    }
}

impl Drop for ResourceLease {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests share the process-wide device slot; serialise them.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn second_lease_conflicts_until_release() {
        let _guard = TEST_LOCK.lock().unwrap();
        let mut lease = ResourceLease::acquire("model-a", 0.5, 1).unwrap();
        assert!(device_slot_held());
        assert_eq!(process_group_size(), Some(1));
        assert!((lease.memory_fraction() - 0.5).abs() < f32::EPSILON);
        assert_eq!(lease.world_size(), 1);

        assert!(matches!(
            ResourceLease::acquire("model-b", 0.5, 1),
            Err(Error::ResourceConflict(_))
        ));

        lease.release();
        assert!(!device_slot_held());
        assert_eq!(process_group_size(), None);

        let second = ResourceLease::acquire("model-b", 0.5, 2).unwrap();
        assert_eq!(second.world_size(), 2);
    }

    #[test]
    fn release_is_idempotent_and_runs_on_drop() {
        let _guard = TEST_LOCK.lock().unwrap();
        let mut lease = ResourceLease::acquire("model-c", 1.0, 1).unwrap();
        lease.release();
        lease.release();
        assert!(!device_slot_held());
        drop(lease);
        assert!(!device_slot_held());

        {
            let _lease = ResourceLease::acquire("model-d", 0.25, 1).unwrap();
            assert!(device_slot_held());
        }
        assert!(!device_slot_held());
    }

    #[test]
    fn invalid_fraction_claims_nothing() {
        let _guard = TEST_LOCK.lock().unwrap();
        for fraction in [0.0, -1.0, 1.01] {
            assert!(matches!(
                ResourceLease::acquire("model-e", fraction, 1),
                Err(Error::Initialization(_))
            ));
            assert!(!device_slot_held());
            assert_eq!(process_group_size(), None);
        }
    }
}
