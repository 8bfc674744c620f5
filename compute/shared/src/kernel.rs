//! Bookkeeping of compiled simulation kernels
//!
//! The simulation kernel is specialized for the set of masks that coefficients
//! currently use. Changing a coefficient's value range does not affect the
//! kernel's structure, but changing its mask does, so a new kernel must be
//! compiled. [`KernelCache`] tracks which mask layout the current kernel was
//! built for, and only triggers compilation when that layout changes.

use data::coefficients::{Coefficients, MaskLayout};
#[allow(unused_imports)]
use log::{debug, error, info, log, trace, warn};
use std::fmt;

/// Identity of a compiled kernel
///
/// Every compilation produces a kernel with a new identity, so two kernels with
/// the same identity are the same kernel.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct KernelId(u64);
//
impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kernel #{}", self.0)
    }
}

/// Outcome of [`KernelCache::update()`]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KernelUpdate {
    /// The current kernel can handle the new coefficients
    Reused(KernelId),

    /// A new kernel was compiled and the previous one was released
    Compiled(KernelId),
}
//
impl KernelUpdate {
    /// Identity of the kernel that is now current
    pub fn id(self) -> KernelId {
        match self {
            Self::Reused(id) | Self::Compiled(id) => id,
        }
    }
}

/// Single-entry cache of the compiled kernel, keyed by mask layout
pub struct KernelCache<K> {
    /// Kernel that is currently in use
    current: Cached<K>,

    /// Identity that the next compiled kernel will get
    next_id: u64,
}
//
/// Kernel that is currently in use, along with what it was compiled for
struct Cached<K> {
    id: KernelId,
    masks: MaskLayout,
    kernel: K,
}
//
impl<K> KernelCache<K> {
    /// Compile an initial kernel
    pub fn new<E>(
        coefficients: &Coefficients,
        compile: impl FnOnce(&Coefficients) -> Result<K, E>,
    ) -> Result<Self, E> {
        let current = Self::compile(KernelId(0), coefficients, compile)?;
        Ok(Self {
            current,
            next_id: 1,
        })
    }

    /// Make sure the current kernel can handle a set of coefficients
    ///
    /// If the coefficients use different masks than the current kernel, a new
    /// kernel is compiled, installed, and the old kernel is released. Should
    /// compilation fail, the old kernel stays in place.
    pub fn update<E>(
        &mut self,
        coefficients: &Coefficients,
        compile: impl FnOnce(&Coefficients) -> Result<K, E>,
    ) -> Result<KernelUpdate, E> {
        if self.current.masks == coefficients.masks() {
            return Ok(KernelUpdate::Reused(self.current.id));
        }
        let id = KernelId(self.next_id);
        let new = Self::compile(id, coefficients, compile)?;
        self.next_id += 1;
        let old = std::mem::replace(&mut self.current, new);
        debug!("Releasing superseded {}", old.id);
        std::mem::drop(old);
        Ok(KernelUpdate::Compiled(id))
    }

    /// Identity of the current kernel
    pub fn id(&self) -> KernelId {
        self.current.id
    }

    /// Access the current kernel
    pub fn get(&self) -> (KernelId, &K) {
        (self.current.id, &self.current.kernel)
    }

    /// Mask layout that the current kernel was compiled for
    pub fn masks(&self) -> &MaskLayout {
        &self.current.masks
    }

    /// Compile a kernel with a certain identity
    fn compile<E>(
        id: KernelId,
        coefficients: &Coefficients,
        compile: impl FnOnce(&Coefficients) -> Result<K, E>,
    ) -> Result<Cached<K>, E> {
        let masks = coefficients.masks();
        info!(
            "Compiling {id} for masks [{}]",
            masks
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        let kernel = compile(coefficients)?;
        Ok(Cached { id, masks, kernel })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::{coefficients::CoefficientName, mask::Mask};
    use std::{cell::Cell, rc::Rc};

    /// Kernel that counts how many instances of it are alive
    struct Counted(Rc<Cell<usize>>);
    //
    impl Counted {
        fn new(live: &Rc<Cell<usize>>) -> Self {
            live.set(live.get() + 1);
            Self(live.clone())
        }
    }
    //
    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.set(self.0.get() - 1);
        }
    }

    #[test]
    fn range_changes_reuse_kernel() {
        let mut coefficients = Coefficients::default();
        let mut compilations = 0;
        let mut cache = KernelCache::new(&coefficients, |_| {
            compilations += 1;
            Ok::<_, ()>(())
        })
        .unwrap();
        let initial = cache.id();

        coefficients.set_range(CoefficientName::KillRate, 0.05, 0.07);
        let update = cache
            .update(&coefficients, |_| -> Result<(), ()> {
                panic!("should not recompile")
            })
            .unwrap();
        assert_eq!(update, KernelUpdate::Reused(initial));
        assert_eq!(compilations, 1);
    }

    #[test]
    fn mask_changes_recompile_and_release() {
        let live = Rc::new(Cell::new(0));
        let mut coefficients = Coefficients::default();
        let mut cache =
            KernelCache::new(&coefficients, |_| Ok::<_, ()>(Counted::new(&live))).unwrap();
        let initial = cache.id();
        assert_eq!(live.get(), 1);

        coefficients.set_mask(CoefficientName::FeedRate, Mask::linear_gradient(0.3));
        let update = cache
            .update(&coefficients, |_| Ok::<_, ()>(Counted::new(&live)))
            .unwrap();
        assert!(matches!(update, KernelUpdate::Compiled(id) if id != initial));
        assert_eq!(cache.id(), update.id());
        assert_eq!(cache.masks(), &coefficients.masks());
        assert_eq!(live.get(), 1);

        // A different gradient angle is a different kernel
        coefficients.set_mask(CoefficientName::FeedRate, Mask::linear_gradient(0.6));
        let second = cache
            .update(&coefficients, |_| Ok::<_, ()>(Counted::new(&live)))
            .unwrap();
        assert!(second.id() > update.id());
        assert_eq!(live.get(), 1);
    }

    #[test]
    fn failed_compilation_keeps_old_kernel() {
        let mut coefficients = Coefficients::default();
        let mut cache = KernelCache::new(&coefficients, |_| Ok::<_, &str>("solid")).unwrap();
        let initial = cache.id();

        coefficients.set_mask(CoefficientName::TimeDelta, Mask::SmoothCircle);
        assert_eq!(cache.update(&coefficients, |_| Err("nope")), Err("nope"));
        assert_eq!(cache.get(), (initial, &"solid"));

        // The failed attempt is retried on the next update
        let update = cache
            .update(&coefficients, |_| Ok::<_, &str>("smooth"))
            .unwrap();
        assert_eq!(cache.get(), (update.id(), &"smooth"));
        assert_ne!(update.id(), initial);
    }
}
