//! Per-thread ambient domain
//!
//! Code running inside a dispatched capability may need to know which domain
//! it was loaded from. The ambient slot holds that domain for the current
//! thread while a guard is alive. Guards nest: dropping one restores
//! whatever was ambient when it was pushed.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::domain::Domain;

thread_local! {
    static AMBIENT: RefCell<Option<Arc<Domain>>> = const { RefCell::new(None) };
}

/// Domain currently ambient on this thread
pub fn ambient_domain() -> Option<Arc<Domain>> {
    AMBIENT.with(|slot| slot.borrow().clone())
}

/// Make `domain` ambient until the returned guard is dropped
pub fn push_domain(domain: Arc<Domain>) -> AmbientGuard {
    let previous = AMBIENT.with(|slot| slot.borrow_mut().replace(domain));
    AmbientGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// Run `f` with `domain` ambient
pub fn with_domain<R>(domain: Arc<Domain>, f: impl FnOnce() -> R) -> R {
    let _guard = push_domain(domain);
    f()
}

/// Restores the previous ambient domain on drop, unwinding included
#[must_use = "the ambient domain is restored as soon as the guard is dropped"]
pub struct AmbientGuard {
    previous: Option<Arc<Domain>>,
    // tied to the thread whose slot it restores
    _not_send: PhantomData<*const ()>,
}

impl Drop for AmbientGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        AMBIENT.with(|slot| *slot.borrow_mut() = previous);
    }
}
