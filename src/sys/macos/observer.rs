use std::ffi::c_void;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ptr::{self, NonNull};

use objc2_application_services::{AXError, AXObserver, AXUIElement as RawAXUIElement};
use objc2_core_foundation::{
    CFRetained, CFRunLoop, CFRunLoopMode, CFString, kCFRunLoopCommonModes,
};

use super::axuielement::{AXUIElement, Error as AxError};
use crate::sys::window_system::pid_t;

/// An observer for accessibility notifications of one application.
///
/// Lives on the run loop of the thread that installed it and stops
/// delivering when dropped.
pub struct Observer {
    callback: *mut (),
    dtor: unsafe fn(*mut ()),
    observer: ManuallyDrop<CFRetained<AXObserver>>,
}

static_assertions::assert_not_impl_any!(Observer: Send);

pub struct ObserverBuilder<F>(CFRetained<AXObserver>, PhantomData<F>);

impl Observer {
    /// Call [`ObserverBuilder::install`] on the result for the observer to
    /// have any effect.
    pub fn new<F: Fn(&str) + 'static>(pid: pid_t) -> Result<ObserverBuilder<F>, AxError> {
        let mut observer_ptr: *mut AXObserver = ptr::null_mut();
        let status = unsafe {
            AXObserver::create(pid, Some(internal_callback::<F>), NonNull::from(&mut observer_ptr))
        };
        make_result(status)?;
        let observer = NonNull::new(observer_ptr).ok_or(AxError::Ax(AXError::Failure))?;
        Ok(ObserverBuilder(unsafe { CFRetained::from_raw(observer) }, PhantomData))
    }
}

impl<F: Fn(&str) + 'static> ObserverBuilder<F> {
    pub fn install(self, callback: F) -> Observer {
        let run_loop_source = unsafe { self.0.run_loop_source() };
        if let Some(run_loop) = CFRunLoop::current()
            && let Some(mode) = unsafe { kCFRunLoopCommonModes }
        {
            let mode: &CFRunLoopMode = mode;
            run_loop.add_source(Some(run_loop_source.as_ref()), Some(mode));
        }
        Observer {
            callback: Box::into_raw(Box::new(callback)) as *mut (),
            dtor: destruct::<F>,
            observer: ManuallyDrop::new(self.0),
        }
    }
}

unsafe fn destruct<T>(ptr: *mut ()) {
    let _ = unsafe { Box::from_raw(ptr as *mut T) };
}

impl Drop for Observer {
    fn drop(&mut self) {
        unsafe {
            ManuallyDrop::drop(&mut self.observer);
            (self.dtor)(self.callback);
        }
    }
}

impl Observer {
    pub fn add_notification(
        &self,
        elem: &AXUIElement,
        notification: &'static str,
    ) -> Result<(), AxError> {
        let notification_cf = CFString::from_static_str(notification);
        let observer: &AXObserver = &self.observer;
        make_result(unsafe {
            observer.add_notification(
                elem.as_concrete_TypeRef(),
                notification_cf.as_ref(),
                self.callback as *mut c_void,
            )
        })
    }
}

unsafe extern "C-unwind" fn internal_callback<F: Fn(&str) + 'static>(
    _observer: NonNull<AXObserver>,
    _elem: NonNull<RawAXUIElement>,
    notif: NonNull<CFString>,
    data: *mut c_void,
) {
    let callback = unsafe { &*(data as *const F) };
    let notif = unsafe { CFRetained::retain(notif) };
    callback(&notif.to_string());
}

fn make_result(err: AXError) -> Result<(), AxError> {
    if err == AXError::Success {
        Ok(())
    } else {
        Err(AxError::Ax(err))
    }
}
