use std::ffi::c_void;
use std::fmt;
use std::ops::Deref;
use std::ptr::{self, NonNull};

use objc2_application_services::{AXError, AXUIElement as RawAXUIElement, AXValue, AXValueType};
use objc2_core_foundation::{
    CFArray, CFBoolean, CFRetained, CFString, CFType, CGPoint, CGRect, CGSize, ConcreteType,
};
use thiserror::Error;

use crate::sys::window_system::pid_t;

#[derive(Clone)]
pub struct AXUIElement {
    inner: CFRetained<RawAXUIElement>,
}

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("AX error {0:?}")]
    Ax(AXError),
    #[error("value not found")]
    NotFound,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<AXError> for Error {
    fn from(value: AXError) -> Self { Self::Ax(value) }
}

impl AXUIElement {
    fn new(inner: CFRetained<RawAXUIElement>) -> Self { Self { inner } }

    #[inline]
    pub fn application(pid: pid_t) -> Self {
        // SAFETY: The returned object follows the Create rule and therefore
        // owns +1 retain count.
        let inner = unsafe { RawAXUIElement::new_application(pid) };
        Self::new(inner)
    }

    #[inline]
    pub fn system_wide() -> Self {
        let inner = unsafe { RawAXUIElement::new_system_wide() };
        Self::new(inner)
    }

    #[allow(non_snake_case)]
    #[inline]
    pub fn as_concrete_TypeRef(&self) -> &RawAXUIElement { self.deref() }

    fn copy_attribute(&self, name: &'static str) -> Result<Option<CFRetained<CFType>>> {
        let attr = CFString::from_static_str(name);
        let mut value: *const CFType = ptr::null();
        let status = unsafe {
            self.inner.copy_attribute_value(
                attr.as_ref(),
                NonNull::from(&mut value),
            )
        };
        match status {
            AXError::Success => {
                // SAFETY: The function follows the Copy rule and returns a
                // value the caller owns.
                Ok(NonNull::new(value.cast_mut())
                    .map(|value| unsafe { CFRetained::from_raw(value) }))
            }
            AXError::NoValue => Ok(None),
            err => Err(Error::Ax(err)),
        }
    }

    fn copy_required_attribute(&self, name: &'static str) -> Result<CFRetained<CFType>> {
        self.copy_attribute(name)?.ok_or(Error::NotFound)
    }

    fn downcast<T: ConcreteType>(&self, value: CFRetained<CFType>) -> Result<CFRetained<T>> {
        value.downcast::<T>().map_err(|_| Error::Ax(AXError::Failure))
    }

    fn string_attribute(&self, name: &'static str) -> Result<String> {
        let value = self.copy_required_attribute(name)?;
        Ok(self.downcast::<CFString>(value)?.to_string())
    }

    fn element_attribute(&self, name: &'static str) -> Result<Option<AXUIElement>> {
        let Some(value) = self.copy_attribute(name)? else {
            return Ok(None);
        };
        Ok(Some(AXUIElement::new(self.downcast::<RawAXUIElement>(value)?)))
    }

    fn elements_attribute(&self, name: &'static str) -> Result<Vec<AXUIElement>> {
        let Some(value) = self.copy_attribute(name)? else {
            return Ok(Vec::new());
        };
        let array = self.downcast::<CFArray>(value)?;
        let array = unsafe { CFRetained::cast_unchecked::<CFArray<CFType>>(array) };
        let mut out = Vec::with_capacity(array.len());
        for entry in array.iter() {
            out.push(AXUIElement::new(self.downcast::<RawAXUIElement>(entry)?));
        }
        Ok(out)
    }

    pub fn bool_attribute(&self, name: &'static str) -> Result<bool> {
        let value = self.copy_required_attribute(name)?;
        let boolean = self.downcast::<CFBoolean>(value)?;
        Ok(boolean.value())
    }

    pub fn frame(&self) -> Result<CGRect> {
        let value = self.copy_required_attribute("AXFrame")?;
        let ax_value = self.downcast::<AXValue>(value)?;
        rect_from_axvalue(&ax_value)
    }

    pub fn role(&self) -> Result<String> { self.string_attribute("AXRole") }

    pub fn subrole(&self) -> Result<String> { self.string_attribute("AXSubrole") }

    pub fn minimized(&self) -> Result<bool> { self.bool_attribute("AXMinimized") }

    pub fn title(&self) -> Result<String> { self.string_attribute("AXTitle") }

    pub fn windows(&self) -> Result<Vec<AXUIElement>> { self.elements_attribute("AXWindows") }

    pub fn focused_window(&self) -> Result<Option<AXUIElement>> {
        self.element_attribute("AXFocusedWindow")
    }

    pub fn focused_application(&self) -> Result<Option<AXUIElement>> {
        self.element_attribute("AXFocusedApplication")
    }

    pub fn menu_bar(&self) -> Result<Option<AXUIElement>> { self.element_attribute("AXMenuBar") }

    pub fn children(&self) -> Result<Vec<AXUIElement>> { self.elements_attribute("AXChildren") }

    pub fn pid(&self) -> Result<pid_t> {
        let mut pid: pid_t = 0;
        let status = unsafe { self.inner.pid(NonNull::from(&mut pid)) };
        match status {
            AXError::Success => Ok(pid),
            err => Err(Error::Ax(err)),
        }
    }

    /// Finds the child whose title is `title`, looking through the untitled
    /// `AXMenu` containers menus nest their items in.
    pub fn child_titled(&self, title: &str) -> Result<Option<AXUIElement>> {
        for child in self.children()? {
            if child.title().is_ok_and(|t| t == title) {
                return Ok(Some(child));
            }
            if child.role().is_ok_and(|r| r == "AXMenu")
                && let Some(found) = child.child_titled(title)?
            {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    pub fn set_position(&self, mut point: CGPoint) -> Result<()> {
        let attr = CFString::from_static_str("AXPosition");
        let value = make_axvalue(AXValueType::CGPoint, &mut point)?;
        self.set_attribute_value(attr.as_ref(), value.as_ref())
    }

    pub fn set_size(&self, mut size: CGSize) -> Result<()> {
        let attr = CFString::from_static_str("AXSize");
        let value = make_axvalue(AXValueType::CGSize, &mut size)?;
        self.set_attribute_value(attr.as_ref(), value.as_ref())
    }

    pub fn raise(&self) -> Result<()> { self.perform_action("AXRaise") }

    pub fn press(&self) -> Result<()> { self.perform_action("AXPress") }

    fn perform_action(&self, name: &'static str) -> Result<()> {
        let action = CFString::from_static_str(name);
        let status = unsafe { self.inner.perform_action(action.as_ref()) };
        if status == AXError::Success {
            Ok(())
        } else {
            Err(Error::Ax(status))
        }
    }

    fn set_attribute_value(&self, name: &CFString, value: &CFType) -> Result<()> {
        let status = unsafe { self.inner.set_attribute_value(name, value) };
        if status == AXError::Success {
            Ok(())
        } else {
            Err(Error::Ax(status))
        }
    }

    pub fn set_bool_attribute(&self, name: &'static str, value: bool) -> Result<()> {
        let cf_bool = CFBoolean::new(value);
        let attr = CFString::from_static_str(name);
        self.set_attribute_value(attr.as_ref(), cf_bool.as_ref())
    }
}

impl Deref for AXUIElement {
    type Target = RawAXUIElement;

    fn deref(&self) -> &Self::Target { &self.inner }
}

/// Two handles are equal when they refer to the same UI element, even if
/// they were obtained through separate queries.
impl PartialEq for AXUIElement {
    fn eq(&self, other: &Self) -> bool {
        let lhs: &CFType = (*self.inner).as_ref();
        let rhs: &CFType = (*other.inner).as_ref();
        lhs == rhs
    }
}

impl Eq for AXUIElement {}

impl fmt::Debug for AXUIElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.deref().fmt(f) }
}

fn rect_from_axvalue(value: &AXValue) -> Result<CGRect> {
    let mut rect = CGRect::default();
    let success = unsafe {
        value.value(AXValueType::CGRect, NonNull::from(&mut rect).cast::<c_void>())
    };
    if success {
        Ok(rect)
    } else {
        Err(Error::Ax(AXError::Failure))
    }
}

fn make_axvalue<T>(ty: AXValueType, value: &mut T) -> Result<CFRetained<AXValue>> {
    let ptr = NonNull::from(value).cast::<c_void>();
    unsafe { AXValue::new(ty, ptr) }.ok_or(Error::Ax(AXError::Failure))
}
