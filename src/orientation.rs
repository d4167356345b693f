//! Scoped control over the host display's orientation.
//!
//! The race view wants landscape for as long as it is on screen. Rather than flipping a global, the
//! view is handed a [DisplayOrientationController] and holds an [OrientationLease] while visible;
//! dropping the lease hands control back.

use strum_macros::Display;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

pub trait DisplayOrientationController {
    /// Forces the display into `orientation` until [release](Self::release) is called.
    fn acquire(&self, orientation: Orientation);

    /// Returns the display to its unconstrained orientation.
    fn release(&self);
}

impl<C: DisplayOrientationController + ?Sized> DisplayOrientationController for &C {
    fn acquire(&self, orientation: Orientation) {
        (**self).acquire(orientation)
    }

    fn release(&self) {
        (**self).release()
    }
}

/// Holds an orientation for as long as it lives.
#[must_use = "the orientation is released as soon as the lease is dropped"]
pub struct OrientationLease<C: DisplayOrientationController> {
    controller: C,
    orientation: Orientation,
}
impl<C: DisplayOrientationController> OrientationLease<C> {
    pub fn acquire(controller: C, orientation: Orientation) -> Self {
        controller.acquire(orientation);
        Self {
            controller,
            orientation,
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
}

impl<C: DisplayOrientationController> Drop for OrientationLease<C> {
    fn drop(&mut self) {
        self.controller.release();
    }
}

/// For hosts without a display to rotate. Logs requests and otherwise does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl DisplayOrientationController for Headless {
    fn acquire(&self, orientation: Orientation) {
        debug!("orientation locked: {orientation}");
    }

    fn release(&self) {
        debug!("orientation released");
    }
}
