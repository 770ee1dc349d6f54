//! Core systems for Prism.
//!
//! This crate provides the foundational components of the Prism collection
//! framework:
//!
//! - **Signal/Slot System**: Type-safe change notification
//! - **Property System**: Values with change detection
//! - **Dispatcher**: Marshaling work onto a collection's owning thread
//! - **Reentrance Guard**: Cycle breaking for self-triggering handlers
//!
//! # Signal/Slot Example
//!
//! ```
//! use prism_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//!
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! value_changed.emit(42);
//!
//! value_changed.disconnect(conn_id);
//! ```
//!
//! # Property Example
//!
//! ```
//! use prism_core::{Property, Signal};
//!
//! // A reactive counter with change notification
//! struct Counter {
//!     value: Property<i32>,
//!     value_changed: Signal<i32>,
//! }
//!
//! impl Counter {
//!     fn increment(&self) {
//!         let new_value = self.value.get() + 1;
//!         if self.value.set(new_value) {
//!             self.value_changed.emit(new_value);
//!         }
//!     }
//! }
//! ```

pub mod dispatch;
mod error;
pub mod guard;
pub mod logging;
pub mod property;
pub mod signal;

pub use dispatch::Dispatcher;
pub use error::DispatchError;
pub use guard::{RaiseScope, ReentranceGuard};
pub use logging::PerfSpan;
pub use property::Property;
pub use signal::{ConnectionGuard, ConnectionId, ConnectionType, Signal};

static_assertions::assert_impl_all!(Signal<i32>: Send, Sync);
static_assertions::assert_impl_all!(Property<i32>: Send, Sync);
static_assertions::assert_impl_all!(Dispatcher: Send, Sync);
static_assertions::assert_impl_all!(ReentranceGuard: Send, Sync);
