//! Messages posted by embedded unit content back to the host, the
//! subscription registry that fans them out, and per-unit load tracking.

pub mod bus;
pub mod frame;
pub mod message;

pub use bus::{MessageBus, Subscription};
pub use frame::{AttachedFrame, FrameEvent, UnitFrame};
pub use message::{HostMessage, RESIZE_MESSAGE_TYPE};
