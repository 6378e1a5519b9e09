pub mod notification;
pub mod signal;

pub use notification::{BuffNotification, Notifier};
pub use signal::{BuffSignal, SignalHandler};
