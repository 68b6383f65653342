//! Background loops for continuous processing.

pub mod notification_loop;
