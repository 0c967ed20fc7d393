//! Feature modules

pub mod reminders;
