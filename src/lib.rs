//! Appointment booking core: working hours, slot availability, timezone
//! handling and the multi-step booking workflow.

pub mod availability;
pub mod booking;
pub mod calendar;
pub mod config;
pub mod error;
pub mod hours;
pub mod store;
pub mod timezone;
