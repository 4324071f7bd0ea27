//! Domain entities and the ports the engine talks to.

pub mod account;
pub mod payment;
pub mod ports;
