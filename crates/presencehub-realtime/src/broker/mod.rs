//! Broker facade and the in-process broker.

pub mod destination;
pub mod facade;
pub mod registry;
pub mod simple;

pub use facade::{BrokerFacade, Subscription};
pub use simple::SimpleBroker;
