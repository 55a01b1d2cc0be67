mod delivery;
mod generation;
mod manager;

pub use delivery::{Deliveries, Delivery, Source, Watched, WatchedDeliveries};
pub use generation::{Generation, Ticket};
pub use manager::{DataManager, PendingWrite};
