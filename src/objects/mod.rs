pub mod ceremony;
pub use ceremony::*;

pub mod circuit;
pub use circuit::*;

pub mod participant;
pub use participant::*;

pub mod timeout;
pub use timeout::*;
