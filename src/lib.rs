#![feature(proc_macro_hygiene, decl_macro)]

#[cfg(test)]
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate rocket;
#[macro_use]
extern crate serde_json;

#[macro_use]
mod macros;

pub mod apis;
pub mod authentication;
pub mod clock;
pub mod coordinator;
pub mod environment;
pub mod logger;
pub mod scheduler;

pub use coordinator::*;
pub use objects::*;
pub use storage::Storage;

pub mod objects;
pub mod storage;

#[cfg(test)]
mod testing;

#[cfg(test)]
mod tests;
