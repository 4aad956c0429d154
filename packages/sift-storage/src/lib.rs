#[cfg(not(any(feature = "mysql", feature = "postgres")))]
compile_error!("sift-storage needs at least one of the `mysql` or `postgres` features.");

pub mod db;
pub mod driver;
pub mod record;

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;

mod error;

pub use db::{Storage, WhereIn};
pub use driver::Driver;
pub use error::Error;
pub use record::Record;

pub type Result<T, E = Error> = std::result::Result<T, E>;
