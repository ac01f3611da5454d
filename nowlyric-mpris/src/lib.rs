pub mod bus;
pub mod error;
pub mod listener;
mod value;

pub use bus::MprisBus;
pub use error::MprisError;
pub use listener::MprisListener;
