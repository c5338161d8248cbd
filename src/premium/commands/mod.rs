mod cancel;
mod grant;
mod help;
mod pending;
mod start;
mod subscriptions;

pub use cancel::cancel;
pub use grant::grant;
pub use help::help;
pub use pending::pending;
pub use start::start;
pub use subscriptions::subscriptions;
