pub mod event;
pub mod pending;
pub mod relay;
pub mod socket;
pub mod state;

pub use event::ClientEvent;
pub use pending::PendingFrames;
pub use relay::{Relay, RelaySettings};
pub use socket::BrowserSocket;
pub use state::{RelayOutcome, RelayState};
