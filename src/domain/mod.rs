pub mod client;
pub mod errors;
pub mod lobby;
pub mod ports;
pub mod protocol;

pub use client::{ClientHandle, ClientRecord, Role};
pub use errors::OpcodeError;
pub use lobby::LobbyRecord;
pub use ports::{ResolvedUgi, SessionVerifier, UgiResolver, VerifiedSession, VerifyError};
pub use protocol::{Delivery, Frame, OutboundEvent, RawRequest};
