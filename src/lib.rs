pub mod add;
pub mod ber;
pub mod connection;
pub mod control;
pub mod entry;
pub mod error;
pub mod message_id;

pub use add::AddRequest;
pub use connection::{LdapConnection, LdapResponse, ReplyRouter, Transport};
pub use control::Control;
pub use entry::{Entry, EntryAttribute};
pub use error::LdapError;
pub use message_id::{MessageId, MessageIdAllocator};
