//! Ferry Core - shared state for a tiny file-request relay
//!
//! Three durable slots back the whole service:
//! - `onlineAddrs`: the ordered set of peer addresses currently online
//! - `requestedFile.txt`: the filename most recently requested by a client
//! - `fileContent.txt`: the content most recently uploaded by a server

pub mod error;
pub mod gate;
pub mod registry;
pub mod storage;
pub mod transfer;

pub use error::{FerryError, Result};
pub use gate::{AUTH_HEADER, RequestGate};
pub use registry::{AddOutcome, AddressRegistry, RemoveOutcome};
pub use storage::{
    FileSlotStore, MemorySlotStore, RedisSlotStore, SlotName, SlotStore, SlotStoreBuilder,
};
pub use transfer::{
    FetchOutcome, MAX_CONTENT_BYTES, SubmitContentAck, SubmitRequestAck, TransferHandshake,
};
