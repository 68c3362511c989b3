use {
    bitcoin::{
        BlockHash, CompactTarget, Target, TxMerkleNode,
        block,
        hashes::{Hash, sha256d},
    },
    byteorder::{BigEndian, ByteOrder, LittleEndian},
    derive_more::Display,
    hex::FromHex,
    rand::RngCore,
    serde::{
        Deserialize, Serialize, Serializer,
        de::{self, Deserializer},
        ser::SerializeSeq,
    },
    serde_json::Value,
    serde_with::{DeserializeFromStr, SerializeDisplay},
    snafu::{ResultExt, Snafu},
    std::{
        fmt::{self, Formatter},
        str::FromStr,
        sync::LazyLock,
    },
};

pub use {
    authorize::Authorize,
    difficulty::{DIFFICULTY_1_TARGET, Difficulty, round_significant},
    error::{InternalError, JsonRpcError, Result},
    event::Event,
    extranonce::Extranonce,
    job_id::JobId,
    merkle::{MerkleNode, merkle_root},
    message::{Id, Message},
    nbits::Nbits,
    notify::Notify,
    prevhash::PrevHash,
    reconnect::Reconnect,
    set_difficulty::SetDifficulty,
    set_extranonce::SetExtranonce,
    si::{format_si, parse_si},
    submit::Submit,
    subscribe::{Subscribe, SubscribeResult},
    suggest_difficulty::SuggestDifficulty,
    version::Version,
    word::{Nonce, Ntime},
};

#[cfg(feature = "client")]
pub use client::{
    Client, ClientConfig, ClientError, EventReceiver, PendingResponse, SubmitHandle, SubmitOutcome,
};

#[cfg(feature = "client")]
pub const MAX_MESSAGE_SIZE: usize = 32 * 1024;

/// Size used when a subscribe result omits the extranonce2 size.
pub const DEFAULT_EXTRANONCE2_SIZE: usize = 4;

mod authorize;
mod difficulty;
mod error;
mod event;
mod extranonce;
mod job_id;
mod merkle;
mod message;
mod nbits;
mod notify;
mod prevhash;
mod reconnect;
mod set_difficulty;
mod set_extranonce;
mod si;
mod submit;
mod subscribe;
mod suggest_difficulty;
mod version;
mod word;

#[cfg(feature = "client")]
mod client;
