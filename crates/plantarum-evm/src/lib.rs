//! plantarum-evm — chunked log fetching, event decoding and token aggregation.

pub mod account;
pub mod aggregator;
pub mod builder;
pub mod catalog;
pub mod decoder;
pub mod fetcher;
pub mod probe;
pub mod reader;
pub mod value;

pub use account::{parse_account, AccountView};
pub use aggregator::{AggregateOptions, Aggregator, AggregatorBuilder, UnknownPolicy};
pub use builder::LogQuery;
pub use catalog::Catalog;
pub use decoder::{DecodeError, DecodedEvent, EventBody, EventDecoder, EventSignature};
pub use fetcher::{LogFetcher, RawLog};
pub use probe::{enumerate_tokens, Accessor, ContractProbe, KindProbe, ProbeHit, ProbeOutcome};
pub use reader::{ChainReader, RpcChainReader};
