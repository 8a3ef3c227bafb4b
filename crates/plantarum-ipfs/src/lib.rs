//! plantarum-ipfs — gateway resolution for token metadata and Pinata pinning.

pub mod pinning;
pub mod resolver;
pub mod uri;

pub use pinning::{FileUpload, PinataClient, PinningClient, PINATA_API_BASE};
pub use resolver::GatewayResolver;
pub use uri::{to_gateway_url, ContentUri};
