pub mod config;
pub mod coordinator;
pub mod error;
pub mod request;
pub mod result;
pub mod transport;

pub use config::{ClientConfig, ConfigError};
pub use coordinator::ExecutionCoordinator;
pub use error::StatementError;
pub use request::{ResultFormat, StatementRequest};
pub use result::{
    ColumnMeta, ExecutionResult, PartitionMeta, ResultSetMetaData, Row, StatementHandle,
    StatementResponse, StatementStatus,
};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};

pub use flurry_auth::{Credential, CredentialProvider, TokenIssuer};
