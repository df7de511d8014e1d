//! Remote service adapters implementing the RemotePort trait

pub mod graphql;
pub mod remote_port;

#[cfg(any(test, feature = "test-support"))]
pub mod mock_remote;

pub use graphql::GraphqlRemote;
pub use remote_port::{
    AuthorizationUrl, ConnectRepositoryInput, CreateRepositoryInput, RemoteError, RemotePort,
    RemoteResult,
};

pub use crate::types::{ConnectedRepository, CreatedRepository};

#[cfg(any(test, feature = "test-support"))]
pub use mock_remote::{MockCall, MockError, MockRemote};
