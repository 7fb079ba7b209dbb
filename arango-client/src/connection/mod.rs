//! Connections, connection pooling and host selection.

mod connection;
mod connector;
mod host;
mod pool;
mod resolver;

pub use connection::{Connection, ConnectionId, ConnectionOptions, ConnectionState};
pub use connector::{BoxedTransport, Connector, TcpConnector, Transport};
pub use host::{HostEndpoint, HostHandle, DEFAULT_PORT};
pub use pool::{HostPool, PooledConnection};
pub use resolver::{
    load_balancer_for, DeadHosts, FirstHostLoadBalancer, HostResolver, LoadBalancer,
    OneRandomLoadBalancer, RoundRobinLoadBalancer,
};
