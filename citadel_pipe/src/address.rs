use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

/// The synthetic address of one side of a pipe. A pure value: two addresses are equal
/// when both the network name and the address string are equal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    network: String,
    address: String,
}

impl Address {
    pub fn new<N: Into<String>, A: Into<String>>(network: N, address: A) -> Self {
        Self {
            network: network.into(),
            address: address.into(),
        }
    }

    /// Shorthand for an address on the `tcp` network
    pub fn tcp<A: Into<String>>(address: A) -> Self {
        Self::new("tcp", address)
    }

    /// Name of the network, e.g. "tcp"
    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn as_str(&self) -> &str {
        &self.address
    }

    /// Parses the address string as a socket address. Returns `InvalidInput` when the
    /// address is not of the `ip:port` form
    pub fn socket_addr(&self) -> std::io::Result<SocketAddr> {
        self.address.parse().map_err(|err| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a socket address: {err}", self.address),
            )
        })
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.address)
    }
}
