//! Construction of connected endpoint pairs.
//!
//! Two buffers are allocated, one per direction, and handed to the endpoints crosswise:
//! whatever the client writes lands in the buffer the server reads, and vice versa.
//!
//! ```rust
//! use citadel_pipe::{pipe, DebugLog};
//!
//! let (client, server) = pipe(DebugLog::none());
//! client.write(b"ping").unwrap();
//! let mut buf = [0u8; 4];
//! assert_eq!(server.read(&mut buf).unwrap(), 4);
//! ```

use crate::address::Address;
use crate::buffer::Buffer;
use crate::debug_log::DebugLog;
use crate::endpoint::{CloseMode, Endpoint};

pub const CLIENT_NAME: &str = "client";
pub const SERVER_NAME: &str = "server";
pub const CLIENT_ADDR: &str = "1.2.3.4:12345";
pub const SERVER_ADDR: &str = "5.6.7.8:12346";
pub const NETWORK: &str = "tcp";

/// Creates a connected `(client, server)` pair with the default names and addresses.
/// `log` receives every read and write of both sides; pass [`DebugLog::none`] to disable it
pub fn pipe(log: DebugLog) -> (Endpoint, Endpoint) {
    PipeBuilder::default().with_debug_log(log).build()
}

/// Used to construct a pair of endpoints with non-default settings
#[derive(Debug, Default)]
pub struct PipeBuilder {
    client_name: Option<String>,
    server_name: Option<String>,
    client_addr: Option<Address>,
    server_addr: Option<Address>,
    close_mode: Option<CloseMode>,
    debug_log: Option<DebugLog>,
}

impl PipeBuilder {
    /// Names used to tell the two sides apart in the debug log
    pub fn with_names<C: Into<String>, S: Into<String>>(
        &mut self,
        client: C,
        server: S,
    ) -> &mut Self {
        self.client_name = Some(client.into());
        self.server_name = Some(server.into());
        self
    }

    pub fn with_client_addr(&mut self, addr: Address) -> &mut Self {
        self.client_addr = Some(addr);
        self
    }

    pub fn with_server_addr(&mut self, addr: Address) -> &mut Self {
        self.server_addr = Some(addr);
        self
    }

    /// Determines what [`Endpoint::close`] tears down. Defaults to [`CloseMode::Full`]
    pub fn with_close_mode(&mut self, close_mode: CloseMode) -> &mut Self {
        self.close_mode = Some(close_mode);
        self
    }

    pub fn with_debug_log(&mut self, log: DebugLog) -> &mut Self {
        self.debug_log = Some(log);
        self
    }

    /// Allocates the two buffers and returns the `(client, server)` pair. Unset options
    /// fall back to their defaults, and the builder is reset
    pub fn build(&mut self) -> (Endpoint, Endpoint) {
        let client_name = self
            .client_name
            .take()
            .unwrap_or_else(|| CLIENT_NAME.to_string());
        let server_name = self
            .server_name
            .take()
            .unwrap_or_else(|| SERVER_NAME.to_string());
        let client_addr = self
            .client_addr
            .take()
            .unwrap_or_else(|| Address::new(NETWORK, CLIENT_ADDR));
        let server_addr = self
            .server_addr
            .take()
            .unwrap_or_else(|| Address::new(NETWORK, SERVER_ADDR));
        let close_mode = self.close_mode.take().unwrap_or_default();
        let log = self.debug_log.take().unwrap_or_default();

        // server to client, and client to server
        let s2c = Buffer::new();
        let c2s = Buffer::new();

        let client = Endpoint::new(
            client_name,
            s2c.clone(),
            c2s.clone(),
            client_addr.clone(),
            server_addr.clone(),
            close_mode,
            log.clone(),
        );
        let server = Endpoint::new(
            server_name,
            c2s,
            s2c,
            server_addr,
            client_addr,
            close_mode,
            log,
        );

        citadel_logging::trace!(
            target: "citadel",
            "Created pipe {} <-> {}",
            client.local_addr(),
            server.local_addr()
        );
        (client, server)
    }
}
