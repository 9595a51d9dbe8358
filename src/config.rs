/// Static buffer size used for the outbound staging buffer and the fast-path inbound
/// staging buffer (spec: "fixed 64 KiB").
pub const STAGING_BUFFER_SIZE: usize = 64 * 1024;

/// Tunables for a single client endpoint, generalized from the teacher's
/// `ClientConfig`/`WebSocketConfig` pair. There is deliberately no connect or close
/// timeout here (see the Open Questions / Decision log in the design notes): this
/// endpoint blocks on the transport with no internal deadline.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Size of the outbound and fast-path inbound staging buffers.
    pub buffer_size: usize,
    /// Number of received pings that accumulate before a PONG is sent automatically.
    /// 1 means respond to every ping.
    pub ping_backlog: usize,
    /// Local interface to bind the TCP socket to before connecting, if any.
    pub local_interface: Option<LocalInterface>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            buffer_size: STAGING_BUFFER_SIZE,
            ping_backlog: 1,
            local_interface: None,
        }
    }
}

/// A local address (and, on platforms that support it, a named device) the client
/// socket should bind to before connecting. Used by `interface_connect`.
#[derive(Debug, Clone)]
pub struct LocalInterface {
    pub address: std::net::SocketAddr,
    pub device_name: Option<String>,
}
