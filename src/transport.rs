use crate::config::LocalInterface;
use crate::error::Error;
use crate::sigpipe;
use crate::url::{Scheme, WsUrl};
use pki_types::ServerName;
use rustls::{ClientConfig as RustlsClientConfig, ClientConnection, RootCertStore, StreamOwned};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;

/// Uniform byte-stream capability over plain TCP or TLS (spec §4.2, §9
/// "Polymorphic transport"). Every read/write is wrapped in a scoped SIGPIPE mask.
pub enum Transport {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
    #[cfg(feature = "feature-native-tls")]
    NativeTls(Box<native_tls::TlsStream<TcpStream>>),
}

impl Transport {
    /// Opens the TCP connection (optionally bound to `local`) and, for `wss`, performs
    /// the TLS handshake with SNI set to the parsed host.
    pub fn connect(url: &WsUrl, local: Option<&LocalInterface>) -> Result<Self, Error> {
        let tcp = connect_tcp(url, local)?;
        match url.scheme {
            Scheme::Ws => Ok(Transport::Plain(tcp)),
            Scheme::Wss => Transport::wrap_tls(tcp, &url.host),
        }
    }

    #[cfg(not(feature = "feature-native-tls"))]
    fn wrap_tls(tcp: TcpStream, host: &str) -> Result<Self, Error> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = RustlsClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        let server_name = ServerName::try_from(host.to_string())?;
        let conn = ClientConnection::new(Arc::new(config), server_name)
            .map_err(|source| Error::TlsError { source })?;

        Ok(Transport::Tls(Box::new(StreamOwned::new(conn, tcp))))
    }

    #[cfg(feature = "feature-native-tls")]
    fn wrap_tls(tcp: TcpStream, host: &str) -> Result<Self, Error> {
        let connector = native_tls::TlsConnector::new()?;
        let stream = connector.connect(host, tcp)?;
        Ok(Transport::NativeTls(Box::new(stream)))
    }

    /// Puts the underlying socket in non-blocking mode; a read with no data ready
    /// returns `io::ErrorKind::WouldBlock` rather than blocking the calling thread.
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        self.tcp_ref().set_nonblocking(nonblocking)
    }

    fn tcp_ref(&self) -> &TcpStream {
        match self {
            Transport::Plain(tcp) => tcp,
            Transport::Tls(stream) => &stream.sock,
            #[cfg(feature = "feature-native-tls")]
            Transport::NativeTls(stream) => stream.get_ref(),
        }
    }

    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        sigpipe::with_sigpipe_blocked(|| match self {
            Transport::Plain(tcp) => tcp.read(buf),
            Transport::Tls(stream) => stream.read(buf),
            #[cfg(feature = "feature-native-tls")]
            Transport::NativeTls(stream) => stream.read(buf),
        })
    }

    /// A single write call (not write-all): callers must check the returned count
    /// against the expected length themselves (spec §4.5 step 4).
    pub fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        sigpipe::with_sigpipe_blocked(|| match self {
            Transport::Plain(tcp) => tcp.write(buf),
            Transport::Tls(stream) => stream.write(buf),
            #[cfg(feature = "feature-native-tls")]
            Transport::NativeTls(stream) => stream.write(buf),
        })
    }

    pub fn flush(&mut self) -> io::Result<()> {
        sigpipe::with_sigpipe_blocked(|| match self {
            Transport::Plain(tcp) => tcp.flush(),
            Transport::Tls(stream) => stream.flush(),
            #[cfg(feature = "feature-native-tls")]
            Transport::NativeTls(stream) => stream.flush(),
        })
    }

    pub fn shutdown(&mut self) {
        let _ = self.tcp_ref().shutdown(std::net::Shutdown::Both);
    }
}

fn connect_tcp(url: &WsUrl, local: Option<&LocalInterface>) -> Result<TcpStream, Error> {
    let addrs: Vec<SocketAddr> = (url.host.as_str(), url.port)
        .to_socket_addrs()
        .map_err(|source| Error::IOError { source })?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        let connect_result = match local {
            Some(interface) => connect_from(interface, addr),
            None => TcpStream::connect(addr),
        };
        match connect_result {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }

    Err(Error::IOError {
        source: last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses resolved")),
    })
}

fn connect_from(interface: &LocalInterface, addr: SocketAddr) -> io::Result<TcpStream> {
    use socket2::{Domain, Socket, Type};

    let domain = match addr {
        SocketAddr::V4(_) => Domain::IPV4,
        SocketAddr::V6(_) => Domain::IPV6,
    };
    let socket = Socket::new(domain, Type::STREAM, None)?;
    socket.bind(&interface.address.into())?;

    #[cfg(any(target_os = "android", target_os = "fuchsia", target_os = "linux"))]
    if let Some(device) = &interface.device_name {
        socket.bind_device(Some(device.as_bytes()))?;
    }
    #[cfg(not(any(target_os = "android", target_os = "fuchsia", target_os = "linux")))]
    let _ = &interface.device_name;

    socket.connect(&addr.into())?;
    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn plain_transport_round_trips_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            sock.read_exact(&mut buf).unwrap();
            sock.write_all(&buf).unwrap();
        });

        let client = TcpStream::connect(addr).unwrap();
        let mut transport = Transport::Plain(client);
        assert_eq!(transport.write(b"hello").unwrap(), 5);
        transport.flush().unwrap();

        let mut buf = [0u8; 5];
        let mut read_total = 0;
        while read_total < 5 {
            read_total += transport.read(&mut buf[read_total..]).unwrap();
        }
        assert_eq!(&buf, b"hello");
        handle.join().unwrap();
    }
}
