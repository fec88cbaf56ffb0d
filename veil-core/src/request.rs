//! Request head carried after the handshake preamble.
//!
//! Once the identifier has matched, the remaining bytes of the frame encode
//! where the relay should dial:
//!
//! `[addons_len(1)] [addons(var)] [command(1)] [port(2, BE)]
//!  [addr_type(1)] [addr(var)] [payload(var)]`
//!
//! Addons are opaque to this server and skipped. Only the TCP command is
//! supported.

use std::net::{Ipv4Addr, Ipv6Addr};

use thiserror::Error;

/// TCP relay command. UDP and multiplexing are not supported.
pub const CMD_TCP: u8 = 0x01;

const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x02;
const ATYP_IPV6: u8 = 0x03;

/// Why a request head could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("request head truncated")]
    Truncated,
    #[error("unsupported command {0:#04x}")]
    UnsupportedCommand(u8),
    #[error("unsupported address type {0:#04x}")]
    UnsupportedAddrType(u8),
    #[error("domain name is not valid utf-8")]
    BadDomain,
}

/// The parsed relay destination plus whatever payload followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    /// Destination as `host:port`, ready for `TcpStream::connect`.
    pub target: String,
    /// Bytes after the head; written upstream before anything else.
    pub payload: Vec<u8>,
}

/// Parse the request head out of the bytes that followed the preamble.
pub fn parse_request(data: &[u8]) -> Result<RequestHead, RequestError> {
    let addons_len = *data.first().ok_or(RequestError::Truncated)? as usize;
    let mut pos = 1 + addons_len;

    let cmd = *data.get(pos).ok_or(RequestError::Truncated)?;
    if cmd != CMD_TCP {
        return Err(RequestError::UnsupportedCommand(cmd));
    }
    pos += 1;

    let port_bytes = data.get(pos..pos + 2).ok_or(RequestError::Truncated)?;
    let port = u16::from_be_bytes([port_bytes[0], port_bytes[1]]);
    pos += 2;

    let addr_type = *data.get(pos).ok_or(RequestError::Truncated)?;
    pos += 1;

    let host = match addr_type {
        ATYP_IPV4 => {
            let octets: [u8; 4] = data
                .get(pos..pos + 4)
                .and_then(|s| s.try_into().ok())
                .ok_or(RequestError::Truncated)?;
            pos += 4;
            Ipv4Addr::from(octets).to_string()
        }
        ATYP_DOMAIN => {
            let len = *data.get(pos).ok_or(RequestError::Truncated)? as usize;
            pos += 1;
            let raw = data.get(pos..pos + len).ok_or(RequestError::Truncated)?;
            pos += len;
            std::str::from_utf8(raw)
                .map_err(|_| RequestError::BadDomain)?
                .to_string()
        }
        ATYP_IPV6 => {
            let octets: [u8; 16] = data
                .get(pos..pos + 16)
                .and_then(|s| s.try_into().ok())
                .ok_or(RequestError::Truncated)?;
            pos += 16;
            format!("[{}]", Ipv6Addr::from(octets))
        }
        other => return Err(RequestError::UnsupportedAddrType(other)),
    };

    Ok(RequestHead {
        target: format!("{host}:{port}"),
        payload: data[pos..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_target() {
        // no addons, TCP, port 443, 1.2.3.4, then payload
        let data = [0x00, 0x01, 0x01, 0xbb, 0x01, 1, 2, 3, 4, 0xde, 0xad];
        let head = parse_request(&data).unwrap();
        assert_eq!(head.target, "1.2.3.4:443");
        assert_eq!(head.payload, vec![0xde, 0xad]);
    }

    #[test]
    fn test_domain_target() {
        let mut data = vec![0x00, 0x01, 0x00, 0x50, 0x02, 11];
        data.extend_from_slice(b"example.com");
        let head = parse_request(&data).unwrap();
        assert_eq!(head.target, "example.com:80");
        assert!(head.payload.is_empty());
    }

    #[test]
    fn test_ipv6_target() {
        let mut data = vec![0x00, 0x01, 0x00, 0x50, 0x03];
        let mut addr = [0u8; 16];
        addr[15] = 1;
        data.extend_from_slice(&addr);
        let head = parse_request(&data).unwrap();
        assert_eq!(head.target, "[::1]:80");
    }

    #[test]
    fn test_addons_are_skipped() {
        let mut data = vec![0x03, 0xaa, 0xbb, 0xcc, 0x01, 0x00, 0x50, 0x02, 4];
        data.extend_from_slice(b"host");
        let head = parse_request(&data).unwrap();
        assert_eq!(head.target, "host:80");
    }

    #[test]
    fn test_truncated() {
        assert_eq!(parse_request(&[]), Err(RequestError::Truncated));
        assert_eq!(parse_request(&[0x00]), Err(RequestError::Truncated));
        assert_eq!(
            parse_request(&[0x00, 0x01, 0x00]),
            Err(RequestError::Truncated)
        );
        // Domain length byte promises more than is there.
        assert_eq!(
            parse_request(&[0x00, 0x01, 0x00, 0x50, 0x02, 10, b'a']),
            Err(RequestError::Truncated)
        );
    }

    #[test]
    fn test_unsupported_command_and_addr_type() {
        assert_eq!(
            parse_request(&[0x00, 0x02, 0x00, 0x50, 0x01, 1, 2, 3, 4]),
            Err(RequestError::UnsupportedCommand(0x02))
        );
        assert_eq!(
            parse_request(&[0x00, 0x01, 0x00, 0x50, 0x04, 1, 2, 3, 4]),
            Err(RequestError::UnsupportedAddrType(0x04))
        );
    }
}
