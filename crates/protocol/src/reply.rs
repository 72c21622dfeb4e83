use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use stormcache_common::ProtocolError;

use crate::frame::{get_line, skip, tokens};

/// Resposta do protocolo texto.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Stored,
    NotStored,
    Deleted,
    NotFound,
    /// Blocos `VALUE` na ordem pedida, sempre seguidos de `END`.
    Values(Vec<(String, Bytes)>),
    /// Comando inexistente.
    Error,
    ClientError(String),
    ServerError(String),
}

impl Reply {
    /// Verifica se uma resposta completa está disponível no buffer sem alocar.
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<(), ProtocolError> {
        let mut line = get_line(src)?;
        if !line.starts_with(b"VALUE") && line != b"END" {
            return Ok(());
        }
        while line != b"END" {
            let (_, len) = value_header(line)?;
            skip(src, len)?;
            line = get_line(src)?;
        }
        Ok(())
    }

    /// Faz o parse de uma resposta completa a partir do cursor.
    /// Deve ser chamado apenas após `check()` retornar Ok.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Reply, ProtocolError> {
        let line = get_line(src)?;
        match line {
            b"STORED" => return Ok(Reply::Stored),
            b"NOT_STORED" => return Ok(Reply::NotStored),
            b"DELETED" => return Ok(Reply::Deleted),
            b"NOT_FOUND" => return Ok(Reply::NotFound),
            b"ERROR" => return Ok(Reply::Error),
            _ => {}
        }
        if let Some(msg) = line.strip_prefix(b"CLIENT_ERROR ") {
            return Ok(Reply::ClientError(to_string(msg)?));
        }
        if let Some(msg) = line.strip_prefix(b"SERVER_ERROR ") {
            return Ok(Reply::ServerError(to_string(msg)?));
        }

        let mut values = Vec::new();
        let mut line = line;
        while line != b"END" {
            let (key, len) = value_header(line)?;
            if src.remaining() < len {
                return Err(ProtocolError::Incomplete);
            }
            let start = src.position() as usize;
            let data = Bytes::copy_from_slice(&src.get_ref()[start..start + len - 2]);
            skip(src, len)?;
            values.push((to_string(key)?, data));
            line = get_line(src)?;
        }
        Ok(Reply::Values(values))
    }

    /// Encoda a resposta no buffer de saída.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Reply::Stored => dst.put(&b"STORED\r\n"[..]),
            Reply::NotStored => dst.put(&b"NOT_STORED\r\n"[..]),
            Reply::Deleted => dst.put(&b"DELETED\r\n"[..]),
            Reply::NotFound => dst.put(&b"NOT_FOUND\r\n"[..]),
            Reply::Values(values) => {
                for (key, data) in values {
                    // O espaço antes do \r\n faz parte do formato da linha VALUE.
                    dst.put(format!("VALUE {key} {} \r\n", data.len()).as_bytes());
                    dst.put(data.as_ref());
                    dst.put(&b"\r\n"[..]);
                }
                dst.put(&b"END\r\n"[..]);
            }
            Reply::Error => dst.put(&b"ERROR\r\n"[..]),
            Reply::ClientError(msg) => {
                dst.put(&b"CLIENT_ERROR "[..]);
                dst.put(msg.as_bytes());
                dst.put(&b"\r\n"[..]);
            }
            Reply::ServerError(msg) => {
                dst.put(&b"SERVER_ERROR "[..]);
                dst.put(msg.as_bytes());
                dst.put(&b"\r\n"[..]);
            }
        }
    }

    /// Helper: encoda a resposta em um novo buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }
}

/// `VALUE <key> <bytes> ` → (key, bytes + 2), contando o `\r\n` do bloco.
fn value_header(line: &[u8]) -> Result<(&[u8], usize), ProtocolError> {
    let parts: Vec<&[u8]> = tokens(line).collect();
    match parts.as_slice() {
        [tag, key, len] if *tag == b"VALUE" => {
            let len = std::str::from_utf8(len)
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .and_then(|len| len.checked_add(2))
                .ok_or_else(|| ProtocolError::InvalidReply(to_lossy(line)))?;
            Ok((*key, len))
        }
        _ => Err(ProtocolError::InvalidReply(to_lossy(line))),
    }
}

fn to_string(data: &[u8]) -> Result<String, ProtocolError> {
    String::from_utf8(data.to_vec()).map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))
}

fn to_lossy(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}
