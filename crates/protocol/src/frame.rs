use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use stormcache_common::{MAX_LINE_LENGTH, MAX_VALUE_SIZE, ProtocolError};

/// Comandos cuja linha é seguida de um bloco de dados.
const STORAGE_COMMANDS: [&[u8]; 3] = [b"add", b"set", b"replace"];

/// Uma requisição completa do protocolo texto: linha de comando mais o bloco
/// de dados dos comandos de armazenamento.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Linha de comando, sem o terminador.
    pub line: Bytes,
    /// Bloco de dados, incluindo o `\r\n` final. Só existe para add/set/replace.
    pub data: Option<Bytes>,
}

impl Frame {
    /// Verifica se uma requisição completa está disponível no buffer sem alocar.
    /// Retorna Ok(()) se completa, Err(Incomplete) se precisa mais dados.
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<(), ProtocolError> {
        let line = get_line(src)?;
        if let Some(len) = data_len(line)? {
            skip(src, len + 2)?; // data + \r\n
        }
        Ok(())
    }

    /// Faz o parse de uma requisição completa a partir do cursor.
    /// Deve ser chamado apenas após `check()` retornar Ok.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Frame, ProtocolError> {
        let line = get_line(src)?;
        let data = match data_len(line)? {
            Some(len) => {
                if src.remaining() < len + 2 {
                    return Err(ProtocolError::Incomplete);
                }
                let start = src.position() as usize;
                let data = Bytes::copy_from_slice(&src.get_ref()[start..start + len + 2]);
                src.set_position((start + len + 2) as u64);
                Some(data)
            }
            None => None,
        };
        Ok(Frame {
            line: Bytes::copy_from_slice(line),
            data,
        })
    }

    /// Encoda a requisição no buffer de saída.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put(self.line.as_ref());
        dst.put(&b"\r\n"[..]);
        if let Some(data) = &self.data {
            dst.put(data.as_ref());
        }
    }

    /// Helper: requisição sem bloco de dados (get, delete).
    pub fn line(s: &str) -> Frame {
        Frame {
            line: Bytes::from(s.to_string()),
            data: None,
        }
    }

    /// Helper: requisição de armazenamento com o comprimento calculado.
    pub fn storage(name: &str, key: &str, exptime: i64, value: &[u8]) -> Frame {
        let mut data = BytesMut::with_capacity(value.len() + 2);
        data.put(value);
        data.put(&b"\r\n"[..]);
        Frame {
            line: Bytes::from(format!("{name} {key} {exptime} {}", value.len())),
            data: Some(data.freeze()),
        }
    }
}

/// Divide uma linha em tokens separados por whitespace ASCII.
pub(crate) fn tokens(line: &[u8]) -> impl Iterator<Item = &[u8]> {
    line.split(|b| b.is_ascii_whitespace())
        .filter(|t| !t.is_empty())
}

/// Comprimento do bloco de dados anunciado pela linha, se houver.
///
/// Só linhas de armazenamento bem formadas (`<cmd> <key> <exptime> <bytes>`)
/// anunciam dados; o resto é validado depois, em `Command::from_frame`.
fn data_len(line: &[u8]) -> Result<Option<usize>, ProtocolError> {
    let parts: Vec<&[u8]> = tokens(line).collect();
    if parts.len() != 4
        || !STORAGE_COMMANDS
            .iter()
            .any(|name| parts[0].eq_ignore_ascii_case(name))
    {
        return Ok(None);
    }

    let len = match std::str::from_utf8(parts[3])
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
    {
        Some(len) => len,
        None => return Ok(None),
    };
    if len > MAX_VALUE_SIZE {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    Ok(Some(len))
}

/// Lê uma linha terminada em `\r\n` (ou `\n`), sem o terminador.
pub(crate) fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], ProtocolError> {
    let buf: &'a [u8] = *src.get_ref();
    let start = src.position() as usize;

    match buf[start..].iter().position(|&b| b == b'\n') {
        Some(offset) => {
            let newline = start + offset;
            let end = if offset > 0 && buf[newline - 1] == b'\r' {
                newline - 1
            } else {
                newline
            };
            if end - start > MAX_LINE_LENGTH {
                return Err(ProtocolError::LineTooLong(MAX_LINE_LENGTH));
            }
            src.set_position((newline + 1) as u64);
            Ok(&buf[start..end])
        }
        None if buf.len() - start > MAX_LINE_LENGTH => {
            Err(ProtocolError::LineTooLong(MAX_LINE_LENGTH))
        }
        None => Err(ProtocolError::Incomplete),
    }
}

pub(crate) fn skip(src: &mut Cursor<&[u8]>, n: usize) -> Result<(), ProtocolError> {
    if src.remaining() < n {
        return Err(ProtocolError::Incomplete);
    }
    src.set_position(src.position() + n as u64);
    Ok(())
}
