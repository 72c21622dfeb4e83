use bytes::Bytes;
use std::io::Cursor;
use stormcache_common::{Clock, CommandError, Expiry};

use crate::{Frame, Parse};

/// Enum com todos os comandos suportados.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Armazena só se a chave não existir.
    Add {
        key: String,
        value: Bytes,
        expires_at: Expiry,
    },
    Set {
        key: String,
        value: Bytes,
        expires_at: Expiry,
    },
    /// Armazena só se a chave já existir.
    Replace {
        key: String,
        value: Bytes,
        expires_at: Expiry,
    },
    Delete(String),
    Get(Vec<String>),
}

impl Command {
    /// Faz o parse de um Frame em um Command.
    ///
    /// O `exptime` do protocolo é convertido aqui em instante absoluto, usando
    /// `clock` como referência para expirações relativas.
    pub fn from_frame(frame: Frame, clock: &dyn Clock) -> Result<Command, CommandError> {
        let mut parse = Parse::new(&frame.line);
        if !parse.has_remaining() {
            return Err(CommandError::Empty);
        }
        let cmd_name = parse.next_string()?.to_lowercase();

        let cmd = match cmd_name.as_str() {
            "add" => {
                let (key, value, expires_at) = parse_storage("add", &mut parse, frame.data, clock)?;
                Command::Add {
                    key,
                    value,
                    expires_at,
                }
            }
            "set" => {
                let (key, value, expires_at) = parse_storage("set", &mut parse, frame.data, clock)?;
                Command::Set {
                    key,
                    value,
                    expires_at,
                }
            }
            "replace" => {
                let (key, value, expires_at) =
                    parse_storage("replace", &mut parse, frame.data, clock)?;
                Command::Replace {
                    key,
                    value,
                    expires_at,
                }
            }
            "delete" => {
                if parse.remaining() != 1 {
                    return Err(CommandError::WrongArity("delete".into()));
                }
                let key = parse.next_key()?;
                parse.finish()?;
                Command::Delete(key)
            }
            "get" => {
                if !parse.has_remaining() {
                    return Err(CommandError::WrongArity("get".into()));
                }
                let mut keys = Vec::with_capacity(parse.remaining());
                while parse.has_remaining() {
                    keys.push(parse.next_key()?);
                }
                Command::Get(keys)
            }
            _ => return Err(CommandError::Unknown(cmd_name)),
        };

        Ok(cmd)
    }

    /// Faz o parse de uma requisição completa (linha + bloco de dados).
    pub fn parse(input: &[u8], clock: &dyn Clock) -> Result<Command, CommandError> {
        let mut cursor = Cursor::new(input);
        Frame::check(&mut cursor)?;
        cursor.set_position(0);
        let frame = Frame::parse(&mut cursor)?;
        let cmd = Command::from_frame(frame, clock)?;
        if (cursor.position() as usize) < input.len() {
            return Err(CommandError::InvalidArgument(
                "bytes extras após a requisição".into(),
            ));
        }
        Ok(cmd)
    }

    /// Nome do comando no protocolo.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Add { .. } => "add",
            Command::Set { .. } => "set",
            Command::Replace { .. } => "replace",
            Command::Delete(_) => "delete",
            Command::Get(_) => "get",
        }
    }
}

/// `<key> <exptime> <bytes>` seguido de exatamente `<bytes>` bytes e `\r\n`.
fn parse_storage(
    name: &str,
    parse: &mut Parse,
    data: Option<Bytes>,
    clock: &dyn Clock,
) -> Result<(String, Bytes, Expiry), CommandError> {
    if parse.remaining() != 3 {
        return Err(CommandError::WrongArity(name.into()));
    }
    let key = parse.next_key()?;
    let exptime = parse.next_int()?;
    let len = parse.next_len()?;
    parse.finish()?;

    let data = data.ok_or(CommandError::BadDataChunk)?;
    if len.checked_add(2) != Some(data.len()) || &data[len..] != b"\r\n" {
        return Err(CommandError::BadDataChunk);
    }

    let expires_at = Expiry::from_exptime(exptime, clock);
    Ok((key, data.slice(..len), expires_at))
}
