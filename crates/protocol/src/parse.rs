use bytes::Bytes;
use stormcache_common::{CommandError, MAX_KEY_LENGTH};

use crate::frame::tokens;

/// Cursor sobre os tokens de uma linha de comando.
pub struct Parse {
    parts: Vec<Bytes>,
    pos: usize,
}

impl Parse {
    /// Cria um Parse a partir da linha de comando (sem terminador).
    pub fn new(line: &Bytes) -> Parse {
        let parts = tokens(line).map(|t| line.slice_ref(t)).collect();
        Parse { parts, pos: 0 }
    }

    /// Retorna o próximo token como String.
    pub fn next_string(&mut self) -> Result<String, CommandError> {
        let data = self.next()?;
        String::from_utf8(data.to_vec())
            .map_err(|_| CommandError::InvalidArgument("string UTF-8 inválida".into()))
    }

    /// Retorna o próximo token como chave, validando tamanho e caracteres.
    pub fn next_key(&mut self) -> Result<String, CommandError> {
        let data = self.next()?;
        if data.len() > MAX_KEY_LENGTH {
            return Err(CommandError::InvalidKey(format!(
                "chave excede {MAX_KEY_LENGTH} bytes"
            )));
        }
        if data.iter().any(|b| b.is_ascii_control()) {
            return Err(CommandError::InvalidKey(
                "chave contém caracteres de controle".into(),
            ));
        }
        String::from_utf8(data.to_vec())
            .map_err(|_| CommandError::InvalidKey("chave não é UTF-8 válido".into()))
    }

    /// Retorna o próximo token como i64.
    pub fn next_int(&mut self) -> Result<i64, CommandError> {
        let s = self.next_string()?;
        s.parse::<i64>()
            .map_err(|_| CommandError::InvalidArgument(format!("'{s}' não é um inteiro")))
    }

    /// Retorna o próximo token como comprimento (inteiro não negativo).
    pub fn next_len(&mut self) -> Result<usize, CommandError> {
        let s = self.next_string()?;
        s.parse::<usize>().map_err(|_| {
            CommandError::InvalidArgument(format!("'{s}' não é um comprimento válido"))
        })
    }

    /// Verifica se todos os argumentos foram consumidos.
    pub fn finish(&self) -> Result<(), CommandError> {
        if self.pos < self.parts.len() {
            Err(CommandError::InvalidArgument(
                "argumentos extras não esperados".into(),
            ))
        } else {
            Ok(())
        }
    }

    /// Verifica se ainda há argumentos restantes.
    pub fn has_remaining(&self) -> bool {
        self.pos < self.parts.len()
    }

    /// Retorna o número de argumentos restantes.
    pub fn remaining(&self) -> usize {
        self.parts.len() - self.pos
    }

    fn next(&mut self) -> Result<Bytes, CommandError> {
        if self.pos >= self.parts.len() {
            return Err(CommandError::InvalidArgument(
                "argumentos insuficientes".into(),
            ));
        }
        let part = self.parts[self.pos].clone();
        self.pos += 1;
        Ok(part)
    }
}
