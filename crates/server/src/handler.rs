use tokio::sync::broadcast;
use tracing::{debug, warn};

use stormcache_common::{CommandError, ConnectionError};
use stormcache_protocol::{Command, Reply};
use stormcache_storage::{Db, Resolve};

use crate::Connection;

/// Loop principal de tratamento de uma conexão.
pub async fn handle_connection(
    mut conn: Connection,
    db: Db,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), ConnectionError> {
    loop {
        let frame = tokio::select! {
            result = conn.read_frame() => result?,
            _ = shutdown.recv() => {
                return Ok(());
            }
        };

        let frame = match frame {
            Some(f) => f,
            None => return Ok(()), // EOF
        };

        let reply = match Command::from_frame(frame, db.clock()) {
            Ok(cmd) => {
                debug!("comando recebido: {}", cmd.name());
                cmd.resolve(&db)
            }
            Err(e) => {
                warn!("comando rejeitado: {e}");
                error_reply(&e)
            }
        };

        conn.write_reply(&reply).await?;
    }
}

/// Traduz um erro de parsing na resposta de erro do protocolo.
fn error_reply(err: &CommandError) -> Reply {
    match err {
        CommandError::Empty | CommandError::Unknown(_) => Reply::Error,
        other => Reply::ClientError(other.to_string()),
    }
}
