use tracing::debug;

use stormcache_protocol::{Command, Reply};

use crate::Db;

/// Resolve um comando contra o store, produzindo a resposta do protocolo.
pub trait Resolve {
    fn resolve(&self, db: &Db) -> Reply;
}

impl Resolve for Command {
    fn resolve(&self, db: &Db) -> Reply {
        match self {
            Command::Add {
                key,
                value,
                expires_at,
            } => stored(db.add(key.clone(), value.clone(), *expires_at)),
            Command::Set {
                key,
                value,
                expires_at,
            } => {
                db.set(key.clone(), value.clone(), *expires_at);
                Reply::Stored
            }
            Command::Replace {
                key,
                value,
                expires_at,
            } => stored(db.replace(key.clone(), value.clone(), *expires_at)),
            Command::Delete(key) => {
                if db.delete(key) {
                    Reply::Deleted
                } else {
                    Reply::NotFound
                }
            }
            Command::Get(keys) => {
                let values: Vec<_> = keys
                    .iter()
                    .filter_map(|key| db.get(key).map(|value| (key.clone(), value)))
                    .collect();
                debug!("get: {} de {} chaves encontradas", values.len(), keys.len());
                Reply::Values(values)
            }
        }
    }
}

fn stored(was_stored: bool) -> Reply {
    if was_stored {
        Reply::Stored
    } else {
        Reply::NotStored
    }
}
