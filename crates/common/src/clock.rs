use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::RELATIVE_EXPIRY_LIMIT_SECS;

/// Instante de expiração de um item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Item nunca expira.
    Never,
    /// Item deixa de ser válido a partir deste instante.
    At(SystemTime),
}

impl Expiry {
    /// `true` se um item com esta expiração ainda é válido em `now`.
    pub fn is_valid_at(&self, now: SystemTime) -> bool {
        match self {
            Expiry::Never => true,
            Expiry::At(t) => *t > now,
        }
    }

    /// Converte o argumento `exptime` do protocolo em um instante absoluto
    /// segundo `clock`.
    ///
    /// - `0`: sentinela `clock.never_expires()`;
    /// - negativo: já expirado;
    /// - até 30 dias: segundos relativos a `clock.now()`;
    /// - acima disso: timestamp Unix absoluto em segundos.
    pub fn from_exptime(exptime: i64, clock: &dyn Clock) -> Expiry {
        match exptime {
            0 => clock.never_expires(),
            n if n < 0 => Expiry::At(clock.now()),
            n if n <= RELATIVE_EXPIRY_LIMIT_SECS => clock
                .now()
                .checked_add(Duration::from_secs(n as u64))
                .map_or_else(|| clock.never_expires(), Expiry::At),
            // Fora do intervalo representável por SystemTime: trata como sem expiração.
            n => UNIX_EPOCH
                .checked_add(Duration::from_secs(n as u64))
                .map_or_else(|| clock.never_expires(), Expiry::At),
        }
    }
}

/// Fonte de tempo usada em todo cálculo de expiração.
///
/// `SystemTime` é sempre relativo à época Unix (UTC), então dois instantes
/// vindos de um mesmo `Clock` são diretamente comparáveis.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> SystemTime;

    fn never_expires(&self) -> Expiry {
        Expiry::Never
    }
}

/// Relógio de parede do sistema.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Relógio controlado manualmente, para testes e benchmarks.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: SystemTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(SystemTime::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
