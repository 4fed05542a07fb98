//! Transaction handle threaded through one removal and its nested removals.

use super::bus::EventBus;
use super::error::{CascadeError, CascadeResult};
use super::event::CascadeEvent;
use rusqlite::{Connection, Transaction};

/// Upper bound for nested removals triggered from subscribers.
pub const MAX_CASCADE_DEPTH: usize = 16;

/// Ambient context of an in-flight removal.
///
/// Only removal coordinators create scopes, so holding one proves the caller
/// runs inside a removal transaction. Store deletion APIs require it.
pub struct CascadeScope<'a> {
    conn: &'a Connection,
    bus: &'a EventBus,
    depth: usize,
}

impl<'a> CascadeScope<'a> {
    pub(crate) fn new(tx: &'a Transaction<'_>, bus: &'a EventBus) -> Self {
        Self {
            conn: tx,
            bus,
            depth: 0,
        }
    }

    /// Connection bound to the removal transaction.
    pub fn connection(&self) -> &'a Connection {
        self.conn
    }

    pub fn bus(&self) -> &'a EventBus {
        self.bus
    }

    /// Nesting level; `0` for the removal the caller started.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Publishes `event` to the subscribers of this scope's bus.
    pub fn publish(&self, event: &CascadeEvent) -> CascadeResult<()> {
        self.bus.publish(self, event)
    }

    pub(crate) fn nested(&self) -> CascadeResult<CascadeScope<'a>> {
        let depth = self.depth + 1;
        if depth > MAX_CASCADE_DEPTH {
            return Err(CascadeError::Conflict(format!(
                "cascade nesting exceeds {MAX_CASCADE_DEPTH} levels"
            )));
        }
        Ok(Self {
            conn: self.conn,
            bus: self.bus,
            depth,
        })
    }
}
