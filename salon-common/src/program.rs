//! Reorder orchestration for a concert program
//!
//! Moving a performance is a two-phase command:
//!
//! 1. [`Program::apply_move`] rearranges the in-memory program and assigns the
//!    moved item a key between its new neighbours
//! 2. [`Program::commit`] persists that single key through a [`KeyStore`];
//!    if persisting fails the program is restored from the command's snapshot
//!
//! No other performance's key is touched.

use crate::db::models::{sort_program, Performance};
use crate::order_key::{key_for_slot, OrderKey};
use crate::{Error, Result};
use std::future::Future;
use tracing::{debug, warn};

/// Persistence for a single performance's order key
pub trait KeyStore {
    fn persist_key(
        &self,
        performance_id: &str,
        key: &OrderKey,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// A move applied locally, with the data needed to undo it
#[derive(Debug, Clone)]
pub struct MoveCommand {
    pub performance_id: String,
    pub from: usize,
    pub to: usize,
    pub previous_key: OrderKey,
    pub new_key: OrderKey,
    snapshot: Vec<Performance>,
}

/// Performances of one concert in display order
#[derive(Debug, Clone)]
pub struct Program {
    concert_id: String,
    items: Vec<Performance>,
}

impl Program {
    pub fn new(concert_id: impl Into<String>, mut items: Vec<Performance>) -> Self {
        sort_program(&mut items);
        Self {
            concert_id: concert_id.into(),
            items,
        }
    }

    pub fn concert_id(&self) -> &str {
        &self.concert_id
    }

    pub fn items(&self) -> &[Performance] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Performance> {
        self.items
    }

    pub fn position(&self, performance_id: &str) -> Option<usize> {
        self.items.iter().position(|p| p.id == performance_id)
    }

    /// Phase one: move the item at `from` so it ends up at index `to`
    ///
    /// Returns `None` when `from == to`. On a key generation failure the
    /// program is left untouched.
    pub fn apply_move(&mut self, from: usize, to: usize) -> Result<Option<MoveCommand>> {
        let len = self.items.len();
        if from >= len || to >= len {
            return Err(Error::InvalidInput(format!(
                "Move {} -> {} out of range for {} performances",
                from, to, len
            )));
        }
        if from == to {
            return Ok(None);
        }

        let snapshot = self.items.clone();
        let mut item = self.items.remove(from);

        let prev = to.checked_sub(1).and_then(|i| self.items.get(i));
        let next = self.items.get(to);
        let new_key = match key_for_slot(prev.map(|p| &p.order_key), next.map(|p| &p.order_key)) {
            Ok(key) => key,
            Err(e) => {
                self.items = snapshot;
                return Err(e.into());
            }
        };

        debug!(
            "Moving performance {} from {} to {}: {} -> {}",
            item.id, from, to, item.order_key, new_key
        );

        let previous_key = std::mem::replace(&mut item.order_key, new_key.clone());
        let performance_id = item.id.clone();
        self.items.insert(to, item);

        Ok(Some(MoveCommand {
            performance_id,
            from,
            to,
            previous_key,
            new_key,
            snapshot,
        }))
    }

    /// Phase two: persist the moved item's key, rolling back on failure
    pub async fn commit<S: KeyStore>(&mut self, command: &MoveCommand, store: &S) -> Result<()> {
        if let Err(e) = store
            .persist_key(&command.performance_id, &command.new_key)
            .await
        {
            warn!(
                "Failed to persist order key for {}: {}; rolling back",
                command.performance_id, e
            );
            self.rollback(command);
            return Err(e);
        }
        Ok(())
    }

    /// Restore the program to its state before `command` was applied
    pub fn rollback(&mut self, command: &MoveCommand) {
        self.items = command.snapshot.clone();
    }

    /// Apply and commit a move of `performance_id` to index `to`
    pub async fn move_performance<S: KeyStore>(
        &mut self,
        performance_id: &str,
        to: usize,
        store: &S,
    ) -> Result<Option<MoveCommand>> {
        let from = self
            .position(performance_id)
            .ok_or_else(|| Error::NotFound(format!("Performance {}", performance_id)))?;

        let Some(command) = self.apply_move(from, to)? else {
            return Ok(None);
        };
        self.commit(&command, store).await?;
        Ok(Some(command))
    }
}
