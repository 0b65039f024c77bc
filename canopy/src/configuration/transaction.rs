//! Bulk reconfiguration transactions.
//!
//! A transaction suspends integrity checking for the whole tree, lets any
//! number of mutations through (including transiently inconsistent states),
//! and settles at close: subtrees are checked bottom-up, then the owner.
//! A failed close or an explicit rollback restores every touched element
//! from its first-touch snapshot and re-raises the failure, leaving the
//! tree exactly as it was before the transaction opened.

use crate::element::{Payload, SubValue};
use crate::error::{Error, Result};
use crate::lifecycle::LifecyclePhase;

use super::Configuration;

impl Configuration {
    /// Opens a reconfiguration transaction on this tree and, recursively,
    /// on every owned subtree.
    ///
    /// Opening on a tree that is already reconfiguring is a no-op, so
    /// nested openings share the enclosing suspension window.
    ///
    /// # Errors
    ///
    /// `ReadOnly` for a finalised tree, `NotInitialised` for one that was
    /// never initialised.
    pub fn begin_reconfiguration(&mut self) -> Result<()> {
        match self.phase {
            LifecyclePhase::Reconfiguring => return Ok(()),
            LifecyclePhase::Initialised => {}
            LifecyclePhase::Finalised => return Err(self.err_read_only()),
            _ => return Err(self.err_not_initialised()),
        }
        self.phase = LifecyclePhase::Reconfiguring;
        for element in self.elements.values_mut() {
            if let Payload::Sub(SubValue::Owned(sub)) = &mut element.payload {
                sub.begin_reconfiguration()?;
            }
        }
        log::debug!("reconfiguration of '{}' opened", self.tree_type());
        Ok(())
    }

    /// Closes the transaction, validating subtrees bottom-up and then this
    /// tree. Any failure rolls the whole tree back and re-raises.
    ///
    /// Closing an initialised tree with no open transaction is a no-op, so
    /// a nested close inside an enclosing transaction's scope never
    /// double-settles.
    ///
    /// # Errors
    ///
    /// The re-raised `IntegrityViolation` of the first failing tree,
    /// `ReadOnly` for a finalised tree, or `NotInitialised` for one that
    /// was never initialised.
    pub fn close_reconfiguration(&mut self) -> Result<()> {
        match self.phase {
            LifecyclePhase::Reconfiguring => {}
            LifecyclePhase::Initialised => return Ok(()),
            LifecyclePhase::Finalised => return Err(self.err_read_only()),
            _ => return Err(self.err_not_initialised()),
        }
        let names: Vec<String> = self.schema.element_names().to_vec();
        let mut failure: Option<Error> = None;
        for name in names {
            if let Some(element) = self.elements.get_mut(&name) {
                if let Payload::Sub(SubValue::Owned(sub)) = &mut element.payload {
                    if let Err(e) = sub.close_reconfiguration() {
                        failure = Some(e);
                        break;
                    }
                }
            }
        }
        if let Some(e) = failure {
            self.rollback();
            return Err(e);
        }
        if let Err(e) = self.run_integrity() {
            self.rollback();
            return Err(e);
        }
        self.restore_point.clear();
        self.phase = LifecyclePhase::Initialised;
        log::debug!("reconfiguration of '{}' committed", self.tree_type());
        Ok(())
    }

    /// Runs `edit` inside a reconfiguration transaction.
    ///
    /// When this call opened the transaction, an `Ok` from the closure
    /// closes it (running the deferred integrity checks) and an `Err`
    /// rolls it back. When the tree was already reconfiguring, the
    /// enclosing transaction owns settlement and this call only forwards
    /// the closure's result.
    ///
    /// # Errors
    ///
    /// The closure's error, or any error from opening or closing the
    /// transaction.
    pub fn reconfigure<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Configuration) -> Result<()>,
    {
        let nested = self.phase == LifecyclePhase::Reconfiguring;
        self.begin_reconfiguration()?;
        let outcome = edit(self);
        if nested {
            return outcome;
        }
        match outcome {
            Ok(()) => self.close_reconfiguration(),
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }

    /// Restores every touched element from its first-touch snapshot and
    /// returns the whole tree to the initialised phase.
    ///
    /// Restoring a touched element wholesale also restores any subtree it
    /// held, so nested changes need no per-level bookkeeping; the restored
    /// subtrees merely have their phases reset afterwards.
    pub(crate) fn rollback(&mut self) {
        log::debug!("rolling back reconfiguration of '{}'", self.tree_type());
        let restore: Vec<(String, Payload)> = self.restore_point.drain().collect();
        for (name, payload) in restore {
            if let Some(element) = self.elements.get_mut(&name) {
                element.payload = payload;
            }
        }
        self.force_idle();
    }

    /// Forces this tree and every owned subtree out of any open
    /// transaction, discarding snapshots.
    fn force_idle(&mut self) {
        if self.phase == LifecyclePhase::Reconfiguring {
            self.phase = LifecyclePhase::Initialised;
        }
        self.restore_point.clear();
        for element in self.elements.values_mut() {
            if let Payload::Sub(SubValue::Owned(sub)) = &mut element.payload {
                sub.force_idle();
            }
        }
    }
}
