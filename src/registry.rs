//! Named in-memory buffers shared with the toolkit.
//!
//! BART can read inputs from and write outputs to named memory buffers instead
//! of files. Names must end in `.mem`.

use std::collections::HashMap;

use tracing::debug;

use crate::dims::BartDim;
use crate::marshal::{marshal_in, marshal_out, MarshaledArray};
use crate::store::{ArrayId, ArrayStore};
use crate::{BartError, Result};

pub const MEMORY_EXTENSION: &str = ".mem";

fn check_name(name: &str) -> Result<()> {
    if !name.ends_with(MEMORY_EXTENSION) {
        return Err(BartError::InvalidName {
            name: name.to_string(),
            extension: MEMORY_EXTENSION,
        });
    }
    Ok(())
}

/// Registry of named buffers. Outputs are registered empty and filled later.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    buffers: HashMap<String, Option<MarshaledArray>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marshal `id` and register it under `name`, replacing any previous buffer.
    pub fn register_input(&mut self, name: &str, store: &mut ArrayStore, id: ArrayId) -> Result<()> {
        check_name(name)?;
        let marshaled = marshal_out(store, id)?;
        debug!(name, dims = ?marshaled.dims, "registered input buffer");
        self.buffers.insert(name.to_string(), Some(marshaled));
        Ok(())
    }

    /// Reserve `name` for a buffer the toolkit will produce.
    pub fn register_output(&mut self, name: &str) -> Result<()> {
        check_name(name)?;
        debug!(name, "registered output buffer");
        self.buffers.insert(name.to_string(), None);
        Ok(())
    }

    /// Store the toolkit's result under a registered name.
    pub fn write(&mut self, name: &str, array: MarshaledArray) -> Result<()> {
        check_name(name)?;
        let slot = self
            .buffers
            .get_mut(name)
            .ok_or_else(|| BartError::NotRegistered(name.to_string()))?;
        *slot = Some(array);
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> Result<bool> {
        check_name(name)?;
        Ok(self.buffers.contains_key(name))
    }

    /// Load the buffer `name` into `store` as a new dense array.
    ///
    /// With `labels`, the BART layout is folded back as in [`marshal_in`].
    pub fn load(
        &self,
        name: &str,
        store: &mut ArrayStore,
        labels: Option<&[BartDim]>,
    ) -> Result<ArrayId> {
        check_name(name)?;
        let buffer = self
            .buffers
            .get(name)
            .ok_or_else(|| BartError::NotRegistered(name.to_string()))?
            .as_ref()
            .ok_or(BartError::Unsupported("memory buffer has not been written yet"))?;
        marshal_in(store, &buffer.dims, &buffer.data, labels)
    }

    /// Remove `name`, returning its buffer if one was written.
    pub fn unregister(&mut self, name: &str) -> Result<Option<MarshaledArray>> {
        check_name(name)?;
        let buffer = self
            .buffers
            .remove(name)
            .ok_or_else(|| BartError::NotRegistered(name.to_string()))?;
        debug!(name, "unregistered buffer");
        Ok(buffer)
    }
}
