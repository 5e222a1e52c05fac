// Copyright © 2026 Pathway

//! Reduce-side driver turning a sorted, grouped partition into nested
//! open/close notifications.
//!
//! With `rollup_from` set to the group-by field at index `min_depth`, every
//! group-by field from `min_depth` to `max_depth` (the last one) opens a
//! nested group. Without a rollup `min_depth == max_depth` and each group gets
//! exactly one open, one batch of elements and one close.

use log::debug;

use super::config::CoGroupConfig;
use super::error::{DynResult, Error, Result};
use super::serialization::TupleDeserializer;
use super::tuple::Tuple;

/// The processing stage fed by a [`RollupReducer`].
///
/// Keys are tuples of the common schema and are only valid for the duration
/// of the call; the reducer reuses their storage for later groups.
pub trait RollupHandler {
    fn on_open_group(&mut self, depth: usize, field: &str, key: &Tuple) -> DynResult<()>;

    fn on_close_group(&mut self, depth: usize, field: &str, key: &Tuple) -> DynResult<()>;

    /// Receives the values of one group. Values left unread are skipped by the reducer.
    fn on_group_elements(&mut self, key: &Tuple, values: &mut GroupValues<'_, '_>)
        -> DynResult<()>;
}

impl<H: RollupHandler + ?Sized> RollupHandler for Box<H> {
    fn on_open_group(&mut self, depth: usize, field: &str, key: &Tuple) -> DynResult<()> {
        (**self).on_open_group(depth, field, key)
    }

    fn on_close_group(&mut self, depth: usize, field: &str, key: &Tuple) -> DynResult<()> {
        (**self).on_close_group(depth, field, key)
    }

    fn on_group_elements(
        &mut self,
        key: &Tuple,
        values: &mut GroupValues<'_, '_>,
    ) -> DynResult<()> {
        (**self).on_group_elements(key, values)
    }
}

/// Values of the current group, deserialized into native tuples on demand.
pub struct GroupValues<'a, 'v> {
    raw: &'a mut (dyn Iterator<Item = &'v [u8]> + 'a),
    deserializer: &'a mut TupleDeserializer,
    consumed: usize,
}

impl<'a, 'v> GroupValues<'a, 'v> {
    fn new(
        raw: &'a mut (dyn Iterator<Item = &'v [u8]> + 'a),
        deserializer: &'a mut TupleDeserializer,
    ) -> Self {
        Self {
            raw,
            deserializer,
            consumed: 0,
        }
    }

    /// The next value as a native tuple of its source. The tuple is overwritten
    /// by the following call.
    pub fn next_tuple(&mut self) -> Option<Result<&Tuple>> {
        let bytes = self.raw.next()?;
        self.consumed += 1;
        Some(self.deserializer.deserialize(bytes))
    }

    /// The next value in its serialized, unified form.
    pub fn next_raw(&mut self) -> Option<&'v [u8]> {
        let bytes = self.raw.next()?;
        self.consumed += 1;
        Some(bytes)
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    fn drain(&mut self) -> usize {
        let skipped = (&mut *self.raw).count();
        self.consumed += skipped;
        skipped
    }
}

/// The two alternating key buffers. After every group the slots are swapped,
/// so the key just processed becomes the previous one and its old storage is
/// reused for the next key.
#[derive(Debug)]
struct KeySlots {
    slots: [Tuple; 2],
    current: usize,
}

impl KeySlots {
    fn new(empty: &Tuple) -> Self {
        Self {
            slots: [empty.clone(), empty.clone()],
            current: 0,
        }
    }

    fn current(&self) -> &Tuple {
        &self.slots[self.current]
    }

    fn current_mut(&mut self) -> &mut Tuple {
        &mut self.slots[self.current]
    }

    fn previous(&self) -> &Tuple {
        &self.slots[1 - self.current]
    }

    fn swap(&mut self) {
        self.current = 1 - self.current;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollupState {
    BeforeFirstGroup,
    /// Groups from `min_depth` up to the given depth are open.
    InGroup(usize),
    AfterLastGroup,
}

/// Index of the first group-by field on which two keys differ, if any.
fn first_difference(previous: &Tuple, current: &Tuple, max_depth: usize) -> Option<usize> {
    previous
        .values()
        .iter()
        .zip(current.values())
        .take(max_depth + 1)
        .position(|(previous, current)| previous != current)
}

/// Drives a [`RollupHandler`] over one partition, one `(key, values)` group at a time.
#[derive(Debug)]
pub struct RollupReducer<H> {
    config: CoGroupConfig,
    handler: H,
    deserializer: TupleDeserializer,
    keys: KeySlots,
    state: RollupState,
}

impl<H: RollupHandler> RollupReducer<H> {
    pub fn new(config: &CoGroupConfig, handler: H) -> Self {
        let deserializer = TupleDeserializer::new(config);
        let keys = KeySlots::new(&deserializer.new_common_tuple());
        Self {
            config: config.clone(),
            handler,
            deserializer,
            keys,
            state: RollupState::BeforeFirstGroup,
        }
    }

    pub fn state(&self) -> RollupState {
        self.state
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Processes the next group of the partition. `key` is any serialized
    /// record of the group; groups must arrive in sort order.
    pub fn reduce<'v, I>(&mut self, key: &[u8], values: I) -> Result<()>
    where
        I: IntoIterator<Item = &'v [u8]>,
    {
        if self.state == RollupState::AfterLastGroup {
            return Err(Error::PartitionFinished);
        }
        self.deserializer
            .deserialize_common(key, self.keys.current_mut())?;

        let min_depth = self.config.min_depth();
        let max_depth = self.config.max_depth();
        let group_by = self.config.group_by();
        let divergence = if let RollupState::InGroup(_) = self.state {
            let divergence = first_difference(self.keys.previous(), self.keys.current(), max_depth)
                .ok_or(Error::NoDivergence)?
                .max(min_depth);
            debug!("group boundary at depth {divergence} ({})", group_by[divergence]);
            for depth in (divergence..=max_depth).rev() {
                self.handler
                    .on_close_group(depth, &group_by[depth], self.keys.previous())?;
            }
            divergence
        } else {
            min_depth
        };
        for depth in divergence..=max_depth {
            self.handler
                .on_open_group(depth, &group_by[depth], self.keys.current())?;
        }

        let mut raw = values.into_iter();
        let mut values = GroupValues::new(&mut raw, &mut self.deserializer);
        self.handler
            .on_group_elements(self.keys.current(), &mut values)?;
        let skipped = values.drain();
        if skipped > 0 {
            debug!("skipped {skipped} unread value(s) of group");
        }

        self.keys.swap();
        self.state = RollupState::InGroup(max_depth);
        Ok(())
    }

    /// Closes the groups still open after the last key of the partition.
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            RollupState::AfterLastGroup => return Err(Error::PartitionFinished),
            RollupState::BeforeFirstGroup => {}
            RollupState::InGroup(open_depth) => {
                let group_by = self.config.group_by();
                for depth in (self.config.min_depth()..=open_depth).rev() {
                    self.handler
                        .on_close_group(depth, &group_by[depth], self.keys.previous())?;
                }
            }
        }
        self.state = RollupState::AfterLastGroup;
        Ok(())
    }

    /// Reduces a whole partition and finishes it.
    pub fn run<'v, G, V>(&mut self, groups: G) -> Result<()>
    where
        G: IntoIterator<Item = (&'v [u8], V)>,
        V: IntoIterator<Item = &'v [u8]>,
    {
        for (key, values) in groups {
            self.reduce(key, values)?;
        }
        self.finish()
    }
}
