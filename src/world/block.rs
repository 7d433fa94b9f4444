use std::collections::BTreeMap;

#[macro_export]
macro_rules! block_state {
    ($id: expr, $data: expr) => {
        (($id as u16) << 4 | (($data as u16) & 0x0f))
    };
}

const FULL_OPAQUE: u8 = 0x01;
const BLOCK_ENTITY: u8 = 0x02;

/// An interned block state. Air is represented by `None` wherever a state
/// is optional.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct BlockState {
    raw: u16,
    flags: u8,
}

impl BlockState {
    pub const fn opaque(raw: u16) -> BlockState {
        BlockState {
            raw,
            flags: FULL_OPAQUE,
        }
    }

    pub const fn translucent(raw: u16) -> BlockState {
        BlockState { raw, flags: 0 }
    }

    pub const fn with_block_entity(self) -> BlockState {
        BlockState {
            raw: self.raw,
            flags: self.flags | BLOCK_ENTITY,
        }
    }

    pub fn raw(&self) -> u16 {
        self.raw
    }

    pub fn id(&self) -> u16 {
        self.raw >> 4
    }

    pub fn meta(&self) -> u8 {
        (self.raw & 0x0f) as u8
    }

    pub fn is_full_opaque(&self) -> bool {
        self.flags & FULL_OPAQUE != 0
    }

    pub fn has_block_entity(&self) -> bool {
        self.flags & BLOCK_ENTITY != 0
    }
}

pub fn is_full_opaque(state: Option<BlockState>) -> bool {
    state.map_or(false, |state| state.is_full_opaque())
}

pub mod blocks {
    use super::BlockState;

    pub const STONE: BlockState = BlockState::opaque(block_state!(1, 0));
    pub const GRASS: BlockState = BlockState::opaque(block_state!(2, 0));
    pub const DIRT: BlockState = BlockState::opaque(block_state!(3, 0));
    pub const BEDROCK: BlockState = BlockState::opaque(block_state!(7, 0));
    pub const WATER: BlockState = BlockState::translucent(block_state!(9, 0));
    pub const SAND: BlockState = BlockState::opaque(block_state!(12, 0));
    pub const GLASS: BlockState = BlockState::translucent(block_state!(20, 0));
    pub const TALL_GRASS: BlockState = BlockState::translucent(block_state!(31, 1));
    pub const CHEST: BlockState = BlockState::translucent(block_state!(54, 0)).with_block_entity();
    pub const FURNACE: BlockState = BlockState::opaque(block_state!(61, 0)).with_block_entity();

    pub fn ore(id: u8) -> BlockState {
        BlockState::opaque(block_state!(id, 0))
    }
}

/// Auxiliary per-position data attached to a block-entity-bearing state.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockEntity {
    state: BlockState,
    pub data: BTreeMap<String, serde_json::Value>,
}

impl BlockEntity {
    pub fn new(state: BlockState) -> BlockEntity {
        debug_assert!(state.has_block_entity());
        BlockEntity {
            state,
            data: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> BlockState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_state_packs_id_and_meta() {
        let state = BlockState::opaque(block_state!(17, 3));
        assert_eq!(state.id(), 17);
        assert_eq!(state.meta(), 3);
        assert!(state.is_full_opaque());
        assert!(!state.has_block_entity());
    }

    #[test]
    fn air_is_never_opaque() {
        assert!(!is_full_opaque(None));
        assert!(!is_full_opaque(Some(blocks::GLASS)));
        assert!(is_full_opaque(Some(blocks::STONE)));
        assert!(blocks::CHEST.has_block_entity());
    }
}
