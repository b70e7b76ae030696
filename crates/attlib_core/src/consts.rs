// crates/attlib_core/src/consts.rs

use core::mem::size_of;

/// Bytes per page in the data region.
pub const PAGE_SIZE: usize = 2048;
pub const WORD_SIZE: usize = size_of::<u32>();
pub const WORDS_PER_PAGE: usize = PAGE_SIZE / WORD_SIZE;

/// Byte offset of page 0.
pub const DATA_REGION_START: u64 = 0x1000;
/// Byte offset of the 8-entry segment pointer table.
pub const SEGMENT_POINTERS_OFFSET: u64 = 0x0800;
pub const SEGMENT_POINTER_COUNT: usize = 8;

/// Advance to the next page and continue at word 0.
pub const PAGE_SWITCH: u32 = 0x0000_0000;
/// Terminates the current segment stream.
pub const SEGMENT_END: u32 = 0xFFFF_FFFF;

pub const BASE27_OFFSET: u32 = 0x81BF1;
pub const MIN_HASH: u32 = 0x81BF2;
pub const MAX_HASH: u32 = 0x171F_AD39;
/// 27^6 distinct values fit between MIN_HASH and MAX_HASH.
pub const MAX_NAME_LEN: usize = 6;

pub const DEFAULT_FLAG_NONE: u32 = 1;
pub const DEFAULT_FLAG_PRESENT: u32 = 2;

pub const TEXT_PLACEHOLDER: char = '?';

/// Segment kinds, named after the tables the application loads them into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SegmentKind {
    /// ATGTIX: hash -> (page, slot)
    Index,
    /// ATGTDF: hash -> type and default
    Definition,
    /// ATNAIN: (attribute, noun) -> physical word offset
    Binding,
    /// ATGTSX: attribute/noun applicability
    Syntax,
}

impl SegmentKind {
    pub fn table_name(self) -> &'static str {
        match self {
            SegmentKind::Index => "ATGTIX",
            SegmentKind::Definition => "ATGTDF",
            SegmentKind::Binding => "ATNAIN",
            SegmentKind::Syntax => "ATGTSX",
        }
    }
}

const _: () = { assert!(PAGE_SIZE % WORD_SIZE == 0); };
const _: () = { assert!(MAX_HASH as u64 == BASE27_OFFSET as u64 + 387_420_489 - 1); };
