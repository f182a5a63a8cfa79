//! Instruction word encoding
//!
//! Every program step is one packed 32-bit word:
//!
//! ```text
//!  31            16 15  13 12  10 9  8 7   5 4     0
//! +----------------+------+------+----+-----+-------+
//! |     value      |  --  |  op  | aux|flags| type  |
//! +----------------+------+------+----+-----+-------+
//! ```
//!
//! Types below [`COND_TYPE_BEGIN`] are actions, the rest are conditions.
//! `aux` is reserved and always zero in this encoding revision.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Encoding revision of the instruction word layout
pub const ENCODING_VERSION: u32 = 1;

/// First raw type value that denotes a conditional instruction
pub const COND_TYPE_BEGIN: u8 = 8;

const TYPE_OFFSET: u32 = 0;
const TYPE_BITS: u32 = 5;
const FLAGS_OFFSET: u32 = 5;
const FLAGS_BITS: u32 = 3;
const OP_OFFSET: u32 = 10;
const OP_BITS: u32 = 3;
const VALUE_OFFSET: u32 = 16;
const VALUE_BITS: u32 = 16;

#[inline]
const fn field_mask(bits: u32) -> u32 {
    (1 << bits) - 1
}

/// Instruction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ItemType {
    /// Empty word, never valid inside a program
    Null = 0,
    /// Set or clear the deny flag
    PfDeny = 1,
    /// Add a pathfinder penalty
    PfPenalty = 2,
    /// `end if`, or `else` when flagged [`CondFlags::ELSE`]
    CondEndif = 8,
    /// Condition whose kind is unknown to this build; always false
    CondUndefined = 9,
    /// Agent length in tiles, rounded up
    CondTrainLength = 10,
    /// Agent maximum speed
    CondMaxSpeed = 11,
    /// Direction the agent enters the routing point from
    CondEntryDirection = 12,
    /// Agent weight
    CondTrainWeight = 13,
}

impl ItemType {
    /// Decodes a raw type field. Unknown actions decode as [`ItemType::Null`],
    /// unknown conditions as [`ItemType::CondUndefined`].
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => ItemType::PfDeny,
            2 => ItemType::PfPenalty,
            8 => ItemType::CondEndif,
            10 => ItemType::CondTrainLength,
            11 => ItemType::CondMaxSpeed,
            12 => ItemType::CondEntryDirection,
            13 => ItemType::CondTrainWeight,
            r if r >= COND_TYPE_BEGIN => ItemType::CondUndefined,
            _ => ItemType::Null,
        }
    }

    /// Whether instructions of this kind take part in conditional nesting
    pub fn is_conditional(self) -> bool {
        self as u8 >= COND_TYPE_BEGIN
    }

    /// Comparator and operand classes this kind declares
    pub fn properties(self) -> TypeProperties {
        let (op_class, value_class) = match self {
            ItemType::Null => (OpClass::None, ValueClass::None),
            ItemType::PfDeny => (OpClass::None, ValueClass::Boolean),
            ItemType::PfPenalty => (OpClass::None, ValueClass::Integer),
            ItemType::CondEndif | ItemType::CondUndefined => (OpClass::None, ValueClass::None),
            ItemType::CondTrainLength | ItemType::CondMaxSpeed | ItemType::CondTrainWeight => {
                (OpClass::Ordering, ValueClass::Integer)
            }
            ItemType::CondEntryDirection => (OpClass::Equality, ValueClass::Direction),
        };
        TypeProperties {
            op_class,
            value_class,
        }
    }
}

/// Which comparators a kind accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    /// Kind does not compare
    None,
    /// Only `is` / `is not`
    Equality,
    /// All six comparators
    Ordering,
}

/// How a kind interprets its 16-bit operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    /// Operand unused
    None,
    /// 0 / 1
    Boolean,
    /// Plain unsigned integer
    Integer,
    /// An [`EntryDirection`](crate::program::EntryDirection) discriminant
    Direction,
}

impl ValueClass {
    /// Operand an instruction gets when its kind changes to this class
    pub fn default_value(self) -> u16 {
        match self {
            // a fresh deny instruction denies
            ValueClass::Boolean => 1,
            ValueClass::None | ValueClass::Integer | ValueClass::Direction => 0,
        }
    }
}

/// Per-kind property set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeProperties {
    /// Accepted comparators
    pub op_class: OpClass,
    /// Operand interpretation
    pub value_class: ValueClass,
}

/// Chain position flags of a conditional instruction
///
/// No flags: opening `if` (or plain `end if`). `ELSE`: `else if`, or `else`
/// on an end-if word. `OR`: `or if`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CondFlags(u8);

impl CondFlags {
    /// Opening `if`
    pub const NONE: CondFlags = CondFlags(0);
    /// Else continuation
    pub const ELSE: CondFlags = CondFlags(1);
    /// Or continuation
    pub const OR: CondFlags = CondFlags(2);

    /// Builds flags from raw bits, dropping undefined bits
    pub fn from_bits(bits: u8) -> Self {
        CondFlags(bits & (Self::ELSE.0 | Self::OR.0))
    }

    /// Raw bit representation
    pub fn bits(self) -> u8 {
        self.0
    }

    /// True if every flag in `other` is set
    pub fn contains(self, other: CondFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if no flag is set
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True for `else`/`else if`/`or if`, i.e. anything continuing an open chain
    pub fn is_continuation(self) -> bool {
        self.0 & (Self::ELSE.0 | Self::OR.0) != 0
    }
}

impl std::ops::BitOr for CondFlags {
    type Output = CondFlags;

    fn bitor(self, rhs: CondFlags) -> CondFlags {
        CondFlags(self.0 | rhs.0)
    }
}

/// Comparator applied by a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CondOp {
    /// `==`
    Is = 0,
    /// `!=`
    IsNot = 1,
    /// `<`
    LessThan = 2,
    /// `<=`
    LessThanEquals = 3,
    /// `>`
    MoreThan = 4,
    /// `>=`
    MoreThanEquals = 5,
}

impl CondOp {
    /// Decodes a raw comparator field; 6 and 7 are undefined
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(CondOp::Is),
            1 => Some(CondOp::IsNot),
            2 => Some(CondOp::LessThan),
            3 => Some(CondOp::LessThanEquals),
            4 => Some(CondOp::MoreThan),
            5 => Some(CondOp::MoreThanEquals),
            _ => None,
        }
    }

    /// Applies the comparator as `lhs op rhs`
    pub fn compare(self, lhs: u16, rhs: u16) -> bool {
        match self {
            CondOp::Is => lhs == rhs,
            CondOp::IsNot => lhs != rhs,
            CondOp::LessThan => lhs < rhs,
            CondOp::LessThanEquals => lhs <= rhs,
            CondOp::MoreThan => lhs > rhs,
            CondOp::MoreThanEquals => lhs >= rhs,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CondOp::Is => "==",
            CondOp::IsNot => "!=",
            CondOp::LessThan => "<",
            CondOp::LessThanEquals => "<=",
            CondOp::MoreThan => ">",
            CondOp::MoreThanEquals => ">=",
        }
    }
}

/// Named penalty presets offered to program authors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyPreset {
    /// 500
    Small,
    /// 1000
    Medium,
    /// 2000
    Large,
}

impl PenaltyPreset {
    /// Penalty value of the preset
    pub fn value(self) -> u16 {
        match self {
            PenaltyPreset::Small => 500,
            PenaltyPreset::Medium => 1000,
            PenaltyPreset::Large => 2000,
        }
    }
}

/// One packed program step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instruction(u32);

impl Instruction {
    /// Wraps a raw encoded word
    pub const fn from_raw(raw: u32) -> Self {
        Instruction(raw)
    }

    /// Raw encoded word
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Instruction of `kind` with every dependent field at its default
    pub fn new(kind: ItemType) -> Self {
        Instruction(0).with_kind(kind)
    }

    /// Opening `if kind op value`
    pub fn if_cond(kind: ItemType, op: CondOp, value: u16) -> Self {
        Self::new(kind).with_op(op).with_value(value)
    }

    /// `else if kind op value`
    pub fn elif_cond(kind: ItemType, op: CondOp, value: u16) -> Self {
        Self::if_cond(kind, op, value).with_flags(CondFlags::ELSE)
    }

    /// `or if kind op value`
    pub fn orif_cond(kind: ItemType, op: CondOp, value: u16) -> Self {
        Self::if_cond(kind, op, value).with_flags(CondFlags::OR)
    }

    /// `else`
    pub fn else_branch() -> Self {
        Self::new(ItemType::CondEndif).with_flags(CondFlags::ELSE)
    }

    /// `end if`
    pub fn end_if() -> Self {
        Self::new(ItemType::CondEndif)
    }

    /// Set (`true`) or clear (`false`) the deny flag
    pub fn deny(deny: bool) -> Self {
        Self::new(ItemType::PfDeny).with_value(u16::from(deny))
    }

    /// Add `value` to the pathfinder penalty
    pub fn penalty(value: u16) -> Self {
        Self::new(ItemType::PfPenalty).with_value(value)
    }

    /// Penalty instruction using a named preset
    pub fn penalty_preset(preset: PenaltyPreset) -> Self {
        Self::penalty(preset.value())
    }

    fn get(self, offset: u32, bits: u32) -> u32 {
        (self.0 >> offset) & field_mask(bits)
    }

    fn set(self, offset: u32, bits: u32, value: u32) -> Self {
        let mask = field_mask(bits) << offset;
        Instruction((self.0 & !mask) | ((value << offset) & mask))
    }

    fn raw_type(self) -> u8 {
        self.get(TYPE_OFFSET, TYPE_BITS) as u8
    }

    /// Decoded instruction kind
    pub fn kind(self) -> ItemType {
        ItemType::from_raw(self.raw_type())
    }

    /// Whether this word takes part in conditional nesting
    pub fn is_conditional(self) -> bool {
        self.raw_type() >= COND_TYPE_BEGIN
    }

    /// Chain flags; always empty for actions
    pub fn cond_flags(self) -> CondFlags {
        if self.is_conditional() {
            CondFlags::from_bits(self.get(FLAGS_OFFSET, FLAGS_BITS) as u8)
        } else {
            CondFlags::NONE
        }
    }

    /// Comparator, if the field holds a defined one
    pub fn cond_op(self) -> Option<CondOp> {
        CondOp::from_raw(self.get(OP_OFFSET, OP_BITS) as u8)
    }

    /// 16-bit operand
    pub fn value(self) -> u16 {
        self.get(VALUE_OFFSET, VALUE_BITS) as u16
    }

    /// `end if` or `else`
    pub fn is_endif_word(self) -> bool {
        self.raw_type() == ItemType::CondEndif as u8
    }

    /// Plain `end if`
    pub fn is_end_if(self) -> bool {
        self.is_endif_word() && !self.cond_flags().contains(CondFlags::ELSE)
    }

    /// `else`
    pub fn is_else(self) -> bool {
        self.is_endif_word() && self.cond_flags().contains(CondFlags::ELSE)
    }

    /// Opening `if` of a new chain
    pub fn opens_block(self) -> bool {
        self.is_conditional() && !self.is_endif_word() && self.cond_flags().is_empty()
    }

    /// Whether this word may be placed in a program.
    ///
    /// Rejects `Null` and flag combinations no constructor produces: `OR` on
    /// an end-if word, and `ELSE` together with `OR`.
    pub fn is_placeable(self) -> bool {
        let flags = self.cond_flags();
        match self.kind() {
            ItemType::Null => false,
            ItemType::CondEndif => !flags.contains(CondFlags::OR),
            _ => !flags.contains(CondFlags::ELSE | CondFlags::OR),
        }
    }

    /// Changes the kind, resetting fields that depend on it.
    ///
    /// Flags survive only while conditionality is unchanged; comparator and
    /// operand reset whenever the kind's property set differs.
    pub fn with_kind(self, kind: ItemType) -> Self {
        let old = self.kind();
        let mut item = self.set(TYPE_OFFSET, TYPE_BITS, kind as u32);
        if old.is_conditional() != kind.is_conditional() {
            item = item.set(FLAGS_OFFSET, FLAGS_BITS, 0);
        }
        let new_props = kind.properties();
        if self.0 == 0 || old.properties() != new_props {
            item = item
                .set(OP_OFFSET, OP_BITS, CondOp::Is as u32)
                .set(VALUE_OFFSET, VALUE_BITS, u32::from(new_props.value_class.default_value()));
        }
        item
    }

    /// Replaces the chain flags; ignored for actions
    pub fn with_flags(self, flags: CondFlags) -> Self {
        if self.is_conditional() {
            self.set(FLAGS_OFFSET, FLAGS_BITS, u32::from(flags.bits()))
        } else {
            self
        }
    }

    /// Replaces the comparator
    pub fn with_op(self, op: CondOp) -> Self {
        self.set(OP_OFFSET, OP_BITS, op as u32)
    }

    /// Replaces the operand
    pub fn with_value(self, value: u16) -> Self {
        self.set(VALUE_OFFSET, VALUE_BITS, u32::from(value))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = self.cond_flags();
        match self.kind() {
            ItemType::Null => write!(f, "(null)"),
            ItemType::PfDeny if self.value() != 0 => write!(f, "deny"),
            ItemType::PfDeny => write!(f, "allow"),
            ItemType::PfPenalty => write!(f, "penalty {}", self.value()),
            ItemType::CondEndif if flags.contains(CondFlags::ELSE) => write!(f, "else"),
            ItemType::CondEndif => write!(f, "end if"),
            kind => {
                let lead = if flags.contains(CondFlags::OR) {
                    "or if"
                } else if flags.contains(CondFlags::ELSE) {
                    "else if"
                } else {
                    "if"
                };
                let subject = match kind {
                    ItemType::CondTrainLength => "train length",
                    ItemType::CondMaxSpeed => "max speed",
                    ItemType::CondEntryDirection => "entry direction",
                    ItemType::CondTrainWeight => "train weight",
                    _ => return write!(f, "{} (undefined)", lead),
                };
                match self.cond_op() {
                    Some(op) => write!(f, "{} {} {} {}", lead, subject, op.symbol(), self.value()),
                    None => write!(f, "{} {} ?? {}", lead, subject, self.value()),
                }
            }
        }
    }
}
