//! Command/attribute data model of an LCSF protocol description.

/// Primitive kind carried by an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    ByteArray,
    String,
    SubAttributes,
    /// Placeholder for an unrecognised type name; rejected by validation, never written out.
    Unknown,
}

/// How an attribute is stored once mapped to a target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Fixed-width number.
    Scalar(Scalar),
    /// Length + pointer (C) or `Vec<u8>` (Rust).
    ByteArray,
    /// NUL-terminated text.
    String,
    /// Nested group of sub-attributes.
    Nested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl Scalar {
    pub fn byte_len(self) -> usize {
        match self {
            Scalar::U8 => 1,
            Scalar::U16 => 2,
            Scalar::U32 | Scalar::F32 => 4,
            Scalar::U64 | Scalar::F64 => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Scalar::F32 | Scalar::F64)
    }
}

impl DataType {
    pub const ALL: [DataType; 9] = [
        DataType::Uint8,
        DataType::Uint16,
        DataType::Uint32,
        DataType::Uint64,
        DataType::Float32,
        DataType::Float64,
        DataType::ByteArray,
        DataType::String,
        DataType::SubAttributes,
    ];

    /// Schema keyword (`uint8`, `byte_array`, ...).
    pub fn keyword(self) -> &'static str {
        match self {
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Uint64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::ByteArray => "byte_array",
            DataType::String => "string",
            DataType::SubAttributes => "sub_attributes",
            DataType::Unknown => "unknown",
        }
    }

    /// Inverse of [`DataType::keyword`]; unknown words map to [`DataType::Unknown`].
    pub fn from_keyword(s: &str) -> DataType {
        DataType::ALL
            .into_iter()
            .find(|dt| dt.keyword() == s)
            .unwrap_or(DataType::Unknown)
    }

    /// Name of the matching constant in the LCSF validator library.
    pub fn lcsf_name(self) -> &'static str {
        match self {
            DataType::Uint8 => "LCSF_UINT8",
            DataType::Uint16 => "LCSF_UINT16",
            DataType::Uint32 => "LCSF_UINT32",
            DataType::Uint64 => "LCSF_UINT64",
            DataType::Float32 => "LCSF_FLOAT32",
            DataType::Float64 => "LCSF_FLOAT64",
            DataType::ByteArray => "LCSF_BYTE_ARRAY",
            DataType::String => "LCSF_STRING",
            DataType::SubAttributes => "LCSF_SUB_ATTRIBUTES",
            DataType::Unknown => "LCSF_UNKNOWN",
        }
    }

    /// Storage category, `None` for [`DataType::Unknown`].
    pub fn storage(self) -> Option<Storage> {
        Some(match self {
            DataType::Uint8 => Storage::Scalar(Scalar::U8),
            DataType::Uint16 => Storage::Scalar(Scalar::U16),
            DataType::Uint32 => Storage::Scalar(Scalar::U32),
            DataType::Uint64 => Storage::Scalar(Scalar::U64),
            DataType::Float32 => Storage::Scalar(Scalar::F32),
            DataType::Float64 => Storage::Scalar(Scalar::F64),
            DataType::ByteArray => Storage::ByteArray,
            DataType::String => Storage::String,
            DataType::SubAttributes => Storage::Nested,
            DataType::Unknown => return None,
        })
    }
}

/// Command directionality between role A and role B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    AToB,
    BToA,
    Bidirectional,
    Unknown,
}

impl Direction {
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::AToB => "a_to_b",
            Direction::BToA => "b_to_a",
            Direction::Bidirectional => "bidirectional",
            Direction::Unknown => "unknown",
        }
    }

    pub fn from_keyword(s: &str) -> Direction {
        match s {
            "a_to_b" => Direction::AToB,
            "b_to_a" => Direction::BToA,
            "bidirectional" => Direction::Bidirectional,
            _ => Direction::Unknown,
        }
    }
}

/// Communication endpoint a module is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    A,
    B,
}

impl Role {
    pub const BOTH: [Role; 2] = [Role::A, Role::B];

    pub fn is_a(self) -> bool {
        self == Role::A
    }

    /// File suffix letter (`a` / `b`).
    pub fn suffix(self) -> &'static str {
        match self {
            Role::A => "a",
            Role::B => "b",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::A => "A",
            Role::B => "B",
        }
    }
}

/// A named, typed field of a command payload, possibly holding sub-attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub id: i16,
    pub optional: bool,
    pub data_type: DataType,
    /// Only populated when `data_type` is [`DataType::SubAttributes`].
    pub children: Vec<Attribute>,
    pub description: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, id: i16, data_type: DataType) -> Self {
        Attribute {
            name: name.into(),
            id,
            optional: false,
            data_type,
            children: Vec::new(),
            description: String::new(),
        }
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_child(mut self, child: Attribute) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// True for a `SUB_ATTRIBUTES` attribute.
    pub fn is_complex(&self) -> bool {
        self.data_type == DataType::SubAttributes
    }

    /// True when the attribute actually holds sub-attributes.
    pub fn has_sub_attributes(&self) -> bool {
        self.is_complex() && !self.children.is_empty()
    }

    /// Number of attributes in this subtree, the attribute itself included.
    pub fn tree_size(&self) -> usize {
        1 + self.children.iter().map(Attribute::tree_size).sum::<usize>()
    }
}

/// A protocol command with its attribute list.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub id: i16,
    pub direction: Direction,
    pub attributes: Vec<Attribute>,
    pub description: String,
}

impl Command {
    pub fn new(name: impl Into<String>, id: i16, direction: Direction) -> Self {
        Command {
            name: name.into(),
            id,
            direction,
            attributes: Vec::new(),
            description: String::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    /// Whether the role may send this command.
    pub fn is_transmittable(&self, role: Role) -> bool {
        match self.direction {
            Direction::Bidirectional => true,
            Direction::AToB => role.is_a(),
            Direction::BToA => !role.is_a(),
            Direction::Unknown => false,
        }
    }

    /// Whether the role may receive this command.
    pub fn is_receivable(&self, role: Role) -> bool {
        match self.direction {
            Direction::Bidirectional => true,
            Direction::BToA => role.is_a(),
            Direction::AToB => !role.is_a(),
            Direction::Unknown => false,
        }
    }

    /// Number of attribute slots needed to encode this command, sub-attributes included.
    pub fn attribute_slots(&self) -> usize {
        self.attributes.iter().map(Attribute::tree_size).sum()
    }
}

/// Root of a protocol description. Command order fixes generated enum ordinals.
#[derive(Debug, Clone, PartialEq)]
pub struct Protocol {
    pub name: String,
    pub id: u16,
    pub commands: Vec<Command>,
}

impl Protocol {
    pub fn new(name: impl Into<String>, id: u16) -> Self {
        Protocol {
            name: name.into(),
            id,
            commands: Vec::new(),
        }
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Worst-case attribute slot count over all commands.
    pub fn max_attribute_slots(&self) -> usize {
        self.commands
            .iter()
            .map(Command::attribute_slots)
            .max()
            .unwrap_or(0)
    }
}
