//! Name, path and type resolution shared by the C and Rust backends.
//!
//! Paths are built from an immutable ancestor chain (command first, immediate parent last),
//! so sibling branches of a recursive walk never share a mutable buffer.

use crate::model::{Scalar, Storage};

/// Name of the generic attribute array handed to `GetData` functions.
pub const RECEIVE_ROOT: &str = "pAttArray";
/// Name of the attribute array being filled by `FillAtt` functions.
pub const TRANSMIT_ROOT: &str = "(*pAttArrayPtr)";
/// Presence bitfield member of every payload struct with optional attributes.
pub const BITFIELD_MEMBER: &str = "optAttFlagsBitfield";

/// `TEST_CC1_ATT_SA6`: ordinal of `name` inside its parent scope enum.
pub fn att_enum_name(protocol: &str, parent: &str, name: &str) -> String {
    format!(
        "{}_{}_ATT_{}",
        protocol.to_uppercase(),
        parent.to_uppercase(),
        name.to_uppercase()
    )
}

/// `TEST_CC1_ATT_SA6_FLAG`: presence bit of an optional attribute.
pub fn att_flag_name(protocol: &str, parent: &str, name: &str) -> String {
    format!("{}_FLAG", att_enum_name(protocol, parent, name))
}

/// `TEST_CMD_CC1`: ordinal of a command in the command-name enum.
pub fn cmd_enum_name(protocol: &str, command: &str) -> String {
    format!("{}_CMD_{}", protocol.to_uppercase(), command.to_uppercase())
}

/// `LCSF_TEST_CMD_ID_CC1`: wire identifier of a command.
pub fn cmd_id_name(protocol: &str, command: &str) -> String {
    format!("LCSF_{}_CMD_ID_{}", protocol.to_uppercase(), command.to_uppercase())
}

/// `LCSF_TEST_CC1_ATT_ID_SA6`: wire identifier of an attribute.
pub fn att_id_name(protocol: &str, parent: &str, name: &str) -> String {
    format!(
        "LCSF_{}_{}_ATT_ID_{}",
        protocol.to_uppercase(),
        parent.to_uppercase(),
        name.to_uppercase()
    )
}

/// `LCSF_TEST_CMD_CC1_ATT_NB`: attribute count of a command.
pub fn cmd_att_nb_name(protocol: &str, command: &str) -> String {
    format!("LCSF_{}_CMD_{}_ATT_NB", protocol.to_uppercase(), command.to_uppercase())
}

/// `LCSF_TEST_ATT_CA1_SUBATT_NB`: sub-attribute count of a complex attribute.
pub fn subatt_nb_name(protocol: &str, name: &str) -> String {
    format!("LCSF_{}_ATT_{}_SUBATT_NB", protocol.to_uppercase(), name.to_uppercase())
}

/// `test_cc1_att_payload_t`: payload struct of a command.
pub fn c_cmd_payload_type(protocol: &str, command: &str) -> String {
    format!("{}_{}_att_payload_t", protocol.to_lowercase(), command.to_lowercase())
}

/// `test_cc3_att_ca1_att_payload_t`: payload struct of a complex attribute under `parent`.
pub fn c_nested_type(protocol: &str, parent: &str, name: &str) -> String {
    format!(
        "{}_{}_att_{}_att_payload_t",
        protocol.to_lowercase(),
        parent.to_lowercase(),
        name.to_lowercase()
    )
}

/// Struct tag matching a `_t` typedef name (`_test_cc1_att_payload`).
pub fn c_struct_tag(type_name: &str) -> String {
    format!("_{}", type_name.strip_suffix("_t").unwrap_or(type_name))
}

/// Path of `name` in a generic valid-attribute array rooted at `root`.
///
/// Every level below the command adds one `Payload.pSubAttArray` indirection.
pub fn att_array_path(root: &str, protocol: &str, ancestors: &[&str], name: &str) -> String {
    let mut path = root.to_string();
    for pair in ancestors.windows(2) {
        path.push_str(&format!(
            "[{}].Payload.pSubAttArray",
            att_enum_name(protocol, pair[0], pair[1])
        ));
    }
    let parent = ancestors.last().copied().unwrap_or_default();
    path.push_str(&format!("[{}]", att_enum_name(protocol, parent, name)));
    path
}

/// Read-side path, see [`att_array_path`].
pub fn receive_path(protocol: &str, ancestors: &[&str], name: &str) -> String {
    att_array_path(RECEIVE_ROOT, protocol, ancestors, name)
}

/// Write-side path, see [`att_array_path`].
pub fn transmit_path(protocol: &str, ancestors: &[&str], name: &str) -> String {
    att_array_path(TRANSMIT_ROOT, protocol, ancestors, name)
}

/// Path inside the generated command payload union: `cc3_payload.ca1_payload.sa1`.
pub fn struct_field_path(ancestors: &[&str], field: &str) -> String {
    let mut path: Vec<String> = ancestors
        .iter()
        .map(|a| format!("{}_payload", a.to_lowercase()))
        .collect();
    path.push(field.to_string());
    path.join(".")
}

/// Struct member path of the scope holding `ancestors`' attributes.
pub fn scope_path(ancestors: &[&str]) -> String {
    ancestors
        .iter()
        .map(|a| format!("{}_payload", a.to_lowercase()))
        .collect::<Vec<_>>()
        .join(".")
}

/// Local variable stem for a handler: ancestors below the command, then the attribute name.
pub fn local_stem(ancestors: &[&str], name: &str) -> String {
    let mut parts: Vec<String> = ancestors.iter().skip(1).map(|a| a.to_lowercase()).collect();
    parts.push(name.to_lowercase());
    parts.join("_")
}

pub fn c_scalar_type(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::U8 => "uint8_t",
        Scalar::U16 => "uint16_t",
        Scalar::U32 => "uint32_t",
        Scalar::U64 => "uint64_t",
        Scalar::F32 => "float",
        Scalar::F64 => "double",
    }
}

pub fn rust_scalar_type(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::U8 => "u8",
        Scalar::U16 => "u16",
        Scalar::U32 => "u32",
        Scalar::U64 => "u64",
        Scalar::F32 => "f32",
        Scalar::F64 => "f64",
    }
}

/// C struct member declarations for one attribute (without indentation).
pub fn c_member_declarations(storage: Storage, protocol: &str, parent: &str, name: &str) -> Vec<String> {
    let field = name.to_lowercase();
    match storage {
        Storage::Scalar(scalar) => vec![format!("{} {};", c_scalar_type(scalar), field)],
        Storage::ByteArray => vec![
            format!("uint8_t *p_{};", field),
            format!("uint32_t {}Size;", field),
        ],
        Storage::String => vec![format!("char *p_{};", field)],
        Storage::Nested => vec![format!(
            "{} {}_payload;",
            c_nested_type(protocol, parent, name),
            field
        )],
    }
}

/// Rust payload type of a complex attribute: `Cc3AttCa1Payload`.
pub fn rust_nested_type(parent: &str, name: &str) -> String {
    format!("{}Att{}Payload", capitalize(parent), capitalize(name))
}

/// Rust payload type of a command: `Cc1AttPayload`.
pub fn rust_cmd_payload_type(command: &str) -> String {
    format!("{}AttPayload", capitalize(command))
}

/// Owned Rust type of an attribute, before any `Option` wrapping.
pub fn rust_type(storage: Storage, parent: &str, name: &str) -> String {
    match storage {
        Storage::Scalar(scalar) => rust_scalar_type(scalar).to_string(),
        Storage::ByteArray => "Vec<u8>".to_string(),
        Storage::String => "CString".to_string(),
        Storage::Nested => rust_nested_type(parent, name),
    }
}

/// `CC1` -> `Cc1`, `SET_MODE` -> `SetMode`.
pub fn capitalize(s: &str) -> String {
    s.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => {
                    let upper: String = first.to_uppercase().collect();
                    upper + &chars.as_str().to_lowercase()
                }
            }
        })
        .collect()
}

/// `CC1` -> `cc1`, `SetMode` -> `set_mode`.
pub fn snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for c in s.chars() {
        if c.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        out.extend(c.to_lowercase());
    }
    out
}

/// Storage selected for the presence bitfield of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitfieldWidth {
    U8,
    U16,
    U32,
    /// Byte array of the given length, for scopes wider than 32 attributes.
    Bytes(usize),
}

impl BitfieldWidth {
    /// Width for a scope of `n` attributes (bit position = declaration index).
    pub fn for_count(n: usize) -> Self {
        match n {
            0..=8 => BitfieldWidth::U8,
            9..=16 => BitfieldWidth::U16,
            17..=32 => BitfieldWidth::U32,
            _ => BitfieldWidth::Bytes(n.div_ceil(8)),
        }
    }

    pub fn byte_len(self) -> usize {
        match self {
            BitfieldWidth::U8 => 1,
            BitfieldWidth::U16 => 2,
            BitfieldWidth::U32 => 4,
            BitfieldWidth::Bytes(n) => n,
        }
    }

    /// Struct member declaration, e.g. `uint8_t optAttFlagsBitfield;`.
    pub fn c_declaration(self) -> String {
        match self {
            BitfieldWidth::U8 => format!("uint8_t {};", BITFIELD_MEMBER),
            BitfieldWidth::U16 => format!("uint16_t {};", BITFIELD_MEMBER),
            BitfieldWidth::U32 => format!("uint32_t {};", BITFIELD_MEMBER),
            BitfieldWidth::Bytes(n) => format!("uint8_t {}[{}];", BITFIELD_MEMBER, n),
        }
    }

    /// Right-hand side of the `#define ..._FLAG` for the attribute at `index`.
    pub fn flag_value(self, index: usize) -> String {
        match self {
            BitfieldWidth::U8 | BitfieldWidth::U16 => format!("(1 << {})", index),
            BitfieldWidth::U32 => format!("(1UL << {})", index),
            BitfieldWidth::Bytes(_) => format!("(1 << {})", index % 8),
        }
    }

    fn cell(self, bitfield: &str, index: usize) -> String {
        match self {
            BitfieldWidth::Bytes(_) => format!("{}[{}]", bitfield, index / 8),
            _ => bitfield.to_string(),
        }
    }

    /// C condition true when the flag is set.
    pub fn test_expr(self, bitfield: &str, flag: &str, index: usize) -> String {
        format!("(({} & {}) != 0)", self.cell(bitfield, index), flag)
    }

    /// C statement setting the flag.
    pub fn set_stmt(self, bitfield: &str, flag: &str, index: usize) -> String {
        format!("{} |= {};", self.cell(bitfield, index), flag)
    }

    /// C statement clearing every flag.
    pub fn clear_stmt(self, bitfield: &str) -> String {
        match self {
            BitfieldWidth::Bytes(n) => format!("memset({}, 0, {});", bitfield, n),
            _ => format!("{} = 0;", bitfield),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitfield_width_thresholds() {
        assert_eq!(BitfieldWidth::for_count(1).byte_len(), 1);
        assert_eq!(BitfieldWidth::for_count(8).byte_len(), 1);
        assert_eq!(BitfieldWidth::for_count(9).byte_len(), 2);
        assert_eq!(BitfieldWidth::for_count(16).byte_len(), 2);
        assert_eq!(BitfieldWidth::for_count(17).byte_len(), 4);
        assert_eq!(BitfieldWidth::for_count(32).byte_len(), 4);
        assert_eq!(BitfieldWidth::for_count(33), BitfieldWidth::Bytes(5));
        assert_eq!(BitfieldWidth::for_count(40).byte_len(), 5);
        assert_eq!(BitfieldWidth::for_count(41).byte_len(), 6);
    }

    #[test]
    fn byte_array_bitfield_addresses_cells() {
        let w = BitfieldWidth::for_count(40);
        assert_eq!(w.c_declaration(), "uint8_t optAttFlagsBitfield[5];");
        assert_eq!(w.flag_value(11), "(1 << 3)");
        assert_eq!(w.test_expr("x.optAttFlagsBitfield", "F", 11), "((x.optAttFlagsBitfield[1] & F) != 0)");
    }

    #[test]
    fn paths_grow_one_level_per_ancestor() {
        assert_eq!(receive_path("Test", &["CC1"], "SA6"), "pAttArray[TEST_CC1_ATT_SA6]");
        assert_eq!(
            receive_path("Test", &["CC3", "CA1", "CA2"], "SA3"),
            "pAttArray[TEST_CC3_ATT_CA1].Payload.pSubAttArray[TEST_CA1_ATT_CA2].Payload.pSubAttArray[TEST_CA2_ATT_SA3]"
        );
        assert_eq!(
            transmit_path("Test", &["CC3", "CA1"], "SA2"),
            "(*pAttArrayPtr)[TEST_CC3_ATT_CA1].Payload.pSubAttArray[TEST_CA1_ATT_SA2]"
        );
        assert_eq!(struct_field_path(&["CC3", "CA1"], "sa2"), "cc3_payload.ca1_payload.sa2");
        assert_eq!(local_stem(&["CC3", "CA1"], "SA2"), "ca1_sa2");
        assert_eq!(local_stem(&["CC1"], "SA6"), "sa6");
    }

    #[test]
    fn type_names() {
        assert_eq!(c_nested_type("Test", "CC3", "CA1"), "test_cc3_att_ca1_att_payload_t");
        assert_eq!(c_struct_tag("test_cc1_att_payload_t"), "_test_cc1_att_payload");
        assert_eq!(rust_nested_type("CC3", "CA1"), "Cc3AttCa1Payload");
        assert_eq!(rust_cmd_payload_type("SET_MODE"), "SetModeAttPayload");
        assert_eq!(
            c_member_declarations(Storage::ByteArray, "Test", "CC1", "SA4"),
            vec!["uint8_t *p_sa4;".to_string(), "uint32_t sa4Size;".to_string()]
        );
    }

    #[test]
    fn casing() {
        assert_eq!(capitalize("CC1"), "Cc1");
        assert_eq!(capitalize("set_mode"), "SetMode");
        assert_eq!(snake_case("CC1"), "cc1");
        assert_eq!(snake_case("SetMode"), "set_mode");
        assert_eq!(snake_case("SA_6"), "sa_6");
    }
}
