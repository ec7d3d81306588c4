//! `lcsf_protocol_{name}.rs`: command enum, payload types, descriptor tables and the codec
//! between typed payloads and validated LCSF attribute arrays.

use super::{module_banner, push_line};
use crate::flatten::GenContext;
use crate::model::{Attribute, Command, Role, Scalar, Storage};
use crate::resolve::{
    capitalize, rust_cmd_payload_type, rust_nested_type, rust_scalar_type, rust_type, snake_case,
};

/// Function/constant stem of a complex attribute's payload: `cc3_att_ca1`.
fn nested_stem(parent: &str, name: &str) -> String {
    format!("{}_att_{}", snake_case(parent), snake_case(name))
}

fn tree_any(attributes: &[Attribute], pred: &impl Fn(&Attribute) -> bool) -> bool {
    attributes
        .iter()
        .any(|att| pred(att) || tree_any(&att.children, pred))
}

fn uses_vle(att: &Attribute) -> bool {
    matches!(
        att.data_type.storage(),
        Some(Storage::Scalar(Scalar::U16 | Scalar::U32 | Scalar::U64))
    )
}

fn uses_cstring(att: &Attribute) -> bool {
    att.data_type.storage() == Some(Storage::String)
}

pub fn generate_bridge_module(ctx: &GenContext<'_>, role: Role) -> String {
    let proto = ctx.protocol.name.as_str();
    let commands = &ctx.protocol.commands;
    let decoded: Vec<&Command> = commands
        .iter()
        .filter(|c| c.is_receivable(role) && c.has_attributes())
        .collect();
    let encoded: Vec<&Command> = commands
        .iter()
        .filter(|c| c.is_transmittable(role) && c.has_attributes())
        .collect();
    let any_attributes = commands.iter().any(Command::has_attributes);

    let mut out = module_banner(&format!("{} LCSF bridge (role {})", proto, role.label()));

    let mut validator = vec!["LcsfCmdDesc", "LcsfProtDesc", "LcsfValidCmd"];
    if any_attributes {
        validator.extend(["LcsfAttDesc", "LcsfDataType"]);
    }
    if !decoded.is_empty() || !encoded.is_empty() {
        validator.extend(["LcsfValidAtt", "LcsfValidAttPayload"]);
    }
    validator.sort_unstable();
    out.push_str(&format!("use lcsf_lib::lcsf_validator::{{{}}};\n", validator.join(", ")));
    let mut vle = Vec::new();
    if decoded.iter().any(|c| tree_any(&c.attributes, &uses_vle)) {
        vle.push("vle_decode");
    }
    if encoded.iter().any(|c| tree_any(&c.attributes, &uses_vle)) {
        vle.push("vle_encode");
    }
    match vle.as_slice() {
        [] => {}
        [one] => out.push_str(&format!("use lcsf_lib::vle::{};\n", one)),
        _ => out.push_str(&format!("use lcsf_lib::vle::{{{}}};\n", vle.join(", "))),
    }
    if commands.iter().any(|c| tree_any(&c.attributes, &uses_cstring)) {
        out.push_str("use std::ffi::CString;\n");
    }
    out.push('\n');

    out.push_str("/// Lcsf protocol identifier\n");
    out.push_str(&format!(
        "pub const LCSF_{}_PROTOCOL_ID: u16 = 0x{:X};\n\n",
        proto.to_uppercase(),
        ctx.protocol.id
    ));
    write_cmd_enum(&mut out, commands);

    if ctx.has_sub_attributes {
        out.push_str("// Attribute with sub-attributes payloads\n\n");
        for info in ctx.complex_attributes_children_first() {
            let att = info.attribute;
            write_struct(
                &mut out,
                &rust_nested_type(info.parent_name, &att.name),
                &att.name,
                &att.children,
            );
        }
    }
    if any_attributes {
        out.push_str("// Command payloads\n\n");
        for cmd in commands.iter().filter(|c| c.has_attributes()) {
            write_struct(&mut out, &rust_cmd_payload_type(&cmd.name), &cmd.name, &cmd.attributes);
        }
    }
    out.push_str("/// Payload of any command\n");
    out.push_str("#[derive(Debug, Clone, PartialEq)]\npub enum CmdPayload {\n");
    push_line(&mut out, 1, "Empty,");
    for cmd in commands.iter().filter(|c| c.has_attributes()) {
        push_line(
            &mut out,
            1,
            &format!("{}({}),", capitalize(&cmd.name), rust_cmd_payload_type(&cmd.name)),
        );
    }
    out.push_str("}\n\n");

    write_descriptors(&mut out, ctx);

    for cmd in &decoded {
        write_decoder(
            &mut out,
            &snake_case(&cmd.name),
            &rust_cmd_payload_type(&cmd.name),
            &cmd.name,
            &cmd.attributes,
        );
    }
    for cmd in &encoded {
        write_encoder(
            &mut out,
            &snake_case(&cmd.name),
            &rust_cmd_payload_type(&cmd.name),
            &cmd.name,
            &cmd.attributes,
        );
    }
    write_decode(&mut out, commands, &decoded);
    write_encode(&mut out, any_attributes, &encoded);
    out
}

fn write_cmd_enum(out: &mut String, commands: &[Command]) {
    out.push_str("/// Command names\n");
    out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq)]\npub enum CmdEnum {\n");
    for cmd in commands {
        push_line(out, 1, &format!("{},", capitalize(&cmd.name)));
    }
    out.push_str("}\n\n");

    out.push_str("impl CmdEnum {\n");
    push_line(out, 1, "/// Wire identifier of the command.");
    push_line(out, 1, "pub fn id(self) -> u16 {");
    push_line(out, 2, "match self {");
    for cmd in commands {
        push_line(out, 3, &format!("CmdEnum::{} => 0x{:X},", capitalize(&cmd.name), cmd.id));
    }
    push_line(out, 2, "}");
    push_line(out, 1, "}");
    out.push('\n');
    push_line(out, 1, "pub fn from_id(cmd_id: u16) -> Option<Self> {");
    push_line(out, 2, "match cmd_id {");
    for cmd in commands {
        push_line(
            out,
            3,
            &format!("0x{:X} => Some(CmdEnum::{}),", cmd.id, capitalize(&cmd.name)),
        );
    }
    push_line(out, 3, "_ => None,");
    push_line(out, 2, "}");
    push_line(out, 1, "}");
    out.push_str("}\n\n");
}

fn write_struct(out: &mut String, type_name: &str, scope: &str, attributes: &[Attribute]) {
    out.push_str("#[derive(Debug, Clone, Default, PartialEq)]\n");
    out.push_str(&format!("pub struct {} {{\n", type_name));
    for att in attributes {
        let Some(storage) = att.data_type.storage() else {
            continue;
        };
        let ty = rust_type(storage, scope, &att.name);
        let ty = if att.optional { format!("Option<{}>", ty) } else { ty };
        push_line(out, 1, &format!("pub {}: {},", snake_case(&att.name), ty));
    }
    out.push_str("}\n\n");
}

fn desc_const_name(stem: &str) -> String {
    format!("{}_ATT_DESC", stem.to_uppercase())
}

fn write_descriptors(out: &mut String, ctx: &GenContext<'_>) {
    for info in ctx.complex_attributes_children_first() {
        let att = info.attribute;
        write_att_desc(
            out,
            &desc_const_name(&nested_stem(info.parent_name, &att.name)),
            &att.name,
            &att.children,
        );
    }
    for cmd in ctx.protocol.commands.iter().filter(|c| c.has_attributes()) {
        write_att_desc(out, &desc_const_name(&snake_case(&cmd.name)), &cmd.name, &cmd.attributes);
    }

    out.push_str("/// Protocol descriptor handed to the validator\n");
    out.push_str(&format!(
        "pub const LCSF_{}_PROT_DESC: LcsfProtDesc = LcsfProtDesc {{\n",
        ctx.protocol.name.to_uppercase()
    ));
    push_line(out, 1, "cmd_desc_arr: &[");
    for cmd in &ctx.protocol.commands {
        let atts = if cmd.has_attributes() {
            desc_const_name(&snake_case(&cmd.name))
        } else {
            "&[]".to_string()
        };
        push_line(
            out,
            2,
            &format!("LcsfCmdDesc {{ cmd_id: 0x{:X}, att_desc_arr: {} }},", cmd.id, atts),
        );
    }
    push_line(out, 1, "],");
    out.push_str("};\n\n");
}

fn write_att_desc(out: &mut String, const_name: &str, scope: &str, attributes: &[Attribute]) {
    out.push_str(&format!("const {}: &[LcsfAttDesc] = &[\n", const_name));
    for att in attributes {
        let sub = if att.has_sub_attributes() {
            desc_const_name(&nested_stem(scope, &att.name))
        } else {
            "&[]".to_string()
        };
        push_line(out, 1, "LcsfAttDesc {");
        push_line(out, 2, &format!("is_optional: {},", att.optional));
        push_line(
            out,
            2,
            &format!("data_type: LcsfDataType::{},", capitalize(att.data_type.keyword())),
        );
        push_line(out, 2, &format!("att_id: 0x{:X},", att.id));
        push_line(out, 2, &format!("subatt_desc_arr: {},", sub));
        push_line(out, 1, "},");
    }
    out.push_str("];\n\n");
}

fn decode_expr(storage: Storage, scope: &str, name: &str, binding: &str) -> String {
    match storage {
        Storage::Scalar(Scalar::U8) => format!("*{}.first()?", binding),
        Storage::Scalar(Scalar::U16) => format!("u16::try_from(vle_decode({})).ok()?", binding),
        Storage::Scalar(Scalar::U32) => format!("u32::try_from(vle_decode({})).ok()?", binding),
        Storage::Scalar(Scalar::U64) => format!("vle_decode({})", binding),
        Storage::Scalar(scalar @ (Scalar::F32 | Scalar::F64)) => format!(
            "{}::from_le_bytes({}.get(..{})?.try_into().ok()?)",
            rust_scalar_type(scalar),
            binding,
            scalar.byte_len()
        ),
        Storage::ByteArray => format!("{}.clone()", binding),
        Storage::String => format!(
            "CString::new({}.iter().copied().take_while(|&b| b != 0).collect::<Vec<u8>>()).ok()?",
            binding
        ),
        Storage::Nested => format!("decode_{}_payload({})?", nested_stem(scope, name), binding),
    }
}

fn write_decoder(out: &mut String, stem: &str, type_name: &str, scope: &str, attributes: &[Attribute]) {
    out.push_str(&format!(
        "fn decode_{}_payload(att_arr: &[LcsfValidAtt]) -> Option<{}> {{\n",
        stem, type_name
    ));
    push_line(out, 1, &format!("let mut payload = {}::default();", type_name));
    for (index, att) in attributes.iter().enumerate() {
        let Some(storage) = att.data_type.storage() else {
            continue;
        };
        let (variant, binding) = match storage {
            Storage::Nested => ("SubAttArray", "sub_att_arr"),
            _ => ("Data", "data"),
        };
        let pattern = format!(
            "Some(LcsfValidAttPayload::{}({})) = att_arr.get({}).map(|att| &att.payload)",
            variant, binding, index
        );
        let value = decode_expr(storage, scope, &att.name, binding);
        let field = snake_case(&att.name);
        if att.optional {
            push_line(out, 1, &format!("if let {} {{", pattern));
            push_line(out, 2, &format!("payload.{} = Some({});", field, value));
            push_line(out, 1, "}");
        } else {
            push_line(out, 1, &format!("let {} else {{", pattern));
            push_line(out, 2, "return None;");
            push_line(out, 1, "};");
            push_line(out, 1, &format!("payload.{} = {};", field, value));
        }
    }
    push_line(out, 1, "Some(payload)");
    out.push_str("}\n\n");

    for att in attributes.iter().filter(|a| a.has_sub_attributes()) {
        write_decoder(
            out,
            &nested_stem(scope, &att.name),
            &rust_nested_type(scope, &att.name),
            &att.name,
            &att.children,
        );
    }
}

/// Wire payload for a value. `value` names a `&T` when `by_ref`, a `T` place otherwise.
fn encode_expr(storage: Storage, scope: &str, name: &str, value: &str, by_ref: bool) -> String {
    let copied = if by_ref { format!("*{}", value) } else { value.to_string() };
    let borrowed = if by_ref { value.to_string() } else { format!("&{}", value) };
    match storage {
        Storage::Scalar(scalar) if scalar.is_float() => {
            format!("LcsfValidAttPayload::Data({}.to_le_bytes().to_vec())", value)
        }
        Storage::Scalar(Scalar::U8) => format!("LcsfValidAttPayload::Data(vec![{}])", copied),
        Storage::Scalar(_) => format!("LcsfValidAttPayload::Data(vle_encode(u64::from({})))", copied),
        Storage::ByteArray => format!("LcsfValidAttPayload::Data({}.clone())", value),
        Storage::String => format!("LcsfValidAttPayload::Data({}.as_bytes_with_nul().to_vec())", value),
        Storage::Nested => format!(
            "LcsfValidAttPayload::SubAttArray(encode_{}_payload({}))",
            nested_stem(scope, name),
            borrowed
        ),
    }
}

fn write_encoder(out: &mut String, stem: &str, type_name: &str, scope: &str, attributes: &[Attribute]) {
    out.push_str(&format!(
        "fn encode_{}_payload(payload: &{}) -> Vec<LcsfValidAtt> {{\n",
        stem, type_name
    ));
    push_line(out, 1, &format!("let mut att_arr = Vec::with_capacity({});", attributes.len()));
    for att in attributes {
        let Some(storage) = att.data_type.storage() else {
            continue;
        };
        let field = snake_case(&att.name);
        push_line(out, 1, "att_arr.push(LcsfValidAtt {");
        if att.optional {
            push_line(out, 2, &format!("payload: match &payload.{} {{", field));
            push_line(
                out,
                3,
                &format!("Some(value) => {},", encode_expr(storage, scope, &att.name, "value", true)),
            );
            push_line(out, 3, "None => LcsfValidAttPayload::Empty,");
            push_line(out, 2, "},");
        } else {
            let place = format!("payload.{}", field);
            push_line(
                out,
                2,
                &format!("payload: {},", encode_expr(storage, scope, &att.name, &place, false)),
            );
        }
        push_line(out, 1, "});");
    }
    push_line(out, 1, "att_arr");
    out.push_str("}\n\n");

    for att in attributes.iter().filter(|a| a.has_sub_attributes()) {
        write_encoder(
            out,
            &nested_stem(scope, &att.name),
            &rust_nested_type(scope, &att.name),
            &att.name,
            &att.children,
        );
    }
}

fn write_decode(out: &mut String, commands: &[Command], decoded: &[&Command]) {
    out.push_str("/// Decode a validated command into its name and typed payload.\n");
    out.push_str("pub fn decode(valid_cmd: &LcsfValidCmd) -> Option<(CmdEnum, CmdPayload)> {\n");
    push_line(out, 1, "let cmd_name = CmdEnum::from_id(valid_cmd.cmd_id)?;");
    if decoded.is_empty() {
        push_line(out, 1, "let payload = CmdPayload::Empty;");
    } else {
        push_line(out, 1, "let payload = match cmd_name {");
        for cmd in decoded {
            let variant = capitalize(&cmd.name);
            push_line(
                out,
                2,
                &format!(
                    "CmdEnum::{v} => CmdPayload::{v}(decode_{}_payload(&valid_cmd.att_arr)?),",
                    snake_case(&cmd.name),
                    v = variant
                ),
            );
        }
        if decoded.len() < commands.len() {
            push_line(out, 2, "_ => CmdPayload::Empty,");
        }
        push_line(out, 1, "};");
    }
    push_line(out, 1, "Some((cmd_name, payload))");
    out.push_str("}\n\n");
}

fn write_encode(out: &mut String, any_attributes: bool, encoded: &[&Command]) {
    out.push_str("/// Build the validated command for `cmd_name`, `None` if the payload does not match.\n");
    out.push_str("pub fn encode(cmd_name: CmdEnum, payload: &CmdPayload) -> Option<LcsfValidCmd> {\n");
    push_line(out, 1, "let att_arr = match (cmd_name, payload) {");
    for cmd in encoded {
        let variant = capitalize(&cmd.name);
        push_line(
            out,
            2,
            &format!(
                "(CmdEnum::{v}, CmdPayload::{v}(cmd_payload)) => encode_{}_payload(cmd_payload),",
                snake_case(&cmd.name),
                v = variant
            ),
        );
    }
    push_line(out, 2, "(_, CmdPayload::Empty) => Vec::new(),");
    if any_attributes {
        push_line(out, 2, "_ => return None,");
    }
    push_line(out, 1, "};");
    push_line(out, 1, "Some(LcsfValidCmd {");
    push_line(out, 2, "cmd_id: cmd_name.id(),");
    push_line(out, 2, "att_arr,");
    push_line(out, 1, "})");
    out.push_str("}\n");
}
