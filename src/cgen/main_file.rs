//! `{Protocol}_Main_{a,b}.c`: stub handlers, the dispatcher and the module entry points.
//!
//! Every function is written as doc block, body, blank line. That is the shape the
//! extractor splits on, so feeding a generated file back through it and regenerating
//! reproduces the same text.

use super::{bridge_header_name, doc_block, file_banner, main_header_name, main_source_name, push_line};
use crate::extract::{ExtractedCode, PublicFunction};
use crate::flatten::GenContext;
use crate::model::{Attribute, Command, Role, Storage};
use crate::resolve::{
    att_flag_name, c_scalar_type, cmd_enum_name, local_stem, scope_path, struct_field_path,
    BitfieldWidth, BITFIELD_MEMBER,
};

const CUSTOM_CODE: &str = "            // Custom code\n";

/// Render the main module of `role`, reusing hand-written regions from `previous`.
pub fn generate_main_source(ctx: &GenContext<'_>, role: Role, previous: Option<&ExtractedCode>) -> String {
    let proto = ctx.protocol.name.as_str();
    let mut out = match previous {
        Some(code) => code.includes.clone(),
        None => default_includes(proto, role),
    };
    out.push_str("// *** Definitions ***\n");
    match previous {
        Some(code) => out.push_str(&code.definitions),
        None => out.push_str(&default_definitions(proto)),
    }

    out.push_str("// *** Private Functions ***\n\n");
    out.push_str(&send_command_function(proto));
    if let Some(code) = previous {
        for func in &code.unknown_private_functions {
            out.push_str(func);
            out.push('\n');
        }
    }
    for cmd in ctx.protocol.commands.iter().filter(|c| c.is_receivable(role)) {
        out.push_str(&handler_doc(proto, cmd));
        match previous.and_then(|code| code.command_function(&cmd.name)) {
            Some(body) => out.push_str(body),
            None => out.push_str(&handler_stub(proto, cmd)),
        }
        out.push('\n');
    }
    let default_body = previous
        .and_then(|code| code.default_command_handler.as_deref())
        .unwrap_or(CUSTOM_CODE);
    out.push_str(&dispatch_function(proto, ctx.protocol.commands.as_slice(), role, default_body));
    if let Some(code) = previous.filter(|code| !code.private_trailing_code.is_empty()) {
        out.push_str(&code.private_trailing_code);
        out.push('\n');
    }

    out.push_str("// *** Public Functions ***\n\n");
    let public_functions = match previous {
        Some(code) if !code.public_functions.is_empty() => code.public_functions.clone(),
        _ => default_public_functions(ctx),
    };
    for func in &public_functions {
        if !func.preceding_code.is_empty() {
            out.push_str(&func.preceding_code);
            out.push('\n');
        }
        out.push_str(&func.header);
        out.push_str(&func.body);
        out.push('\n');
    }
    if let Some(code) = previous {
        out.push_str(&code.public_trailing_code);
    }
    out
}

fn default_includes(proto: &str, role: Role) -> String {
    let file_name = main_source_name(proto, role);
    let mut out = file_banner(&file_name, &format!("{} protocol module ({})", proto, role.label()));
    out.push_str("// *** Libraries include ***\n");
    out.push_str("// Standard lib\n");
    out.push_str("#include <string.h>\n");
    out.push_str("// Custom lib\n");
    out.push_str("#include <lib_lcsf/lcsf_transcoder.h>\n");
    out.push_str(&format!("#include \"{}\"\n", bridge_header_name(proto)));
    out.push_str(&format!("#include \"{}\"\n\n", main_header_name(proto)));
    out
}

fn default_definitions(proto: &str) -> String {
    let lower = proto.to_lowercase();
    let mut out = String::new();
    out.push_str("// --- Private Types ---\n");
    out.push_str(&format!("typedef struct _{}_info {{\n", lower));
    push_line(&mut out, 1, "uint8_t *pSendBuffer;");
    push_line(&mut out, 1, "size_t sendBufferSize;");
    push_line(&mut out, 1, &format!("{}_cmd_payload_t sendCmdPayload;", lower));
    out.push_str(&format!("}} {}_info_t;\n\n", lower));
    out.push_str("// --- Private Variables ---\n");
    out.push_str(&format!("static {}_info_t {}Info;\n\n", lower, proto));
    out
}

fn send_command_function(proto: &str) -> String {
    let lower = proto.to_lowercase();
    let signature = format!("static bool {}SendCommand(uint_fast16_t cmdName, bool hasPayload)", proto);
    let mut out = doc_block(
        &signature,
        "Encode and send a command",
        &[
            ("cmdName", "name of the command to send"),
            ("hasPayload", "whether the command carries the send payload"),
        ],
        Some("bool: true if operation was a success"),
    );
    out.push_str(&format!("{} {{\n", signature));
    push_line(&mut out, 1, &format!("if (cmdName >= {}_CMD_COUNT) {{", proto.to_uppercase()));
    push_line(&mut out, 2, "return false;");
    push_line(&mut out, 1, "}");
    push_line(&mut out, 1, &format!("{}_cmd_payload_t *pCmdPayload = NULL;", lower));
    push_line(&mut out, 1, "if (hasPayload) {");
    push_line(&mut out, 2, &format!("pCmdPayload = &{}Info.sendCmdPayload;", proto));
    push_line(&mut out, 1, "}");
    push_line(
        &mut out,
        1,
        &format!(
            "int msgSize = LCSF_Bridge_{p}Encode(cmdName, pCmdPayload, {p}Info.pSendBuffer, {p}Info.sendBufferSize);",
            p = proto
        ),
    );
    push_line(&mut out, 1, "if (msgSize <= 0) {");
    push_line(&mut out, 2, "return false;");
    push_line(&mut out, 1, "}");
    push_line(
        &mut out,
        1,
        &format!("return LCSF_TranscoderSend({}Info.pSendBuffer, (size_t)msgSize);", proto),
    );
    out.push_str("}\n\n");
    out
}

fn handler_signature(proto: &str, cmd: &Command) -> String {
    if cmd.has_attributes() {
        format!(
            "static bool {}Execute{}({}_cmd_payload_t *pCmdPayload)",
            proto,
            cmd.name,
            proto.to_lowercase()
        )
    } else {
        format!("static bool {}Execute{}(void)", proto, cmd.name)
    }
}

fn handler_doc(proto: &str, cmd: &Command) -> String {
    let brief = if cmd.description.is_empty() {
        format!("Execute command {}", cmd.name)
    } else {
        format!("Execute command {} ({})", cmd.name, cmd.description)
    };
    let params: &[(&str, &str)] = if cmd.has_attributes() {
        &[("pCmdPayload", "pointer to command payload")]
    } else {
        &[]
    };
    doc_block(
        &handler_signature(proto, cmd),
        &brief,
        params,
        Some("bool: true if operation was a success"),
    )
}

/// Fresh handler body: locals for every attribute, copy-out from the payload, then a TODO.
fn handler_stub(proto: &str, cmd: &Command) -> String {
    let mut out = format!("{} {{\n", handler_signature(proto, cmd));
    if cmd.has_attributes() {
        push_line(&mut out, 1, "if (pCmdPayload == NULL) {");
        push_line(&mut out, 2, "return false;");
        push_line(&mut out, 1, "}");
        let ancestors = [cmd.name.as_str()];
        push_line(&mut out, 1, "// Declare attributes");
        declare_rec(&mut out, &ancestors, &cmd.attributes);
        push_line(&mut out, 1, "// Retrieve attributes data");
        grab_rec(&mut out, proto, &ancestors, &cmd.attributes, 1);
    }
    push_line(&mut out, 1, "// Process data");
    push_line(&mut out, 1, &format!("// TODO: process command {}", cmd.name));
    push_line(&mut out, 1, "return true;");
    out.push_str("}\n");
    out
}

fn declare_rec(out: &mut String, ancestors: &[&str], attributes: &[Attribute]) {
    for att in attributes {
        let Some(storage) = att.data_type.storage() else {
            continue;
        };
        let stem = local_stem(ancestors, &att.name);
        if att.optional {
            push_line(out, 1, &format!("bool is_{}_here = false;", stem));
        }
        match storage {
            Storage::Scalar(scalar) => {
                push_line(out, 1, &format!("{} m_{} = 0;", c_scalar_type(scalar), stem));
            }
            Storage::ByteArray => {
                push_line(out, 1, &format!("uint8_t *m_p_{} = NULL;", stem));
                push_line(out, 1, &format!("uint32_t m_{}_size = 0;", stem));
            }
            Storage::String => {
                push_line(out, 1, &format!("char *m_p_{} = NULL;", stem));
            }
            Storage::Nested => {
                let mut chain = ancestors.to_vec();
                chain.push(att.name.as_str());
                declare_rec(out, &chain, &att.children);
            }
        }
    }
}

fn grab_rec(out: &mut String, proto: &str, ancestors: &[&str], attributes: &[Attribute], level: usize) {
    let parent = ancestors.last().copied().unwrap_or_default();
    let width = BitfieldWidth::for_count(attributes.len());
    let bitfield = format!("pCmdPayload->{}.{}", scope_path(ancestors), BITFIELD_MEMBER);
    for (index, att) in attributes.iter().enumerate() {
        let Some(storage) = att.data_type.storage() else {
            continue;
        };
        let stem = local_stem(ancestors, &att.name);
        let field = att.name.to_lowercase();
        let mut inner = level;
        if att.optional {
            let flag = att_flag_name(proto, parent, &att.name);
            push_line(out, level, &format!("if {} {{", width.test_expr(&bitfield, &flag, index)));
            push_line(out, level + 1, &format!("is_{}_here = true;", stem));
            inner += 1;
        }
        match storage {
            Storage::Scalar(_) => push_line(
                out,
                inner,
                &format!("m_{} = pCmdPayload->{};", stem, struct_field_path(ancestors, &field)),
            ),
            Storage::ByteArray => {
                push_line(
                    out,
                    inner,
                    &format!(
                        "m_p_{} = pCmdPayload->{};",
                        stem,
                        struct_field_path(ancestors, &format!("p_{}", field))
                    ),
                );
                push_line(
                    out,
                    inner,
                    &format!(
                        "m_{}_size = pCmdPayload->{};",
                        stem,
                        struct_field_path(ancestors, &format!("{}Size", field))
                    ),
                );
            }
            Storage::String => push_line(
                out,
                inner,
                &format!(
                    "m_p_{} = pCmdPayload->{};",
                    stem,
                    struct_field_path(ancestors, &format!("p_{}", field))
                ),
            ),
            Storage::Nested => {
                let mut chain = ancestors.to_vec();
                chain.push(att.name.as_str());
                grab_rec(out, proto, &chain, &att.children, inner);
            }
        }
        if att.optional {
            push_line(out, level, "}");
        }
    }
}

fn dispatch_function(proto: &str, commands: &[Command], role: Role, default_body: &str) -> String {
    let signature = format!(
        "static bool {}DispatchCommand(uint_fast16_t cmdName, {}_cmd_payload_t *pCmdPayload)",
        proto,
        proto.to_lowercase()
    );
    let mut out = doc_block(
        &signature,
        "Dispatch a received command to its handler",
        &[
            ("cmdName", "name of the received command"),
            ("pCmdPayload", "pointer to command payload"),
        ],
        Some("bool: true if operation was a success"),
    );
    out.push_str(&format!("{} {{\n", signature));
    push_line(&mut out, 1, "bool ret = false;");
    out.push('\n');
    push_line(&mut out, 1, "switch (cmdName) {");
    for cmd in commands.iter().filter(|c| c.is_receivable(role)) {
        push_line(&mut out, 2, &format!("case {}:", cmd_enum_name(proto, &cmd.name)));
        let call = if cmd.has_attributes() {
            format!("ret = {}Execute{}(pCmdPayload);", proto, cmd.name)
        } else {
            format!("ret = {}Execute{}();", proto, cmd.name)
        };
        push_line(&mut out, 3, &call);
        push_line(&mut out, 3, "break;");
        out.push('\n');
    }
    push_line(&mut out, 2, "default:");
    out.push_str(default_body);
    push_line(&mut out, 3, "break;");
    push_line(&mut out, 1, "}");
    push_line(&mut out, 1, "return ret;");
    out.push_str("}\n\n");
    out
}

/// `{P}Init` and `{P}Execute`, as written when there is nothing to reuse.
pub fn default_public_functions(ctx: &GenContext<'_>) -> Vec<PublicFunction> {
    let proto = ctx.protocol.name.as_str();
    let lower = proto.to_lowercase();

    let init_sig = format!("bool {}Init(uint8_t *pSendBuffer, size_t sendBufferSize)", proto);
    let mut init_body = format!("{} {{\n", init_sig);
    push_line(&mut init_body, 1, "if (pSendBuffer == NULL) {");
    push_line(&mut init_body, 2, "return false;");
    push_line(&mut init_body, 1, "}");
    push_line(&mut init_body, 1, &format!("{}Info.pSendBuffer = pSendBuffer;", proto));
    push_line(&mut init_body, 1, &format!("{}Info.sendBufferSize = sendBufferSize;", proto));
    push_line(&mut init_body, 1, "return true;");
    init_body.push_str("}\n");

    let exec_sig = format!(
        "bool {}Execute(uint_fast16_t cmdName, {}_cmd_payload_t *pCmdPayload)",
        proto, lower
    );
    let mut exec_body = format!("{} {{\n", exec_sig);
    push_line(
        &mut exec_body,
        1,
        &format!("return {}DispatchCommand(cmdName, pCmdPayload);", proto),
    );
    exec_body.push_str("}\n");

    vec![
        PublicFunction {
            preceding_code: String::new(),
            header: doc_block(
                &init_sig,
                &format!("Initialize the {} module", proto),
                &[
                    ("pSendBuffer", "pointer to the send buffer"),
                    ("sendBufferSize", "size of the send buffer"),
                ],
                Some("bool: true if operation was a success"),
            ),
            signature: format!("{} {{\n", init_sig),
            body: init_body,
        },
        PublicFunction {
            preceding_code: String::new(),
            header: doc_block(
                &exec_sig,
                &format!("Execute a {} command", proto),
                &[
                    ("cmdName", "name of the command"),
                    ("pCmdPayload", "pointer to command payload"),
                ],
                Some("bool: true if operation was a success"),
            ),
            signature: format!("{} {{\n", exec_sig),
            body: exec_body,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::prepare;
    use crate::model::{DataType, Direction, Protocol};

    fn protocol() -> Protocol {
        Protocol::new("Test", 1)
            .with_command(Command::new("SC3", 2, Direction::Bidirectional))
            .with_command(
                Command::new("CC3", 3, Direction::AToB).with_attribute(
                    Attribute::new("CA1", 0, DataType::SubAttributes)
                        .optional(true)
                        .with_child(Attribute::new("SA2", 0, DataType::Uint16))
                        .with_child(Attribute::new("SA4", 1, DataType::ByteArray).optional(true)),
                ),
            )
    }

    #[test]
    fn nested_optional_attributes_are_gated() {
        let proto = protocol();
        let ctx = prepare(&proto).expect("valid");
        let src = generate_main_source(&ctx, Role::B, None);
        assert!(src.contains("    bool is_ca1_here = false;\n    uint16_t m_ca1_sa2 = 0;\n"));
        assert!(src.contains(
            "    if ((pCmdPayload->cc3_payload.optAttFlagsBitfield & TEST_CC3_ATT_CA1_FLAG) != 0) {\n        is_ca1_here = true;\n        m_ca1_sa2 = pCmdPayload->cc3_payload.ca1_payload.sa2;\n"
        ));
        assert!(src.contains(
            "        if ((pCmdPayload->cc3_payload.ca1_payload.optAttFlagsBitfield & TEST_CA1_ATT_SA4_FLAG) != 0) {\n            is_ca1_sa4_here = true;\n"
        ));
        assert!(src.contains("m_ca1_sa4_size = pCmdPayload->cc3_payload.ca1_payload.sa4Size;"));
    }

    #[test]
    fn handlers_follow_direction() {
        let proto = protocol();
        let ctx = prepare(&proto).expect("valid");
        let a = generate_main_source(&ctx, Role::A, None);
        let b = generate_main_source(&ctx, Role::B, None);
        assert!(a.contains("static bool TestExecuteSC3(void) {"));
        assert!(!a.contains("static bool TestExecuteCC3("));
        assert!(b.contains("static bool TestExecuteCC3(test_cmd_payload_t *pCmdPayload) {"));
        assert!(b.contains("        case TEST_CMD_CC3:\n            ret = TestExecuteCC3(pCmdPayload);\n"));
    }

    #[test]
    fn sections_appear_in_order() {
        let proto = protocol();
        let ctx = prepare(&proto).expect("valid");
        let src = generate_main_source(&ctx, Role::A, None);
        let defs = src.find("// *** Definitions ***").expect("definitions");
        let private = src.find("// *** Private Functions ***").expect("private");
        let public = src.find("// *** Public Functions ***").expect("public");
        assert!(defs < private && private < public);
        assert_eq!(src.matches("Definitions").count(), 1);
        assert!(src.ends_with("}\n\n"));
    }
}
