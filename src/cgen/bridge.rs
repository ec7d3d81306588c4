//! LCSF bridge: translation between the typed payload union and the validator's generic
//! attribute arrays.
//!
//! Decoding (`GetData`) only exists for commands the role receives, encoding (`FillAtt`)
//! only for commands it transmits. Attribute arrays handed to the encoder are carved out
//! of a fixed arena sized for the largest command, reset at each encode call.

use super::{bridge_header_name, bridge_source_name, file_banner, include_guard, main_header_name, push_line};
use crate::flatten::GenContext;
use crate::model::{Attribute, Command, Role, Storage};
use crate::resolve::{
    att_flag_name, att_id_name, c_scalar_type, cmd_att_nb_name, cmd_enum_name, cmd_id_name,
    receive_path, scope_path, struct_field_path, subatt_nb_name, transmit_path, BitfieldWidth,
    BITFIELD_MEMBER,
};

/// Render `LCSF_Bridge_{P}.h`, shared by both roles.
pub fn generate_bridge_header(ctx: &GenContext<'_>) -> String {
    let proto = ctx.protocol.name.as_str();
    let upper = proto.to_uppercase();
    let lower = proto.to_lowercase();
    let file_name = bridge_header_name(proto);
    let guard = include_guard(&file_name);
    let mut out = file_banner(&file_name, &format!("{} LCSF bridge module", proto));

    out.push_str(&format!("#ifndef {}\n#define {}\n\n", guard, guard));
    out.push_str("// *** Libraries include ***\n");
    out.push_str("#include <lib_lcsf/lcsf_validator.h>\n");
    out.push_str(&format!("#include \"{}\"\n\n", main_header_name(proto)));
    out.push_str("// *** Definitions ***\n");
    out.push_str("// --- Public Constants ---\n\n");

    out.push_str("// Lcsf protocol identifier\n");
    out.push_str(&format!("#define LCSF_{}_PROTOCOL_ID 0x{:X}\n\n", upper, ctx.protocol.id));

    out.push_str("// Command identifier enum\n");
    out.push_str(&format!("enum _lcsf_{}_cmd_id {{\n", lower));
    for cmd in &ctx.protocol.commands {
        push_line(&mut out, 1, &format!("{} = 0x{:X},", cmd_id_name(proto, &cmd.name), cmd.id));
    }
    out.push_str("};\n\n");

    let scopes = ctx.scopes();
    if !scopes.is_empty() {
        out.push_str("// Attribute identifier enums\n");
        for scope in &scopes {
            out.push_str(&format!(
                "enum _lcsf_{}_{}_att_id {{\n",
                lower,
                scope.parent_name.to_lowercase()
            ));
            for info in &scope.attributes {
                push_line(
                    &mut out,
                    1,
                    &format!(
                        "{} = 0x{:X},",
                        att_id_name(proto, scope.parent_name, &info.attribute.name),
                        info.attribute.id
                    ),
                );
            }
            out.push_str("};\n\n");
        }
    }

    out.push_str("// Command number\n");
    out.push_str(&format!("#define LCSF_{}_CMD_NB {}\n\n", upper, ctx.protocol.commands.len()));
    let with_attributes: Vec<&Command> = ctx.protocol.commands.iter().filter(|c| c.has_attributes()).collect();
    if !with_attributes.is_empty() {
        out.push_str("// Command attribute number\n");
        for cmd in with_attributes {
            out.push_str(&format!(
                "#define {} {}\n",
                cmd_att_nb_name(proto, &cmd.name),
                cmd.attributes.len()
            ));
        }
        out.push('\n');
    }
    let complex = ctx.complex_attributes_children_first();
    if !complex.is_empty() {
        out.push_str("// Attribute sub-attribute number\n");
        for info in complex.iter().rev() {
            out.push_str(&format!(
                "#define {} {}\n",
                subatt_nb_name(proto, &info.attribute.name),
                info.sub_attribute_count
            ));
        }
        out.push('\n');
    }

    out.push_str("// --- Public Variables ---\n");
    out.push_str(&format!("extern const lcsf_protocol_desc_t LCSF_{}_ProtDesc;\n\n", proto));
    out.push_str("// --- Public Function Prototypes ---\n");
    out.push_str(&format!("bool {};\n", receive_signature(proto)));
    out.push_str(&format!("int {};\n\n", encode_signature(proto)));
    out.push_str(&format!("#endif // {}\n", guard));
    out
}

fn receive_signature(proto: &str) -> String {
    format!("LCSF_Bridge_{}Receive(lcsf_valid_cmd_t *pValidCmd)", proto)
}

fn encode_signature(proto: &str) -> String {
    format!(
        "LCSF_Bridge_{}Encode(uint_fast16_t cmdName, {}_cmd_payload_t *pCmdPayload, uint8_t *pBuffer, size_t buffSize)",
        proto,
        proto.to_lowercase()
    )
}

/// Render `LCSF_Bridge_{P}_{a,b}.c`.
pub fn generate_bridge_source(ctx: &GenContext<'_>, role: Role) -> String {
    let proto = ctx.protocol.name.as_str();
    let upper = proto.to_uppercase();
    let lower = proto.to_lowercase();
    let file_name = bridge_source_name(proto, role);
    let mut out = file_banner(&file_name, &format!("{} LCSF bridge module ({})", proto, role.label()));

    let receivable: Vec<&Command> = ctx
        .protocol
        .commands
        .iter()
        .filter(|c| c.is_receivable(role) && c.has_attributes())
        .collect();
    let transmittable: Vec<&Command> = ctx
        .protocol
        .commands
        .iter()
        .filter(|c| c.is_transmittable(role) && c.has_attributes())
        .collect();

    out.push_str("// *** Libraries include ***\n");
    out.push_str("// Standard lib\n");
    out.push_str("#include <string.h>\n");
    out.push_str("// Custom lib\n");
    out.push_str(&format!("#include \"{}\"\n\n", bridge_header_name(proto)));

    out.push_str("// *** Definitions ***\n");
    out.push_str("// --- Private Macros ---\n");
    out.push_str(&format!(
        "#define LCSF_{}_MAX_ATT_NB {}\n\n",
        upper,
        ctx.protocol.max_attribute_slots().max(1)
    ));
    out.push_str("// --- Private Types ---\n");
    out.push_str(&format!("typedef struct _lcsf_bridge_{}_info {{\n", lower));
    push_line(&mut out, 1, "uint16_t freeAttIdx;");
    push_line(&mut out, 1, &format!("lcsf_valid_att_t attArray[LCSF_{}_MAX_ATT_NB];", upper));
    push_line(&mut out, 1, &format!("{}_cmd_payload_t cmdPayload;", lower));
    out.push_str(&format!("}} lcsf_bridge_{}_info_t;\n\n", lower));

    out.push_str("// --- Private Constants ---\n");
    out.push_str(&format!(
        "static const uint16_t LCSF_Bridge_{}_CmdNameToId[LCSF_{}_CMD_NB] = {{\n",
        proto, upper
    ));
    for cmd in &ctx.protocol.commands {
        push_line(&mut out, 1, &format!("{},", cmd_id_name(proto, &cmd.name)));
    }
    out.push_str("};\n\n");
    out.push_str("// --- Private Variables ---\n");
    out.push_str(&format!("static lcsf_bridge_{}_info_t LcsfBridge{}Info;\n\n", lower, proto));

    out.push_str("// *** Private Functions ***\n\n");
    write_cmd_id_to_name(&mut out, ctx);
    if !transmittable.is_empty() {
        write_allocate_att(&mut out, proto);
    }
    for cmd in &receivable {
        write_get_data(&mut out, proto, cmd);
    }
    if !receivable.is_empty() {
        write_get_cmd_data(&mut out, proto, &receivable);
    }
    for cmd in &transmittable {
        write_fill_att(&mut out, proto, cmd);
    }
    if !transmittable.is_empty() {
        write_fill_cmd_att(&mut out, proto, &transmittable);
    }

    out.push_str("// *** Public Functions ***\n\n");
    write_receive(&mut out, proto, !receivable.is_empty());
    write_encode(&mut out, proto, !transmittable.is_empty());
    out
}

fn write_cmd_id_to_name(out: &mut String, ctx: &GenContext<'_>) {
    let proto = ctx.protocol.name.as_str();
    out.push_str(&format!(
        "static uint16_t LCSF_Bridge_{}CmdIdToName(uint_fast16_t cmdId) {{\n",
        proto
    ));
    push_line(out, 1, "switch (cmdId) {");
    for cmd in &ctx.protocol.commands {
        push_line(out, 2, &format!("case {}:", cmd_id_name(proto, &cmd.name)));
        push_line(out, 3, &format!("return {};", cmd_enum_name(proto, &cmd.name)));
    }
    push_line(out, 2, "default:");
    push_line(out, 3, &format!("return {}_CMD_COUNT;", proto.to_uppercase()));
    push_line(out, 1, "}");
    out.push_str("}\n\n");
}

fn write_allocate_att(out: &mut String, proto: &str) {
    let info = format!("LcsfBridge{}Info", proto);
    out.push_str(&format!(
        "static lcsf_valid_att_t *LCSF_Bridge_{}AllocateAtt(uint_fast16_t attNb) {{\n",
        proto
    ));
    push_line(
        out,
        1,
        &format!(
            "if ((uint_fast16_t)({}.freeAttIdx + attNb) > LCSF_{}_MAX_ATT_NB) {{",
            info,
            proto.to_uppercase()
        ),
    );
    push_line(out, 2, "return NULL;");
    push_line(out, 1, "}");
    push_line(out, 1, &format!("lcsf_valid_att_t *pAtt = &{}.attArray[{}.freeAttIdx];", info, info));
    push_line(out, 1, &format!("{}.freeAttIdx += attNb;", info));
    push_line(out, 1, "return pAtt;");
    out.push_str("}\n\n");
}

fn write_get_data(out: &mut String, proto: &str, cmd: &Command) {
    out.push_str(&format!(
        "static void LCSF_Bridge_{}{}GetData(lcsf_valid_att_t *pAttArray, {}_cmd_payload_t *pCmdPayload) {{\n",
        proto,
        cmd.name,
        proto.to_lowercase()
    ));
    push_line(out, 1, "if (pCmdPayload == NULL) {");
    push_line(out, 2, "return;");
    push_line(out, 1, "}");
    get_data_rec(out, proto, &[cmd.name.as_str()], &cmd.attributes, 1);
    out.push_str("}\n\n");
}

fn get_data_rec(out: &mut String, proto: &str, ancestors: &[&str], attributes: &[Attribute], level: usize) {
    let parent = ancestors.last().copied().unwrap_or_default();
    let width = BitfieldWidth::for_count(attributes.len());
    let bitfield = format!("pCmdPayload->{}.{}", scope_path(ancestors), BITFIELD_MEMBER);
    if attributes.iter().any(|a| a.optional) {
        push_line(out, level, "// Initialize optional attribute flags bitfield");
        push_line(out, level, &width.clear_stmt(&bitfield));
    }
    for (index, att) in attributes.iter().enumerate() {
        let Some(storage) = att.data_type.storage() else {
            continue;
        };
        let path = receive_path(proto, ancestors, &att.name);
        let field = att.name.to_lowercase();
        push_line(out, level, &format!("// Retrieve data of attribute {}", att.name));
        let mut inner = level;
        if att.optional {
            let pointer = match storage {
                Storage::Nested => "pSubAttArray",
                _ => "pData",
            };
            push_line(out, level, &format!("if ({}.Payload.{} != NULL) {{", path, pointer));
            let flag = att_flag_name(proto, parent, &att.name);
            push_line(out, level + 1, &width.set_stmt(&bitfield, &flag, index));
            inner += 1;
        }
        match storage {
            Storage::Scalar(scalar) => push_line(
                out,
                inner,
                &format!(
                    "memcpy(&(pCmdPayload->{}), {}.Payload.pData, sizeof({}));",
                    struct_field_path(ancestors, &field),
                    path,
                    c_scalar_type(scalar)
                ),
            ),
            Storage::ByteArray => {
                push_line(
                    out,
                    inner,
                    &format!(
                        "pCmdPayload->{} = {}.PayloadSize;",
                        struct_field_path(ancestors, &format!("{}Size", field)),
                        path
                    ),
                );
                push_line(
                    out,
                    inner,
                    &format!(
                        "pCmdPayload->{} = {}.Payload.pData;",
                        struct_field_path(ancestors, &format!("p_{}", field)),
                        path
                    ),
                );
            }
            Storage::String => push_line(
                out,
                inner,
                &format!(
                    "pCmdPayload->{} = {}.Payload.pData;",
                    struct_field_path(ancestors, &format!("p_{}", field)),
                    path
                ),
            ),
            Storage::Nested => {
                let mut chain = ancestors.to_vec();
                chain.push(att.name.as_str());
                get_data_rec(out, proto, &chain, &att.children, inner);
            }
        }
        if att.optional {
            push_line(out, level, "}");
        }
    }
}

fn write_get_cmd_data(out: &mut String, proto: &str, commands: &[&Command]) {
    out.push_str(&format!(
        "static void LCSF_Bridge_{}GetCmdData(uint_fast16_t cmdName, lcsf_valid_att_t *pAttArray, {}_cmd_payload_t *pCmdPayload) {{\n",
        proto,
        proto.to_lowercase()
    ));
    push_line(out, 1, "if (pAttArray == NULL) {");
    push_line(out, 2, "return;");
    push_line(out, 1, "}");
    push_line(out, 1, "switch (cmdName) {");
    for cmd in commands {
        push_line(out, 2, &format!("case {}:", cmd_enum_name(proto, &cmd.name)));
        push_line(
            out,
            3,
            &format!("LCSF_Bridge_{}{}GetData(pAttArray, pCmdPayload);", proto, cmd.name),
        );
        push_line(out, 3, "break;");
    }
    push_line(out, 2, "default:");
    push_line(out, 3, "break;");
    push_line(out, 1, "}");
    out.push_str("}\n\n");
}

fn write_fill_att(out: &mut String, proto: &str, cmd: &Command) {
    out.push_str(&format!(
        "static bool LCSF_Bridge_{}{}FillAtt(lcsf_valid_att_t **pAttArrayPtr, {}_cmd_payload_t *pCmdPayload) {{\n",
        proto,
        cmd.name,
        proto.to_lowercase()
    ));
    push_line(out, 1, "if (pCmdPayload == NULL) {");
    push_line(out, 2, "return false;");
    push_line(out, 1, "}");
    push_line(out, 1, "// Allocate attribute array");
    push_line(
        out,
        1,
        &format!(
            "*pAttArrayPtr = LCSF_Bridge_{}AllocateAtt({});",
            proto,
            cmd_att_nb_name(proto, &cmd.name)
        ),
    );
    push_line(out, 1, "if (*pAttArrayPtr == NULL) {");
    push_line(out, 2, "return false;");
    push_line(out, 1, "}");
    fill_att_rec(out, proto, &[cmd.name.as_str()], &cmd.attributes, 1);
    push_line(out, 1, "return true;");
    out.push_str("}\n\n");
}

fn fill_att_rec(out: &mut String, proto: &str, ancestors: &[&str], attributes: &[Attribute], level: usize) {
    let parent = ancestors.last().copied().unwrap_or_default();
    let width = BitfieldWidth::for_count(attributes.len());
    let bitfield = format!("pCmdPayload->{}.{}", scope_path(ancestors), BITFIELD_MEMBER);
    for (index, att) in attributes.iter().enumerate() {
        let Some(storage) = att.data_type.storage() else {
            continue;
        };
        let path = transmit_path(proto, ancestors, &att.name);
        let field = att.name.to_lowercase();
        push_line(out, level, &format!("// Fill attribute {}", att.name));
        let mut inner = level;
        if att.optional {
            let flag = att_flag_name(proto, parent, &att.name);
            push_line(out, level, &format!("if {} {{", width.test_expr(&bitfield, &flag, index)));
            inner += 1;
        }
        match storage {
            Storage::Scalar(scalar) => {
                push_line(
                    out,
                    inner,
                    &format!("{}.PayloadSize = sizeof({});", path, c_scalar_type(scalar)),
                );
                push_line(
                    out,
                    inner,
                    &format!(
                        "{}.Payload.pData = &(pCmdPayload->{});",
                        path,
                        struct_field_path(ancestors, &field)
                    ),
                );
            }
            Storage::ByteArray => {
                push_line(
                    out,
                    inner,
                    &format!(
                        "{}.PayloadSize = pCmdPayload->{};",
                        path,
                        struct_field_path(ancestors, &format!("{}Size", field))
                    ),
                );
                push_line(
                    out,
                    inner,
                    &format!(
                        "{}.Payload.pData = pCmdPayload->{};",
                        path,
                        struct_field_path(ancestors, &format!("p_{}", field))
                    ),
                );
            }
            Storage::String => {
                let member = struct_field_path(ancestors, &format!("p_{}", field));
                push_line(
                    out,
                    inner,
                    &format!("{}.PayloadSize = strlen(pCmdPayload->{});", path, member),
                );
                push_line(out, inner, &format!("{}.Payload.pData = pCmdPayload->{};", path, member));
            }
            Storage::Nested => {
                let nb = subatt_nb_name(proto, &att.name);
                push_line(out, inner, &format!("{}.PayloadSize = {};", path, nb));
                push_line(
                    out,
                    inner,
                    &format!(
                        "{}.Payload.pSubAttArray = LCSF_Bridge_{}AllocateAtt({});",
                        path, proto, nb
                    ),
                );
                push_line(out, inner, &format!("if ({}.Payload.pSubAttArray == NULL) {{", path));
                push_line(out, inner + 1, "return false;");
                push_line(out, inner, "}");
                let mut chain = ancestors.to_vec();
                chain.push(att.name.as_str());
                fill_att_rec(out, proto, &chain, &att.children, inner);
            }
        }
        if att.optional {
            push_line(out, level, "} else {");
            let pointer = match storage {
                Storage::Nested => "pSubAttArray",
                _ => "pData",
            };
            push_line(out, level + 1, &format!("{}.Payload.{} = NULL;", path, pointer));
            push_line(out, level, "}");
        }
    }
}

fn write_fill_cmd_att(out: &mut String, proto: &str, commands: &[&Command]) {
    out.push_str(&format!(
        "static bool LCSF_Bridge_{}FillCmdAtt(uint_fast16_t cmdName, lcsf_valid_att_t **pAttArrayPtr, {}_cmd_payload_t *pCmdPayload) {{\n",
        proto,
        proto.to_lowercase()
    ));
    push_line(out, 1, "switch (cmdName) {");
    for cmd in commands {
        push_line(out, 2, &format!("case {}:", cmd_enum_name(proto, &cmd.name)));
        push_line(
            out,
            3,
            &format!("return LCSF_Bridge_{}{}FillAtt(pAttArrayPtr, pCmdPayload);", proto, cmd.name),
        );
    }
    push_line(out, 2, "default:");
    push_line(out, 3, "*pAttArrayPtr = NULL;");
    push_line(out, 3, "return true;");
    push_line(out, 1, "}");
    out.push_str("}\n\n");
}

fn write_receive(out: &mut String, proto: &str, decodes: bool) {
    out.push_str(&format!("bool {} {{\n", receive_signature(proto)));
    push_line(out, 1, "if (pValidCmd == NULL) {");
    push_line(out, 2, "return false;");
    push_line(out, 1, "}");
    push_line(
        out,
        1,
        &format!("uint16_t cmdName = LCSF_Bridge_{}CmdIdToName(pValidCmd->CmdId);", proto),
    );
    push_line(out, 1, &format!("if (cmdName >= {}_CMD_COUNT) {{", proto.to_uppercase()));
    push_line(out, 2, "return false;");
    push_line(out, 1, "}");
    push_line(
        out,
        1,
        &format!(
            "{}_cmd_payload_t *pCmdPayload = &LcsfBridge{}Info.cmdPayload;",
            proto.to_lowercase(),
            proto
        ),
    );
    if decodes {
        push_line(
            out,
            1,
            &format!("LCSF_Bridge_{}GetCmdData(cmdName, pValidCmd->pAttArray, pCmdPayload);", proto),
        );
    }
    push_line(out, 1, &format!("return {}Execute(cmdName, pCmdPayload);", proto));
    out.push_str("}\n\n");
}

fn write_encode(out: &mut String, proto: &str, encodes: bool) {
    out.push_str(&format!("int {} {{\n", encode_signature(proto)));
    push_line(out, 1, &format!("if (cmdName >= {}_CMD_COUNT) {{", proto.to_uppercase()));
    push_line(out, 2, "return -1;");
    push_line(out, 1, "}");
    push_line(out, 1, "lcsf_valid_cmd_t sendCmd;");
    push_line(out, 1, &format!("sendCmd.CmdId = LCSF_Bridge_{}_CmdNameToId[cmdName];", proto));
    push_line(out, 1, "sendCmd.pAttArray = NULL;");
    push_line(out, 1, &format!("LcsfBridge{}Info.freeAttIdx = 0;", proto));
    if encodes {
        push_line(
            out,
            1,
            &format!(
                "if (!LCSF_Bridge_{}FillCmdAtt(cmdName, &sendCmd.pAttArray, pCmdPayload)) {{",
                proto
            ),
        );
        push_line(out, 2, "return -1;");
        push_line(out, 1, "}");
    } else {
        push_line(out, 1, "(void)pCmdPayload;");
    }
    push_line(
        out,
        1,
        &format!(
            "return LCSF_ValidatorEncode(LCSF_{}_PROTOCOL_ID, &sendCmd, pBuffer, buffSize);",
            proto.to_uppercase()
        ),
    );
    out.push_str("}\n");
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
                Command::new("CC1", 3, Direction::AToB)
                    .with_attribute(Attribute::new("SA6", 5, DataType::Uint8).optional(true))
                    .with_attribute(Attribute::new("SA5", 6, DataType::String)),
            )
            .with_command(
                Command::new("CC3", 0x10, Direction::BToA).with_attribute(
                    Attribute::new("CA1", 0, DataType::SubAttributes)
                        .with_child(Attribute::new("SA2", 0, DataType::Uint16))
                        .with_child(Attribute::new("SA4", 1, DataType::ByteArray).optional(true)),
                ),
            )
    }

    #[test]
    fn header_lists_wire_ids_and_counts() {
        let proto = protocol();
        let ctx = prepare(&proto).expect("valid");
        let h = generate_bridge_header(&ctx);
        assert!(h.contains("#define LCSF_TEST_PROTOCOL_ID 0x1\n"));
        assert!(h.contains("    LCSF_TEST_CMD_ID_CC3 = 0x10,\n"));
        assert!(h.contains("enum _lcsf_test_ca1_att_id {\n    LCSF_TEST_CA1_ATT_ID_SA2 = 0x0,\n"));
        assert!(h.contains("#define LCSF_TEST_CMD_NB 3\n"));
        assert!(h.contains("#define LCSF_TEST_CMD_CC1_ATT_NB 2\n"));
        assert!(h.contains("#define LCSF_TEST_ATT_CA1_SUBATT_NB 2\n"));
        assert!(!h.contains("LCSF_TEST_CMD_SC3_ATT_NB"));
    }

    #[test]
    fn receiver_gates_optional_copies() {
        let proto = protocol();
        let ctx = prepare(&proto).expect("valid");
        let b = generate_bridge_source(&ctx, Role::B);
        assert!(b.contains("static void LCSF_Bridge_TestCC1GetData("));
        assert!(b.contains(
            "    if (pAttArray[TEST_CC1_ATT_SA6].Payload.pData != NULL) {\n        pCmdPayload->cc1_payload.optAttFlagsBitfield |= TEST_CC1_ATT_SA6_FLAG;\n        memcpy(&(pCmdPayload->cc1_payload.sa6), pAttArray[TEST_CC1_ATT_SA6].Payload.pData, sizeof(uint8_t));\n    }\n"
        ));
        assert!(b.contains("pCmdPayload->cc1_payload.p_sa5 = pAttArray[TEST_CC1_ATT_SA5].Payload.pData;"));
        assert!(!b.contains("LCSF_Bridge_TestCC1FillAtt"));
    }

    #[test]
    fn transmitter_allocates_nested_arrays() {
        let proto = protocol();
        let ctx = prepare(&proto).expect("valid");
        let b = generate_bridge_source(&ctx, Role::B);
        assert!(b.contains("#define LCSF_TEST_MAX_ATT_NB 3\n"));
        assert!(b.contains(
            "    (*pAttArrayPtr)[TEST_CC3_ATT_CA1].Payload.pSubAttArray = LCSF_Bridge_TestAllocateAtt(LCSF_TEST_ATT_CA1_SUBATT_NB);\n"
        ));
        assert!(b.contains(
            "    if ((pCmdPayload->cc3_payload.ca1_payload.optAttFlagsBitfield & TEST_CA1_ATT_SA4_FLAG) != 0) {\n"
        ));
        assert!(b.contains(
            "        (*pAttArrayPtr)[TEST_CC3_ATT_CA1].Payload.pSubAttArray[TEST_CA1_ATT_SA4].Payload.pData = NULL;\n"
        ));
        assert!(b.contains("LcsfBridgeTestInfo.freeAttIdx = 0;"));
    }

    #[test]
    fn role_without_payload_commands_skips_codecs() {
        let proto = Protocol::new("P", 2).with_command(Command::new("PING", 1, Direction::Bidirectional));
        let ctx = prepare(&proto).expect("valid");
        let a = generate_bridge_source(&ctx, Role::A);
        assert!(!a.contains("GetCmdData"));
        assert!(!a.contains("AllocateAtt"));
        assert!(a.contains("    (void)pCmdPayload;\n"));
        assert!(a.contains("#define LCSF_P_MAX_ATT_NB 1\n"));
    }
}
