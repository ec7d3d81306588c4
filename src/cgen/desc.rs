//! `LCSF_Desc_{P}.c`: static descriptor tables read by the generic LCSF validator.

use super::{bridge_header_name, desc_name, file_banner, push_line};
use crate::flatten::GenContext;
use crate::model::Attribute;
use crate::resolve::{att_id_name, cmd_att_nb_name, cmd_id_name, subatt_nb_name};

fn att_desc_array_name(proto: &str, scope: &str) -> String {
    format!("LCSF_{}_{}_AttDescArray", proto, scope)
}

pub fn generate_desc(ctx: &GenContext<'_>) -> String {
    let proto = ctx.protocol.name.as_str();
    let upper = proto.to_uppercase();
    let file_name = desc_name(proto);
    let mut out = file_banner(&file_name, &format!("{} LCSF descriptor", proto));
    out.push_str("// *** Libraries include ***\n");
    out.push_str(&format!("#include \"{}\"\n\n", bridge_header_name(proto)));
    out.push_str("// *** Definitions ***\n");
    out.push_str("// --- Private Constants ---\n\n");

    // Sub-attribute tables come first so every table is defined before it is referenced.
    let complex = ctx.complex_attributes_children_first();
    if !complex.is_empty() {
        out.push_str("// Sub-attribute array descriptions\n");
        for info in complex {
            let att = info.attribute;
            write_att_array(
                &mut out,
                proto,
                &att.name,
                &subatt_nb_name(proto, &att.name),
                &att.children,
            );
        }
    }

    let with_attributes: Vec<_> = ctx.protocol.commands.iter().filter(|c| c.has_attributes()).collect();
    if !with_attributes.is_empty() {
        out.push_str("// Attribute array descriptions\n");
        for cmd in &with_attributes {
            write_att_array(
                &mut out,
                proto,
                &cmd.name,
                &cmd_att_nb_name(proto, &cmd.name),
                &cmd.attributes,
            );
        }
    }

    out.push_str("// Command array description\n");
    out.push_str(&format!(
        "static const lcsf_command_desc_t LCSF_{}_CmdDescArray[LCSF_{}_CMD_NB] = {{\n",
        proto, upper
    ));
    for cmd in &ctx.protocol.commands {
        push_line(&mut out, 1, "{");
        push_line(&mut out, 2, &format!(".CmdId = {},", cmd_id_name(proto, &cmd.name)));
        if cmd.has_attributes() {
            push_line(&mut out, 2, &format!(".AttNb = {},", cmd_att_nb_name(proto, &cmd.name)));
            push_line(
                &mut out,
                2,
                &format!(".pAttDescArray = {},", att_desc_array_name(proto, &cmd.name)),
            );
        } else {
            push_line(&mut out, 2, ".AttNb = 0,");
            push_line(&mut out, 2, ".pAttDescArray = NULL,");
        }
        push_line(&mut out, 1, "},");
    }
    out.push_str("};\n\n");

    out.push_str("// --- Public Constants ---\n");
    out.push_str(&format!("const lcsf_protocol_desc_t LCSF_{}_ProtDesc = {{\n", proto));
    push_line(&mut out, 1, &format!(".CmdNb = LCSF_{}_CMD_NB,", upper));
    push_line(&mut out, 1, &format!(".pCmdDescArray = LCSF_{}_CmdDescArray,", proto));
    out.push_str("};\n");
    out
}

fn write_att_array(out: &mut String, proto: &str, scope: &str, count: &str, attributes: &[Attribute]) {
    out.push_str(&format!(
        "static const lcsf_attribute_desc_t {}[{}] = {{\n",
        att_desc_array_name(proto, scope),
        count
    ));
    for att in attributes {
        push_line(out, 1, "{");
        push_line(out, 2, &format!(".IsOptional = {},", att.optional));
        push_line(out, 2, &format!(".DataType = {},", att.data_type.lcsf_name()));
        push_line(out, 2, &format!(".AttId = {},", att_id_name(proto, scope, &att.name)));
        if att.has_sub_attributes() {
            push_line(out, 2, &format!(".SubAttNb = {},", subatt_nb_name(proto, &att.name)));
            push_line(
                out,
                2,
                &format!(".pSubAttDescArray = {},", att_desc_array_name(proto, &att.name)),
            );
        } else {
            push_line(out, 2, ".SubAttNb = 0,");
            push_line(out, 2, ".pSubAttDescArray = NULL,");
        }
        push_line(out, 1, "},");
    }
    out.push_str("};\n\n");
}
