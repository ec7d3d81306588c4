//! `{Protocol}_Main.h`: name enums, presence flags, payload structs and public prototypes.

use super::{file_banner, include_guard, main_file, main_header_name, push_line};
use crate::extract::{ExtractedCode, PublicFunction};
use crate::flatten::GenContext;
use crate::model::{Attribute, Command};
use crate::resolve::{
    att_enum_name, att_flag_name, c_cmd_payload_type, c_member_declarations, c_nested_type,
    c_struct_tag, cmd_enum_name, BitfieldWidth,
};

/// Render the shared main header. Public prototypes come from `extracted` when present.
pub fn generate_main_header(ctx: &GenContext<'_>, extracted: Option<&ExtractedCode>) -> String {
    let proto = ctx.protocol.name.as_str();
    let file_name = main_header_name(proto);
    let guard = include_guard(&file_name);
    let mut out = file_banner(&file_name, &format!("{} protocol module", proto));

    out.push_str(&format!("#ifndef {}\n#define {}\n\n", guard, guard));
    out.push_str("// *** Libraries include ***\n");
    out.push_str("#include <stdbool.h>\n#include <stddef.h>\n#include <stdint.h>\n\n");
    out.push_str("// *** Definitions ***\n");
    out.push_str("// --- Public Types ---\n\n");

    write_command_enum(&mut out, ctx);
    write_attribute_enums(&mut out, ctx);
    if ctx.has_sub_attributes {
        write_sub_attribute_structs(&mut out, ctx);
    }
    write_command_structs(&mut out, ctx);
    write_payload_union(&mut out, ctx);

    out.push_str("// --- Public Function Prototypes ---\n\n");
    let defaults;
    let public_functions: &[PublicFunction] = match extracted {
        Some(code) if !code.public_functions.is_empty() => &code.public_functions,
        _ => {
            defaults = main_file::default_public_functions(ctx);
            &defaults
        }
    };
    for func in public_functions {
        out.push_str(&func.header);
        out.push_str(&func.prototype());
        out.push_str("\n\n");
    }

    out.push_str(&format!("#endif // {}\n", guard));
    out
}

fn write_command_enum(out: &mut String, ctx: &GenContext<'_>) {
    let proto = ctx.protocol.name.as_str();
    out.push_str("// Command name enum\n");
    out.push_str(&format!("enum _{}_cmd_names {{\n", proto.to_lowercase()));
    for cmd in &ctx.protocol.commands {
        push_line(out, 1, &format!("{},", cmd_enum_name(proto, &cmd.name)));
    }
    push_line(out, 1, &format!("{}_CMD_COUNT,", proto.to_uppercase()));
    out.push_str("};\n\n");
}

fn write_attribute_enums(out: &mut String, ctx: &GenContext<'_>) {
    let proto = ctx.protocol.name.as_str();
    let scopes = ctx.scopes();
    if scopes.is_empty() {
        return;
    }
    out.push_str("// Attributes enums\n");
    for scope in &scopes {
        out.push_str(&format!(
            "enum _{}_{}_att_names {{\n",
            proto.to_lowercase(),
            scope.parent_name.to_lowercase()
        ));
        for info in &scope.attributes {
            let member = att_enum_name(proto, scope.parent_name, &info.attribute.name);
            match info.attribute.description.as_str() {
                "" => push_line(out, 1, &format!("{},", member)),
                text => push_line(out, 1, &format!("{}, // {}", member, text)),
            }
        }
        out.push_str("};\n\n");
        if scope.has_optional() {
            let width = BitfieldWidth::for_count(scope.attributes.len());
            for info in scope.attributes.iter().filter(|i| i.attribute.optional) {
                out.push_str(&format!(
                    "#define {} {}\n",
                    att_flag_name(proto, scope.parent_name, &info.attribute.name),
                    width.flag_value(info.index)
                ));
            }
            out.push('\n');
        }
    }
}

fn write_sub_attribute_structs(out: &mut String, ctx: &GenContext<'_>) {
    let proto = ctx.protocol.name.as_str();
    out.push_str("// Attribute with sub-attributes structures\n");
    for info in ctx.complex_attributes_children_first() {
        let att = info.attribute;
        let type_name = c_nested_type(proto, info.parent_name, &att.name);
        write_struct(out, proto, &type_name, &att.name, &att.children);
    }
}

fn write_command_structs(out: &mut String, ctx: &GenContext<'_>) {
    let proto = ctx.protocol.name.as_str();
    let commands: Vec<&Command> = ctx.protocol.commands.iter().filter(|c| c.has_attributes()).collect();
    if commands.is_empty() {
        return;
    }
    out.push_str("// Command data structures\n");
    for cmd in commands {
        let type_name = c_cmd_payload_type(proto, &cmd.name);
        write_struct(out, proto, &type_name, &cmd.name, &cmd.attributes);
    }
}

fn write_struct(out: &mut String, proto: &str, type_name: &str, scope: &str, attributes: &[Attribute]) {
    out.push_str(&format!("typedef struct {} {{\n", c_struct_tag(type_name)));
    if attributes.iter().any(|a| a.optional) {
        push_line(out, 1, &BitfieldWidth::for_count(attributes.len()).c_declaration());
    }
    for att in attributes {
        let Some(storage) = att.data_type.storage() else {
            continue;
        };
        for member in c_member_declarations(storage, proto, scope, &att.name) {
            push_line(out, 1, &member);
        }
    }
    out.push_str(&format!("}} {};\n\n", type_name));
}

fn write_payload_union(out: &mut String, ctx: &GenContext<'_>) {
    let proto = ctx.protocol.name.as_str();
    let type_name = format!("{}_cmd_payload_t", proto.to_lowercase());
    out.push_str("// Command payload union\n");
    out.push_str(&format!("typedef union {} {{\n", c_struct_tag(&type_name)));
    let mut any = false;
    for cmd in ctx.protocol.commands.iter().filter(|c| c.has_attributes()) {
        any = true;
        push_line(
            out,
            1,
            &format!("{} {}_payload;", c_cmd_payload_type(proto, &cmd.name), cmd.name.to_lowercase()),
        );
    }
    if !any {
        push_line(out, 1, "uint8_t noPayload;");
    }
    out.push_str(&format!("}} {};\n\n", type_name));
}
