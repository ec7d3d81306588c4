//! `protocol_{name}.rs`: handler stubs for received commands, the dispatcher and the send path.

use super::{bridge_module_name, module_banner, push_line};
use crate::flatten::GenContext;
use crate::model::{Attribute, Command, Role};
use crate::resolve::{capitalize, rust_cmd_payload_type, snake_case};

pub fn generate_main_module(ctx: &GenContext<'_>, role: Role) -> String {
    let proto = ctx.protocol.name.as_str();
    let commands = &ctx.protocol.commands;
    let received: Vec<&Command> = commands.iter().filter(|c| c.is_receivable(role)).collect();

    let mut out = module_banner(&format!("{} protocol module (role {})", proto, role.label()));
    let mut imports = vec!["self as bridge".to_string(), "CmdEnum".to_string(), "CmdPayload".to_string()];
    imports.extend(
        received
            .iter()
            .filter(|c| c.has_attributes())
            .map(|c| rust_cmd_payload_type(&c.name)),
    );
    out.push_str(&format!(
        "use super::{}::{{{}}};\n",
        bridge_module_name(proto),
        imports.join(", ")
    ));
    out.push_str("use lcsf_lib::lcsf_transcoder;\n");
    out.push_str("use lcsf_lib::lcsf_validator::LcsfValidCmd;\n\n");

    for cmd in &received {
        write_handler(&mut out, cmd);
    }
    write_execute(&mut out, commands, &received);

    out.push_str("/// Decode a validated command and run its handler.\n");
    out.push_str("pub fn receive(valid_cmd: &LcsfValidCmd) -> bool {\n");
    push_line(&mut out, 1, "match bridge::decode(valid_cmd) {");
    push_line(&mut out, 2, "Some((cmd_name, payload)) => execute(cmd_name, &payload),");
    push_line(&mut out, 2, "None => false,");
    push_line(&mut out, 1, "}");
    out.push_str("}\n\n");

    out.push_str("/// Encode a command and hand it to the transcoder.\n");
    out.push_str("pub fn send_command(cmd_name: CmdEnum, payload: &CmdPayload) -> bool {\n");
    push_line(&mut out, 1, "match bridge::encode(cmd_name, payload) {");
    push_line(
        &mut out,
        2,
        &format!(
            "Some(valid_cmd) => lcsf_transcoder::send(bridge::LCSF_{}_PROTOCOL_ID, &valid_cmd),",
            proto.to_uppercase()
        ),
    );
    push_line(&mut out, 2, "None => false,");
    push_line(&mut out, 1, "}");
    out.push_str("}\n");
    out
}

fn write_handler(out: &mut String, cmd: &Command) {
    if cmd.description.is_empty() {
        out.push_str(&format!("/// Execute command {}\n", cmd.name));
    } else {
        out.push_str(&format!("/// Execute command {} ({})\n", cmd.name, cmd.description));
    }
    let fn_name = format!("execute_{}", snake_case(&cmd.name));
    if cmd.has_attributes() {
        out.push_str(&format!(
            "fn {}(payload: &{}) -> bool {{\n",
            fn_name,
            rust_cmd_payload_type(&cmd.name)
        ));
        push_line(out, 1, "// Retrieve attributes data");
        bind_rec(out, "payload", "", &cmd.attributes);
    } else {
        out.push_str(&format!("fn {}() -> bool {{\n", fn_name));
    }
    push_line(out, 1, "// Process data");
    push_line(out, 1, &format!("// TODO: process command {}", cmd.name));
    push_line(out, 1, "true");
    out.push_str("}\n\n");
}

/// One borrowed local per attribute. Mandatory groups are walked into, optional ones are
/// bound whole since their fields sit behind an `Option`.
fn bind_rec(out: &mut String, place: &str, prefix: &str, attributes: &[Attribute]) {
    for att in attributes {
        let field = snake_case(&att.name);
        let local = format!("{}{}", prefix, field);
        if att.has_sub_attributes() && !att.optional {
            bind_rec(out, &format!("{}.{}", place, field), &format!("{}_", local), &att.children);
        } else {
            push_line(out, 1, &format!("let _{} = &{}.{};", local, place, field));
        }
    }
}

fn write_execute(out: &mut String, commands: &[Command], received: &[&Command]) {
    out.push_str("/// Dispatch a decoded command to its handler.\n");
    out.push_str("pub fn execute(cmd_name: CmdEnum, payload: &CmdPayload) -> bool {\n");
    push_line(out, 1, "match (cmd_name, payload) {");
    for cmd in received {
        let variant = capitalize(&cmd.name);
        let fn_name = format!("execute_{}", snake_case(&cmd.name));
        if cmd.has_attributes() {
            push_line(
                out,
                2,
                &format!(
                    "(CmdEnum::{v}, CmdPayload::{v}(cmd_payload)) => {}(cmd_payload),",
                    fn_name,
                    v = variant
                ),
            );
        } else {
            push_line(out, 2, &format!("(CmdEnum::{}, _) => {}(),", variant, fn_name));
        }
    }
    let exhaustive = received.len() == commands.len() && received.iter().all(|c| !c.has_attributes());
    if !exhaustive {
        push_line(out, 2, "_ => false,");
    }
    push_line(out, 1, "}");
    out.push_str("}\n\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::prepare;
    use crate::model::{DataType, Direction, Protocol};

    #[test]
    fn handlers_bind_every_attribute() {
        let proto = Protocol::new("Test", 1)
            .with_command(Command::new("SC3", 2, Direction::Bidirectional))
            .with_command(
                Command::new("CC3", 3, Direction::AToB)
                    .with_attribute(Attribute::new("SA1", 0, DataType::Uint8).optional(true))
                    .with_attribute(
                        Attribute::new("CA1", 1, DataType::SubAttributes)
                            .with_child(Attribute::new("SA2", 0, DataType::Uint16)),
                    ),
            );
        let ctx = prepare(&proto).expect("valid");
        let code = generate_main_module(&ctx, Role::B);
        assert!(code.contains("use super::lcsf_protocol_test::{self as bridge, CmdEnum, CmdPayload, Cc3AttPayload};\n"));
        assert!(code.contains("fn execute_cc3(payload: &Cc3AttPayload) -> bool {\n"));
        assert!(code.contains("    let _sa1 = &payload.sa1;\n    let _ca1_sa2 = &payload.ca1.sa2;\n"));
        assert!(code.contains("        (CmdEnum::Sc3, _) => execute_sc3(),\n"));
        assert!(code.contains("        _ => false,\n"));

        let a = generate_main_module(&ctx, Role::A);
        assert!(!a.contains("execute_cc3"));
    }
}
