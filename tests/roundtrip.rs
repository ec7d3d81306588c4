//! Extract -> regenerate round trips over the C main modules.

use lcsfgen::cgen::{self, header, main_file};
use lcsfgen::extract::{extract, CodeExtractor, ExtractError};
use lcsfgen::{generate_all, parse, prepare, GenerateOptions, Protocol, Role};
use std::fs;

const SRC: &str = r#"
protocol Test = 0x01 {
    command SC3 = 0x02 bidirectional "Simple command";
    command CC1 = 0x03 a_to_b {
        optional attribute SA6 = 0x05 : uint8 "Optional byte";
        attribute SA4 = 0x06 : byte_array;
    }
    command CC3 = 0x04 b_to_a {
        attribute CA1 = 0x00 : sub_attributes {
            attribute SA1 = 0x00 : string;
            optional attribute SA2 = 0x01 : uint16;
        }
    }
}
"#;

fn protocol() -> Protocol {
    parse(SRC).expect("parse")
}

fn regenerate(proto: &Protocol, role: Role, source: &str) -> String {
    let ctx = prepare(proto).expect("valid");
    let code = extract(&proto.name, source, &proto.commands).expect("extract");
    main_file::generate_main_source(&ctx, role, Some(&code))
}

#[test]
fn test_generated_main_modules_are_fixed_points() {
    let proto = protocol();
    let ctx = prepare(&proto).expect("valid");
    for role in Role::BOTH {
        let fresh = main_file::generate_main_source(&ctx, role, None);
        let again = regenerate(&proto, role, &fresh);
        assert_eq!(fresh, again, "role {}", role.label());
    }
}

#[test]
fn test_header_survives_round_trip() {
    let proto = protocol();
    let ctx = prepare(&proto).expect("valid");
    let fresh_header = header::generate_main_header(&ctx, None);
    let main_a = main_file::generate_main_source(&ctx, Role::A, None);
    let code = extract(&proto.name, &main_a, &proto.commands).expect("extract");
    assert_eq!(header::generate_main_header(&ctx, Some(&code)), fresh_header);
}

#[test]
fn test_handler_edit_is_preserved() {
    let proto = protocol();
    let ctx = prepare(&proto).expect("valid");
    let fresh = main_file::generate_main_source(&ctx, Role::B, None);
    assert!(fresh.contains("    // TODO: process command CC1\n"));

    let edited = fresh.replace(
        "    // TODO: process command CC1\n",
        "    if (is_sa6_here) {\n        LedSet(m_sa6);\n    }\n",
    );
    let regenerated = regenerate(&proto, Role::B, &edited);
    assert_eq!(regenerated, edited);
    // stable on a second pass
    assert_eq!(regenerate(&proto, Role::B, &regenerated), edited);
}

#[test]
fn test_custom_code_and_unknown_functions_are_preserved() {
    let proto = protocol();
    let ctx = prepare(&proto).expect("valid");
    let fresh = main_file::generate_main_source(&ctx, Role::A, None);

    let helper = "/**\n * \\brief Blink a led\n */\nstatic void Blink(void) {\n    LedToggle();\n}\n\n";
    let first_handler = fresh.find("/**\n * \\fn static bool TestExecuteSC3").expect("SC3 handler");
    let mut edited = fresh.clone();
    edited.insert_str(first_handler, helper);
    let edited = edited
        .replace("            // Custom code\n", "            ErrorCount++;\n")
        .replace("static test_info_t TestInfo;\n", "static test_info_t TestInfo;\nstatic uint32_t ErrorCount;\n");

    let code = extract(&proto.name, &edited, &proto.commands).expect("extract");
    assert_eq!(code.unknown_private_functions.len(), 1);
    assert_eq!(code.default_command_handler.as_deref(), Some("            ErrorCount++;\n"));
    assert!(code.definitions.contains("static uint32_t ErrorCount;\n"));

    let regenerated = main_file::generate_main_source(&ctx, Role::A, Some(&code));
    assert_eq!(regenerated, edited);
}

#[test]
fn test_extra_public_function_reaches_header() {
    let proto = protocol();
    let ctx = prepare(&proto).expect("valid");
    let mut source = main_file::generate_main_source(&ctx, Role::A, None);
    source.push_str("/**\n * \\fn bool TestIsReady(void)\n */\nbool TestIsReady(void) {\n    return TestInfo.pSendBuffer != NULL;\n}\n\n");

    let code = extract(&proto.name, &source, &proto.commands).expect("extract");
    assert_eq!(code.public_functions.len(), 3);
    let h = header::generate_main_header(&ctx, Some(&code));
    assert!(h.contains("/**\n * \\fn bool TestIsReady(void)\n */\nbool TestIsReady(void);\n\n#endif"));
    assert_eq!(main_file::generate_main_source(&ctx, Role::A, Some(&code)), source);
}

#[test]
fn test_removed_command_handler_is_kept_as_unknown_function() {
    let proto = protocol();
    let ctx = prepare(&proto).expect("valid");
    let old = main_file::generate_main_source(&ctx, Role::B, None);

    let mut reduced = proto.clone();
    reduced.commands.retain(|c| c.name != "SC3");
    let ctx = prepare(&reduced).expect("valid");
    let code = extract(&reduced.name, &old, &reduced.commands).expect("extract");
    assert!(code.command_function("SC3").is_none());
    assert_eq!(code.unknown_private_functions.len(), 1);
    assert!(code.unknown_private_functions[0].contains("static bool TestExecuteSC3(void) {\n"));

    let regenerated = main_file::generate_main_source(&ctx, Role::B, Some(&code));
    assert!(regenerated.contains("static bool TestExecuteSC3(void) {\n"));
    assert!(!regenerated.contains("ret = TestExecuteSC3();"));
    assert!(!regenerated.contains("TEST_CMD_SC3"));
    assert!(regenerated.contains("static bool TestExecuteCC1(test_cmd_payload_t *pCmdPayload) {\n"));
}

#[test]
fn test_unbalanced_braces_fall_back_to_stubs() {
    let proto = protocol();
    let ctx = prepare(&proto).expect("valid");
    let fresh_b = main_file::generate_main_source(&ctx, Role::B, None);
    let broken = fresh_b.replace(
        "    // TODO: process command CC1\n",
        "    LedSet(m_sa6);\n    }\n    }\n",
    );

    let mut extractor = CodeExtractor::new("Test");
    let err = extractor.extract(&broken, &proto.commands).unwrap_err();
    assert!(matches!(err, ExtractError::NegativeBraceDepth { .. }));
    assert!(!extractor.is_complete());

    let dir = tempfile::tempdir().expect("tempdir");
    let old = dir.path().join("old_b.c");
    fs::write(&old, &broken).expect("write old");
    let out = dir.path().join("out");
    let report = generate_all(&proto, &GenerateOptions::new(&out).with_import(Role::B, &old)).expect("generate");

    assert!(report.is_success());
    assert_eq!(report.imports.len(), 1);
    assert!(!report.imports[0].complete);
    let written = fs::read_to_string(out.join(cgen::main_source_name("Test", Role::B))).expect("read");
    assert_eq!(written, fresh_b);
    assert!(!written.contains("LedSet"));
}

#[test]
fn test_import_through_generate_all() {
    let proto = protocol();
    let ctx = prepare(&proto).expect("valid");
    let edited = main_file::generate_main_source(&ctx, Role::A, None).replace(
        "    // TODO: process command CC3\n",
        "    Display(m_ca1_sa1);\n",
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let old = dir.path().join("Test_Main_a.c");
    fs::write(&old, &edited).expect("write old");
    let out = dir.path().join("out");
    let report = generate_all(&proto, &GenerateOptions::new(&out).with_import(Role::A, &old)).expect("generate");

    assert!(report.is_success());
    assert!(report.imports[0].complete);
    let written = fs::read_to_string(out.join("Test_Main_a.c")).expect("read");
    assert_eq!(written, edited);
    // B had nothing to import
    let written_b = fs::read_to_string(out.join("Test_Main_b.c")).expect("read");
    assert_eq!(written_b, main_file::generate_main_source(&ctx, Role::B, None));
}

#[test]
fn test_declarations_outside_functions_survive() {
    let proto = protocol();
    let ctx = prepare(&proto).expect("valid");
    let fresh = main_file::generate_main_source(&ctx, Role::A, None);

    let handler = fresh.find("/**\n * \\fn static bool TestExecuteSC3").expect("SC3 handler");
    let mut edited = fresh.clone();
    edited.insert_str(handler, "static uint32_t RxCount = 0;\n\n");
    let public = edited.find("// *** Public Functions ***").expect("public marker");
    edited.insert_str(public, "#define RX_LIMIT 16\n\n");
    let init = edited.find("/**\n * \\fn bool TestInit").expect("init");
    edited.insert_str(init, "static bool Ready;\n\n");
    edited.push_str("static const int KEEP_ME = 3;\n");

    let regenerated = regenerate(&proto, Role::A, &edited);
    assert_eq!(regenerated, edited);
    assert_eq!(regenerate(&proto, Role::A, &regenerated), edited);

    // stays out of the header
    let code = extract(&proto.name, &edited, &proto.commands).expect("extract");
    assert_eq!(
        header::generate_main_header(&ctx, Some(&code)),
        header::generate_main_header(&ctx, None)
    );
}

#[test]
fn test_description_naming_a_section_round_trips() {
    let proto = parse(&SRC.replace("\"Simple command\"", "\"see Public Functions\"")).expect("parse");
    let ctx = prepare(&proto).expect("valid");
    let fresh = main_file::generate_main_source(&ctx, Role::A, None);
    assert!(fresh.contains("Execute command SC3 (see Public Functions)"));

    let code = extract(&proto.name, &fresh, &proto.commands).expect("extract");
    assert!(code.command_function("SC3").is_some());
    assert_eq!(code.public_functions.len(), 2);
    assert_eq!(main_file::generate_main_source(&ctx, Role::A, Some(&code)), fresh);
}

#[test]
fn test_commented_break_keeps_default_body() {
    let proto = protocol();
    let ctx = prepare(&proto).expect("valid");
    let edited = main_file::generate_main_source(&ctx, Role::B, None).replace(
        "            // Custom code\n            break;\n",
        "            ErrorCount++;\n            break; // unknown command\n",
    );

    let code = extract(&proto.name, &edited, &proto.commands).expect("extract");
    assert_eq!(code.default_command_handler.as_deref(), Some("            ErrorCount++;\n"));
    let regenerated = main_file::generate_main_source(&ctx, Role::B, Some(&code));
    assert!(regenerated.contains("        default:\n            ErrorCount++;\n            break;\n"));
}
